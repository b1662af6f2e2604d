//! Export annotations from a store
//!
//! Fetches an annotation collection (or a single annotation) and the plain
//! text of every document it targets, writing them to an output directory
//! or standard output.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::annotation::{document_annotations, pretty, split_fragment, Annotation};
use crate::client::{accept, StoreClient};
use crate::config::ensure_scheme;
use crate::error::{SyncError, SyncResult};

/// File name of the exported annotation document
pub const ANNOTATIONS_FILENAME: &str = "annotations.jsonld";

/// Where exported content is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    /// One file per exported document in this directory
    Directory(PathBuf),
}

impl Destination {
    pub fn from_output(output: Option<PathBuf>) -> Self {
        match output {
            Some(dir) => Destination::Directory(dir),
            None => Destination::Stdout,
        }
    }

    /// Write `contents` under `name`, followed by a newline
    fn emit(&self, name: &str, contents: &str) -> SyncResult<()> {
        match self {
            Destination::Stdout => {
                println!("{}", contents);
                Ok(())
            }
            Destination::Directory(dir) => {
                fs::create_dir_all(dir).map_err(|source| SyncError::Write {
                    path: dir.clone(),
                    source,
                })?;
                let path = dir.join(name);
                debug!("writing {}", path.display());
                fs::write(&path, format!("{}\n", contents))
                    .map_err(|source| SyncError::Write { path, source })
            }
        }
    }
}

/// Counts of what one export wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub annotations: usize,
    pub texts: usize,
}

/// Exports annotation documents and their targets
pub struct Exporter<C> {
    client: C,
    destination: Destination,
}

impl<C: StoreClient> Exporter<C> {
    pub fn new(client: C, destination: Destination) -> Self {
        Self {
            client,
            destination,
        }
    }

    /// Export the annotation document at `source` and its target texts
    pub fn export_from(&self, source: &str) -> SyncResult<ExportSummary> {
        let url = ensure_scheme(source.trim());
        let document = self.fetch_document(&url)?;

        // TODO: rewrite targets to relative form so exports re-import cleanly
        self.destination.emit(ANNOTATIONS_FILENAME, &pretty(&document))?;

        let annotations = document_annotations(&document)?;
        let targets = target_urls(&annotations);
        for target in &targets {
            let text = self.fetch_plain_text(target)?;
            self.destination.emit(&output_filename(target)?, &text)?;
        }

        let summary = ExportSummary {
            annotations: annotations.len(),
            texts: targets.len(),
        };
        info!(
            "{}: exported {} annotation(s), {} text(s)",
            url, summary.annotations, summary.texts
        );
        Ok(summary)
    }

    fn fetch_document(&self, url: &str) -> SyncResult<Value> {
        let response = self.client.get(url, accept::JSON_LD)?.error_for_status()?;
        response
            .json()
            .map_err(|_| SyncError::format("failed to parse JSON"))
    }

    fn fetch_plain_text(&self, url: &str) -> SyncResult<String> {
        let response = self.client.get(url, accept::TEXT_PLAIN)?.error_for_status()?;
        match response.content_type.as_deref() {
            Some(mimetype) if mimetype.contains(accept::TEXT_PLAIN) => response.text(),
            other => Err(SyncError::format(format!(
                "requested text/plain, got {}",
                other.unwrap_or("no content type")
            ))),
        }
    }
}

/// Unique target URLs of the given annotations, without fragments
pub fn target_urls(annotations: &[Annotation]) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    for annotation in annotations {
        match annotation.target() {
            Ok(Some(target)) => {
                urls.extend(target.urls().iter().map(|u| split_fragment(u).0.to_string()));
            }
            Ok(None) => warn!("missing target"),
            Err(e) => warn!("skipping target: {}", e),
        }
    }
    urls
}

/// Output file name for a target: the last segment of its URL path
pub fn output_filename(url: &str) -> SyncResult<String> {
    let parsed = Url::parse(url).map_err(|source| SyncError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    match parsed.path().rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(SyncError::format(format!("no file name in URL {}", url))),
    }
}
