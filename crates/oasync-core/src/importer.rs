//! Import annotations into a store
//!
//! Reads JSON-LD annotation collections from files or directory trees,
//! resolves their relative targets and posts each annotation to the
//! annotation store. A failure affects only the annotation (or file) it
//! occurred in; the run carries on and reports a [`Tally`].

use std::fmt;
use std::ops::AddAssign;
use std::path::Path;

use tracing::debug;

use crate::annotation::{graph_annotations, Annotation};
use crate::client::{HttpResponse, StoreClient};
use crate::error::{SyncError, SyncResult};
use crate::resolver::TargetResolver;
use crate::source::{read_json_file, select_files};

/// Result of importing one annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// Success and failure counts for an import source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tally holding a single failure
    pub fn failure() -> Self {
        Self {
            succeeded: 0,
            failed: 1,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// Receives per-annotation import results for display
pub trait ImportReporter {
    /// The store accepted an annotation
    fn accepted(&self, annotation: &Annotation, response: &HttpResponse);

    /// An annotation could not be imported
    ///
    /// `response` is present when the store answered with an error status.
    fn rejected(&self, annotation: &Annotation, error: &SyncError, response: Option<&HttpResponse>);

    /// A source file could not be loaded
    fn unreadable(&self, source: &Path, error: &SyncError);
}

impl<R: ImportReporter + ?Sized> ImportReporter for &R {
    fn accepted(&self, annotation: &Annotation, response: &HttpResponse) {
        (**self).accepted(annotation, response)
    }

    fn rejected(&self, annotation: &Annotation, error: &SyncError, response: Option<&HttpResponse>) {
        (**self).rejected(annotation, error, response)
    }

    fn unreadable(&self, source: &Path, error: &SyncError) {
        (**self).unreadable(source, error)
    }
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ImportReporter for NullReporter {
    fn accepted(&self, _annotation: &Annotation, _response: &HttpResponse) {}

    fn rejected(&self, _annotation: &Annotation, _error: &SyncError, _response: Option<&HttpResponse>) {}

    fn unreadable(&self, _source: &Path, _error: &SyncError) {}
}

/// Imports annotation files into an annotation store
pub struct Importer<C, R> {
    resolver: TargetResolver<C>,
    annotation_url: String,
    reporter: R,
}

impl<C: StoreClient, R: ImportReporter> Importer<C, R> {
    pub fn new(resolver: TargetResolver<C>, annotation_url: impl Into<String>, reporter: R) -> Self {
        Self {
            resolver,
            annotation_url: annotation_url.into(),
            reporter,
        }
    }

    pub fn resolver(&self) -> &TargetResolver<C> {
        &self.resolver
    }

    /// Import from a file or, recursively, a directory
    pub fn import_from(&mut self, source: &Path) -> Tally {
        if source.is_dir() {
            self.import_from_dir(source)
        } else {
            self.import_from_file(source)
        }
    }

    /// Import every `.jsonld` file below `directory`, depth first
    pub fn import_from_dir(&mut self, directory: &Path) -> Tally {
        let entries = match select_files(directory) {
            Ok(entries) => entries,
            Err(e) => {
                self.reporter.unreadable(directory, &e);
                return Tally::failure();
            }
        };

        let mut tally = Tally::new();
        for entry in entries {
            tally += self.import_from(&entry);
        }
        tally
    }

    /// Import the annotation collection in a single file
    pub fn import_from_file(&mut self, path: &Path) -> Tally {
        let annotations = match read_json_file(path).and_then(|doc| graph_annotations(&doc)) {
            Ok(annotations) => annotations,
            Err(e) => {
                self.reporter.unreadable(path, &e);
                return Tally::failure();
            }
        };
        debug!("{}: {} annotation(s)", path.display(), annotations.len());

        let basedir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut tally = Tally::new();
        for annotation in annotations {
            tally.record(self.import_annotation(annotation, basedir));
        }
        tally
    }

    fn import_annotation(&mut self, mut annotation: Annotation, basedir: &Path) -> Outcome {
        match self.submit(&mut annotation, basedir) {
            Ok(response) => match response.status_error() {
                None => {
                    self.reporter.accepted(&annotation, &response);
                    Outcome::Succeeded
                }
                Some(e) => {
                    self.reporter.rejected(&annotation, &e, Some(&response));
                    Outcome::Failed
                }
            },
            Err(e) => {
                self.reporter.rejected(&annotation, &e, None);
                Outcome::Failed
            }
        }
    }

    /// Resolve targets and POST the annotation
    fn submit(&mut self, annotation: &mut Annotation, basedir: &Path) -> SyncResult<HttpResponse> {
        self.resolver.resolve(annotation, basedir)?;
        prepare_for_post(annotation);
        self.resolver
            .client()
            .post_json(&self.annotation_url, &annotation.to_value())
    }
}

/// Adjust an annotation for POSTing to a RESTful store
///
/// The store assigns identifiers, so any `@id` is dropped.
pub fn prepare_for_post(annotation: &mut Annotation) {
    annotation.remove_id();
}
