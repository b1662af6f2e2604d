//! Target reference resolution
//!
//! Annotations loaded from local files may point at their target documents
//! with relative URLs ("doc.txt#char=0,10"). Before such an annotation can be
//! posted to a store, each relative target must be made absolute:
//!
//! 1. Collect the relative target URLs (fragment stripped)
//! 2. Skip targets already handled in this run, and ones with no local file
//! 3. Ask the document store for each remaining target
//!    - 404: new document, upload it
//!    - 200 with identical text: reuse the stored document
//!    - 200 with different text: leave the target unresolved
//! 4. Rewrite the annotation's targets using the resolved URLs
//!
//! Outcomes are remembered in a [`TargetMap`] owned by the resolver, so each
//! distinct target is checked and uploaded at most once per run.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use reqwest::StatusCode;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::annotation::{is_relative, split_fragment, Annotation};
use crate::client::{accept, StoreClient};
use crate::error::{SyncError, SyncResult};
use crate::source::read_text_file;

/// How a relative target was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Target is available at this absolute URL
    Resolved(String),
    /// Upload failed or the store holds different text under the same name
    Unresolvable,
}

/// Run-scoped record of resolved relative targets
///
/// Keys are relative target URLs without fragment. Once a key is present it
/// is never resolved again in the same run, whatever the outcome was.
#[derive(Debug, Default)]
pub struct TargetMap {
    entries: HashMap<String, Resolution>,
}

impl TargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.entries.contains_key(target)
    }

    pub fn get(&self, target: &str) -> Option<&Resolution> {
        self.entries.get(target)
    }

    /// Absolute URL for a target, if it resolved successfully
    pub fn resolved(&self, target: &str) -> Option<&str> {
        match self.entries.get(target) {
            Some(Resolution::Resolved(url)) => Some(url),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, target: String, resolution: Resolution) {
        self.entries.insert(target, resolution);
    }
}

/// Resolves relative annotation targets against a document store
pub struct TargetResolver<C> {
    client: C,
    /// Document store collection URL; uploads are disabled without one
    document_url: Option<Url>,
    targets: TargetMap,
}

impl<C: StoreClient> TargetResolver<C> {
    /// Create a resolver with an empty target map
    ///
    /// `document_url` must end in a slash, since target names are joined
    /// onto it.
    pub fn new(client: C, document_url: Option<&str>) -> SyncResult<Self> {
        let document_url = document_url
            .map(|url| {
                Url::parse(url).map_err(|source| SyncError::InvalidUrl {
                    url: url.to_string(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            client,
            document_url,
            targets: TargetMap::new(),
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn target_map(&self) -> &TargetMap {
        &self.targets
    }

    /// Make the relative targets of `annotation` absolute
    ///
    /// Target documents are looked up relative to `basedir` and uploaded to
    /// the document store when missing there. Targets that cannot be
    /// resolved are left unchanged.
    pub fn resolve(&mut self, annotation: &mut Annotation, basedir: &Path) -> SyncResult<()> {
        let relative = relative_targets(annotation)?;
        self.upload_targets(relative, basedir)?;
        rewrite_targets(annotation, &self.targets)
    }

    fn upload_targets(&mut self, targets: BTreeSet<String>, basedir: &Path) -> SyncResult<()> {
        let targets: BTreeSet<String> = targets
            .into_iter()
            .filter(|t| !self.targets.contains(t))
            .collect();
        let targets = remove_non_files(targets, basedir);
        if targets.is_empty() {
            return Ok(());
        }

        let Some(document_url) = self.document_url.clone() else {
            warn!(
                "no document store configured, cannot upload target(s): {}",
                targets.into_iter().collect::<Vec<_>>().join(" ")
            );
            return Ok(());
        };

        let texts: BTreeMap<String, Option<String>> = targets
            .into_iter()
            .map(|target| {
                let text = read_target_text(basedir, &target);
                (target, text)
            })
            .collect();

        let new_targets = self.remove_known_targets(&document_url, texts)?;
        for (target, text) in new_targets {
            self.post_target(&document_url, target, text)?;
        }
        Ok(())
    }

    /// Check the store for each target, returning the ones it does not have
    ///
    /// Targets the store already has are recorded in the target map.
    fn remove_known_targets(
        &mut self,
        document_url: &Url,
        texts: BTreeMap<String, Option<String>>,
    ) -> SyncResult<Vec<(String, Option<String>)>> {
        let mut new_targets = Vec::new();

        for (target, text) in texts {
            let url = join_target(document_url, &target)?;
            let response = match self.client.get(url.as_str(), accept::TEXT_PLAIN) {
                Ok(response) => response,
                Err(e) => {
                    self.targets.insert(target, Resolution::Unresolvable);
                    return Err(e);
                }
            };

            match response.status {
                StatusCode::NOT_FOUND => {
                    info!("not found: {}", url);
                    new_targets.push((target, text));
                }
                StatusCode::OK => {
                    let remote = response.text()?;
                    if text.as_deref().map(str::as_bytes) == Some(remote.as_bytes()) {
                        info!("document already in store: {}", target);
                        self.targets.insert(target, Resolution::Resolved(url.into()));
                    } else {
                        warn!("text mismatch for {} vs {}", target, url);
                        self.targets.insert(target, Resolution::Unresolvable);
                    }
                }
                status => {
                    self.targets.insert(target, Resolution::Unresolvable);
                    return Err(SyncError::Status {
                        url: url.into(),
                        status,
                    });
                }
            }
        }

        Ok(new_targets)
    }

    /// Upload one target document to the store
    fn post_target(
        &mut self,
        document_url: &Url,
        target: String,
        text: Option<String>,
    ) -> SyncResult<()> {
        let Some(text) = text else {
            self.targets.insert(target, Resolution::Unresolvable);
            return Ok(());
        };

        let body = json!({
            "name": target,
            "text": text,
        });
        let response = match self.client.post_json(document_url.as_str(), &body) {
            Ok(response) => response,
            Err(e) => {
                // Failed attempts count too; the target is not retried this run
                self.targets.insert(target, Resolution::Unresolvable);
                return Err(e);
            }
        };

        match response.error_for_status() {
            Ok(_) => {
                let url = join_target(document_url, &target)?;
                info!("POSTed {} to store {}", target, document_url);
                self.targets.insert(target, Resolution::Resolved(url.into()));
            }
            Err(e) => {
                warn!("error posting {}: {}", target, e);
                self.targets.insert(target, Resolution::Unresolvable);
            }
        }
        Ok(())
    }
}

/// Unique relative target URLs of an annotation, without fragments
///
/// A missing target is only worth a warning; there is nothing to resolve.
pub fn relative_targets(annotation: &Annotation) -> SyncResult<BTreeSet<String>> {
    let Some(target) = annotation.target()? else {
        warn!("missing target");
        return Ok(BTreeSet::new());
    };

    Ok(target
        .urls()
        .iter()
        .filter(|url| is_relative(url))
        .map(|url| split_fragment(url).0.to_string())
        .collect())
}

/// Replace relative targets with their resolved absolute URLs
pub fn rewrite_targets(annotation: &mut Annotation, targets: &TargetMap) -> SyncResult<()> {
    let Some(target) = annotation.target()? else {
        return Ok(());
    };
    annotation.set_target(target.map_urls(|url| map_relative(url, targets)));
    Ok(())
}

fn map_relative(url: String, targets: &TargetMap) -> String {
    if !is_relative(&url) {
        return url;
    }
    let (base, fragment) = split_fragment(&url);
    match targets.resolved(base) {
        Some(mapped) => format!("{}#{}", mapped, fragment),
        None => url,
    }
}

/// Keep only targets that exist as regular files under `basedir`
fn remove_non_files(targets: BTreeSet<String>, basedir: &Path) -> BTreeSet<String> {
    targets
        .into_iter()
        .filter(|target| {
            let path = basedir.join(target);
            if !path.exists() {
                warn!("target not found: {}", path.display());
                false
            } else if !path.is_file() {
                warn!("target not file: {}", path.display());
                false
            } else {
                true
            }
        })
        .collect()
}

fn read_target_text(basedir: &Path, target: &str) -> Option<String> {
    match read_text_file(&basedir.join(target)) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

fn join_target(document_url: &Url, target: &str) -> SyncResult<Url> {
    document_url
        .join(target)
        .map_err(|source| SyncError::InvalidUrl {
            url: target.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpResponse;
    use crate::testing::{FakeStore, Request};
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    const DOCS: &str = "http://127.0.0.1:5005/documents/";

    fn annotation(value: Value) -> Annotation {
        Annotation::from_value(value).unwrap()
    }

    fn basedir_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, text) in files {
            fs::write(dir.path().join(name), text).unwrap();
        }
        dir
    }

    #[test]
    fn test_relative_targets() {
        let ann = annotation(json!({
            "target": [
                "doc.txt#char=0,10",
                "doc.txt#char=20,30",
                "other.txt",
                "http://example.org/remote.txt#char=0,1"
            ]
        }));
        let relative = relative_targets(&ann).unwrap();
        assert_eq!(
            relative.into_iter().collect::<Vec<_>>(),
            vec!["doc.txt".to_string(), "other.txt".to_string()]
        );
    }

    #[test]
    fn test_relative_targets_missing() {
        assert!(relative_targets(&annotation(json!({"body": "x"}))).unwrap().is_empty());
    }

    #[test]
    fn test_relative_targets_structured() {
        let ann = annotation(json!({"target": {"source": "doc.txt"}}));
        assert!(matches!(relative_targets(&ann), Err(SyncError::Format(_))));
    }

    #[test]
    fn test_uploads_new_target() {
        let dir = basedir_with(&[("doc.txt", "Hello, world")]);
        let store = FakeStore::new();
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt#char=0,5"}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert_eq!(
            ann.get("target"),
            Some(&json!("http://127.0.0.1:5005/documents/doc.txt#char=0,5"))
        );
        assert_eq!(
            store.posted(DOCS),
            vec![json!({"name": "doc.txt", "text": "Hello, world"})]
        );
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Resolved(
                "http://127.0.0.1:5005/documents/doc.txt".to_string()
            ))
        );
    }

    #[test]
    fn test_target_without_fragment_gets_empty_fragment() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let store = FakeStore::new();
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": ["doc.txt", "http://example.org/x.txt"]}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert_eq!(
            ann.get("target"),
            Some(&json!([
                "http://127.0.0.1:5005/documents/doc.txt#",
                "http://example.org/x.txt"
            ]))
        );
    }

    #[test]
    fn test_identical_remote_text_is_reused() {
        let dir = basedir_with(&[("doc.txt", "same text")]);
        let remote = format!("{}doc.txt", DOCS);
        let store = FakeStore::new().with_text(&remote, "text/plain; charset=utf-8", "same text");
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt#char=0,4"}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert!(store.posted(DOCS).is_empty());
        assert_eq!(ann.get("target"), Some(&json!(format!("{}#char=0,4", remote))));
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Resolved(remote))
        );
    }

    #[test]
    fn test_conflicting_remote_text_blocks_mapping() {
        let dir = basedir_with(&[("doc.txt", "local text")]);
        let remote = format!("{}doc.txt", DOCS);
        let store = FakeStore::new().with_text(&remote, "text/plain", "remote text");
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt#char=0,4"}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert!(store.posted(DOCS).is_empty());
        assert_eq!(ann.get("target"), Some(&json!("doc.txt#char=0,4")));
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Unresolvable)
        );
    }

    #[test]
    fn test_unexpected_status_is_fatal() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let remote = format!("{}doc.txt", DOCS);
        let store = FakeStore::new().with_get(
            &remote,
            HttpResponse::new(&remote, StatusCode::INTERNAL_SERVER_ERROR),
        );
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt"}));
        let err = resolver.resolve(&mut ann, dir.path()).unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(store.posted(DOCS).is_empty());
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Unresolvable)
        );

        let mut again = annotation(json!({"target": "doc.txt#char=0,1"}));
        resolver.resolve(&mut again, dir.path()).unwrap();
        assert_eq!(store.get_count(&remote), 1);
        assert_eq!(again.get("target"), Some(&json!("doc.txt#char=0,1")));
    }

    #[test]
    fn test_upload_transport_error_is_not_retried() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let remote = format!("{}doc.txt", DOCS);
        let store = FakeStore::new().with_post_failure(DOCS);
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut first = annotation(json!({"target": "doc.txt#char=0,1"}));
        let err = resolver.resolve(&mut first, dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }));

        for _ in 0..2 {
            let mut ann = annotation(json!({"target": "doc.txt#char=0,1"}));
            resolver.resolve(&mut ann, dir.path()).unwrap();
            assert_eq!(ann.get("target"), Some(&json!("doc.txt#char=0,1")));
        }

        assert_eq!(store.get_count(&remote), 1);
        assert_eq!(store.posted(DOCS).len(), 1);
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Unresolvable)
        );
    }

    #[test]
    fn test_failed_upload_is_unresolvable() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let store = FakeStore::new().with_post_status(DOCS, StatusCode::BAD_REQUEST, "bad");
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt#char=0,1"}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert_eq!(store.posted(DOCS).len(), 1);
        assert_eq!(ann.get("target"), Some(&json!("doc.txt#char=0,1")));
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Unresolvable)
        );
    }

    #[test]
    fn test_resolves_each_target_once_per_run() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let remote = format!("{}doc.txt", DOCS);
        let store = FakeStore::new();
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut first = annotation(json!({"target": "doc.txt#char=0,1"}));
        let mut second = annotation(json!({"target": ["doc.txt#char=2,3"]}));
        resolver.resolve(&mut first, dir.path()).unwrap();
        resolver.resolve(&mut second, dir.path()).unwrap();

        assert_eq!(store.get_count(&remote), 1);
        assert_eq!(store.posted(DOCS).len(), 1);
        assert_eq!(second.get("target"), Some(&json!([format!("{}#char=2,3", remote)])));
    }

    #[test]
    fn test_failures_are_not_retried() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let store = FakeStore::new().with_post_status(DOCS, StatusCode::SERVICE_UNAVAILABLE, "");
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        for _ in 0..3 {
            let mut ann = annotation(json!({"target": "doc.txt"}));
            resolver.resolve(&mut ann, dir.path()).unwrap();
        }

        assert_eq!(store.posted(DOCS).len(), 1);
        assert_eq!(store.requests().len(), 2);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = basedir_with(&[]);
        fs::create_dir(dir.path().join("subdir")).unwrap();
        let store = FakeStore::new();
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": ["missing.txt#char=0,1", "subdir"]}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert!(store.requests().is_empty());
        assert!(resolver.target_map().is_empty());
        assert_eq!(ann.get("target"), Some(&json!(["missing.txt#char=0,1", "subdir"])));
    }

    #[test]
    fn test_no_document_store() {
        let dir = basedir_with(&[("doc.txt", "text")]);
        let store = FakeStore::new();
        let mut resolver = TargetResolver::new(&store, None).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt#char=0,1"}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        assert!(store.requests().is_empty());
        assert!(resolver.target_map().is_empty());
        assert_eq!(ann.get("target"), Some(&json!("doc.txt#char=0,1")));
    }

    #[test]
    fn test_unreadable_text_is_not_uploaded() {
        let dir = TempDir::new().unwrap();
        // Invalid UTF-8
        fs::write(dir.path().join("doc.txt"), [0xff, 0xfe, 0x00]).unwrap();
        let store = FakeStore::new();
        let mut resolver = TargetResolver::new(&store, Some(DOCS)).unwrap();

        let mut ann = annotation(json!({"target": "doc.txt"}));
        resolver.resolve(&mut ann, dir.path()).unwrap();

        // Existence is still checked, but nothing is uploaded
        assert_eq!(
            store.requests(),
            vec![Request::Get {
                url: format!("{}doc.txt", DOCS),
                accept: "text/plain".to_string(),
            }]
        );
        assert_eq!(
            resolver.target_map().get("doc.txt"),
            Some(&Resolution::Unresolvable)
        );
    }

    #[test]
    fn test_rewrite_ignores_absolute_and_unknown() {
        let mut targets = TargetMap::new();
        targets.insert(
            "a.txt".to_string(),
            Resolution::Resolved("http://store/documents/a.txt".to_string()),
        );
        targets.insert("b.txt".to_string(), Resolution::Unresolvable);

        let mut ann = annotation(json!({
            "target": ["a.txt#x", "b.txt#y", "c.txt#z", "http://other/a.txt#w"]
        }));
        rewrite_targets(&mut ann, &targets).unwrap();

        assert_eq!(
            ann.get("target"),
            Some(&json!([
                "http://store/documents/a.txt#x",
                "b.txt#y",
                "c.txt#z",
                "http://other/a.txt#w"
            ]))
        );
    }

    #[test]
    fn test_invalid_document_url() {
        let store = FakeStore::new();
        assert!(matches!(
            TargetResolver::new(&store, Some("not a url")),
            Err(SyncError::InvalidUrl { .. })
        ));
    }
}
