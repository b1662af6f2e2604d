//! Open Annotation JSON-LD documents
//!
//! Annotations are kept as generic JSON maps so that fields this tool does
//! not know about survive an import/export round trip unchanged. Access to
//! the handful of fields we do care about goes through explicit accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Keys used in Open Annotation JSON-LD documents
pub mod keys {
    /// List of collection items in a RESTful OA collection response
    pub const GRAPH: &str = "@graph";
    pub const TARGET: &str = "target";
    pub const ID: &str = "@id";
    pub const TYPE: &str = "@type";
}

/// `@type` values recognized as identifying an OA annotation
pub const ANNOTATION_TYPES: &[&str] = &["oa:Annotation", "http://www.w3.org/ns/oa#Annotation"];

/// The value of an annotation's `target` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Single(String),
    Multiple(Vec<String>),
}

impl Target {
    /// Interpret a JSON value as a target
    ///
    /// Only a string or a list of strings is supported; anything else
    /// (objects, numbers, nested lists) is rejected.
    pub fn from_value(value: &Value) -> SyncResult<Self> {
        match value {
            Value::String(url) => Ok(Target::Single(url.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(url) => Ok(url.clone()),
                    _ => Err(SyncError::format("structured target support")),
                })
                .collect::<SyncResult<Vec<_>>>()
                .map(Target::Multiple),
            _ => Err(SyncError::format("structured target support")),
        }
    }

    /// Target URLs in document order
    pub fn urls(&self) -> &[String] {
        match self {
            Target::Single(url) => std::slice::from_ref(url),
            Target::Multiple(urls) => urls,
        }
    }

    /// Apply `f` to every URL, keeping the single/multiple shape
    pub fn map_urls(self, mut f: impl FnMut(String) -> String) -> Self {
        match self {
            Target::Single(url) => Target::Single(f(url)),
            Target::Multiple(urls) => Target::Multiple(urls.into_iter().map(f).collect()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Target::Single(url) => Value::String(url),
            Target::Multiple(urls) => Value::Array(urls.into_iter().map(Value::String).collect()),
        }
    }
}

/// A single Open Annotation object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotation(Map<String, Value>);

impl Annotation {
    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> SyncResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SyncError::format(format!(
                "expected annotation object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Get a raw field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get the annotation target
    ///
    /// Returns `Ok(None)` when the field is absent or empty, and an error
    /// when it holds an unsupported structure.
    pub fn target(&self) -> SyncResult<Option<Target>> {
        match self.0.get(keys::TARGET) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::Array(items)) if items.is_empty() => Ok(None),
            Some(value) => Target::from_value(value).map(Some),
        }
    }

    pub fn set_target(&mut self, target: Target) {
        self.0.insert(keys::TARGET.to_string(), target.into_value());
    }

    /// Get the `@id` field
    pub fn id(&self) -> Option<&Value> {
        self.0.get(keys::ID)
    }

    /// Remove the `@id` field, returning it if present
    pub fn remove_id(&mut self) -> Option<Value> {
        self.0.remove(keys::ID)
    }

    /// String values of `@type`, which may be a single value or a list
    pub fn types(&self) -> Vec<&str> {
        match self.0.get(keys::TYPE) {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Check whether `@type` names a recognized annotation type
    pub fn is_annotation(&self) -> bool {
        self.types().iter().any(|t| ANNOTATION_TYPES.contains(t))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Check whether a JSON-LD document is a collection (has a graph list)
pub fn is_collection(document: &Value) -> bool {
    document.get(keys::GRAPH).is_some()
}

/// Annotations held in the graph list of a collection document
pub fn graph_annotations(document: &Value) -> SyncResult<Vec<Annotation>> {
    let graph = document
        .get(keys::GRAPH)
        .ok_or_else(|| SyncError::format(format!("missing {}", keys::GRAPH)))?;
    let Value::Array(items) = graph else {
        return Err(SyncError::format(format!(
            "{} must be a list, got {}",
            keys::GRAPH,
            json_kind(graph)
        )));
    };
    items.iter().cloned().map(Annotation::from_value).collect()
}

/// Annotations in a fetched document, which is either a collection or a
/// single annotation
pub fn document_annotations(document: &Value) -> SyncResult<Vec<Annotation>> {
    if is_collection(document) {
        return graph_annotations(document);
    }
    let annotation = Annotation::from_value(document.clone())?;
    if annotation.is_annotation() {
        Ok(vec![annotation])
    } else {
        Err(SyncError::format(
            "document is neither an annotation collection nor an annotation",
        ))
    }
}

/// Check whether a URL lacks a network location component
pub fn is_relative(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map_or(true, str::is_empty),
        // Network-path references ("//host/path") carry a host without a scheme
        Err(_) => match url.strip_prefix("//") {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => true,
        },
    }
}

/// Split a URL into the part before the first `#` and the fragment
///
/// The fragment is empty when the URL has none.
pub fn split_fragment(url: &str) -> (&str, &str) {
    url.split_once('#').unwrap_or((url, ""))
}

/// Pretty-print JSON with sorted keys and two-space indentation
pub fn pretty(value: &Value) -> String {
    // serde_json maps are ordered by key, so output is stable
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
