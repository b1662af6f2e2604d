//! oasync Core Library
//!
//! This crate moves Open Annotation (JSON-LD) documents between local files
//! and RESTful annotation and document stores.
//!
//! # Architecture
//!
//! - **Import**: local `.jsonld` collections are posted to an annotation
//!   store. Relative targets ("doc.txt#char=0,10") are uploaded to a document
//!   store first and rewritten to absolute URLs.
//! - **Export**: an annotation collection and the plain text of every
//!   document it targets are fetched and written locally.
//!
//! All network access goes through the [`StoreClient`] trait.
//!
//! # Quick Start
//!
//! ```text
//! let client = HttpStoreClient::new(config.timeout())?;
//! let resolver = TargetResolver::new(&client, config.document_url.as_deref())?;
//! let mut importer = Importer::new(resolver, &config.annotation_url, NullReporter);
//!
//! let tally = importer.import_from(Path::new("data/"));
//! println!("{}", tally);
//! ```
//!
//! # Modules
//!
//! - `annotation`: Annotation documents, targets and URL helpers
//! - `client`: HTTP access to the stores
//! - `resolver`: Relative target resolution and upload
//! - `importer`: Local files to annotation store
//! - `exporter`: Annotation store to local files
//! - `source`: Import source discovery and file reading
//! - `encoding`: Plain-text charset handling
//! - `config`: Application configuration

pub mod annotation;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod resolver;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use annotation::{Annotation, Target};
pub use client::{HttpResponse, HttpStoreClient, StoreClient};
pub use config::Config;
pub use error::{SyncError, SyncResult};
pub use exporter::{Destination, ExportSummary, Exporter};
pub use importer::{ImportReporter, Importer, NullReporter, Outcome, Tally};
pub use resolver::{Resolution, TargetMap, TargetResolver};
