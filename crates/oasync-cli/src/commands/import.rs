//! Import command handler

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use oasync_core::{Config, HttpStoreClient, Importer, TargetResolver};

use crate::output::Output;

/// Import annotation files and directories into the annotation store
///
/// `url` and `docurl` override the configured store URLs.
pub fn run(
    sources: &[PathBuf],
    url: Option<String>,
    docurl: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = url {
        config.annotation_url = url;
    }
    if let Some(docurl) = docurl {
        config.document_url = Some(docurl);
    }
    let config = config.normalized();
    debug!(
        "annotation store: {}, document store: {}",
        config.annotation_url,
        config.document_url.as_deref().unwrap_or("(none)")
    );

    let client = HttpStoreClient::new(config.timeout())?;
    let resolver = TargetResolver::new(&client, config.document_url.as_deref())
        .context("Invalid document store URL")?;
    let mut importer = Importer::new(resolver, config.annotation_url.as_str(), output);

    for source in sources {
        let tally = importer.import_from(source);
        output.summary(source, &tally);
    }

    Ok(())
}
