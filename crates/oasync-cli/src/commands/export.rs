//! Export command handler

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::debug;

use oasync_core::{Config, Destination, Exporter, HttpStoreClient};

use crate::output::Output;

/// Export annotation documents and their target texts
///
/// Every source is attempted; a failing source is reported and the command
/// fails once all sources have been tried.
pub fn run(sources: &[String], output_dir: Option<PathBuf>, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let client = HttpStoreClient::new(config.timeout())?;
    let destination = Destination::from_output(output_dir);
    // Exported documents go to stdout unless an output directory was given
    let show_summary = destination != Destination::Stdout;
    debug!("exporting {} source(s) to {:?}", sources.len(), destination);
    let exporter = Exporter::new(&client, destination);

    let mut failed = 0;
    for source in sources {
        match exporter.export_from(source) {
            Ok(summary) => {
                if show_summary {
                    output.export_summary(source, &summary);
                }
            }
            Err(e) => {
                debug!("export of {} failed: {:?}", source, e);
                output.error(&format!("{}: {}", source, e));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} source(s) failed to export", failed, sources.len());
    }
    Ok(())
}
