//! oasync CLI
//!
//! Command-line interface for importing and exporting Open Annotation data
//! over RESTful annotation and document stores.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use output::{Output, Verbosity};

#[derive(Parser, Debug)]
#[command(name = "oasync")]
#[command(about = "Import and export Open Annotation data over RESTful interfaces")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import annotation files into an annotation store
    Import {
        /// Source data to import
        #[arg(value_name = "FILE/DIR", required = true)]
        source: Vec<PathBuf>,
        /// URL for annotation store (default http://127.0.0.1:5005/annotations/)
        #[arg(short, long)]
        url: Option<String>,
        /// URL for document store (default http://127.0.0.1:5005/documents/)
        #[arg(short, long)]
        docurl: Option<String>,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// No output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Export annotations and their target texts from a store
    Export {
        /// URL(s) to export data from
        #[arg(value_name = "URL", required = true)]
        source: Vec<String>,
        /// Output directory (default standard output)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            source,
            url,
            docurl,
            verbose,
            quiet,
        } => {
            if let Some(code) = check_import_flags(verbose, quiet)? {
                return Ok(ExitCode::from(code));
            }
            let output = Output::new(Verbosity::from_flags(verbose, quiet));
            init_logging(output.verbosity);
            commands::import::run(&source, url, docurl, &output)?;
        }
        Commands::Export {
            source,
            output,
            verbose,
        } => {
            let out = Output::new(Verbosity::from_flags(verbose, false));
            init_logging(out.verbosity);
            commands::export::run(&source, output, &out)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Reject `--verbose` together with `--quiet`
///
/// Prints the import usage and an error line, and returns the exit status.
fn check_import_flags(verbose: bool, quiet: bool) -> Result<Option<u8>> {
    if !(verbose && quiet) {
        return Ok(None);
    }
    print_subcommand_help("import")?;
    println!("error: both --verbose and --quiet specified.");
    Ok(Some(1))
}

fn print_subcommand_help(name: &str) -> Result<()> {
    let mut cli = Cli::command();
    if let Some(sub) = cli.find_subcommand_mut(name) {
        sub.print_help()?;
        println!();
    }
    Ok(())
}

/// Initialize stderr logging
///
/// RUST_LOG takes precedence over the level implied by the flags.
fn init_logging(verbosity: Verbosity) {
    let level = verbosity.log_level();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("oasync_core={},oasync={}", level, level)));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
