//! Output formatting for CLI
//!
//! Provides consistent output across commands:
//! - Normal output: batch summaries, and details of failed imports
//! - Verbose output (--verbose): every store response
//! - Quiet mode (--quiet): nothing on stdout

use std::path::Path;

use oasync_core::annotation::pretty;
use oasync_core::{Annotation, ExportSummary, HttpResponse, ImportReporter, SyncError, Tally};

/// Output verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    /// Summaries and failures (default)
    Normal,
    Verbose,
}

impl Verbosity {
    /// Create verbosity from CLI flags
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Default log level for this verbosity
    pub fn log_level(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    pub verbosity: Verbosity,
}

impl Output {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print the result line for one import source
    pub fn summary(&self, source: &Path, tally: &Tally) {
        if !self.is_quiet() {
            println!("{}", summary_line(source, tally));
        }
    }

    /// Print the result line for one export source
    pub fn export_summary(&self, source: &str, summary: &ExportSummary) {
        if !self.is_quiet() {
            println!("{}", export_summary_line(source, summary));
        }
    }

    /// Print an error to stderr
    pub fn error(&self, msg: &str) {
        eprintln!("error: {}", msg);
    }
}

impl ImportReporter for Output {
    fn accepted(&self, _annotation: &Annotation, response: &HttpResponse) {
        if self.is_verbose() {
            println!("{}", response.status.as_u16());
            println!("{}", response.pretty_body());
        }
    }

    fn rejected(&self, annotation: &Annotation, error: &SyncError, response: Option<&HttpResponse>) {
        if self.is_quiet() {
            return;
        }
        println!("{}", error);
        println!("{}", pretty(&annotation.to_value()));
        if let Some(response) = response {
            println!("{}", response.pretty_body());
        }
    }

    fn unreadable(&self, source: &Path, error: &SyncError) {
        if !self.is_quiet() {
            println!("Failed to load json from {}: {}", source.display(), error);
        }
    }
}

/// Format the "<source>: N succeeded, M failed" line
fn summary_line(source: &Path, tally: &Tally) -> String {
    format!("{}: {}", source.display(), tally)
}

/// Format the "<source>: N annotation(s), M text(s)" line
fn export_summary_line(source: &str, summary: &ExportSummary) -> String {
    format!(
        "{}: {} annotation(s), {} text(s)",
        source, summary.annotations, summary.texts
    )
}
