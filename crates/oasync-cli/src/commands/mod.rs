//! Subcommand handlers

pub mod export;
pub mod import;
