//! Command-line argument definitions for the pedigree CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control the input document, the layout and
//! document outputs, configuration file selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the pedigree layout tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input pedigree document
    #[arg(help = "Path to the input JSON document")]
    pub input: String,

    /// Path to the output layout file
    #[arg(short, long, default_value = "layout.json")]
    pub output: String,

    /// Also write the normalised document to this path
    #[arg(long)]
    pub document: Option<String>,

    /// Compact identifiers to a dense range before writing
    #[arg(long)]
    pub compact_ids: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
