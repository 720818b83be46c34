//! Pedigree CLI library
//!
//! This module contains the core CLI logic for the pedigree layout tool.

pub mod error_adapter;
pub mod report;

mod args;
mod config;

pub use args::Args;

use std::{fs, io};

use log::info;

use pedigree::{EditorSession, PedigreeError, save_load::Document};

use report::LayoutReport;

/// Run the pedigree CLI application
///
/// This function loads the input document into an editor session, lays it
/// out and writes the placements as JSON to the output file. When requested,
/// identifiers are compacted first and the normalised document is written
/// as well.
///
/// # Errors
///
/// Returns `PedigreeError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed or inconsistent documents
pub fn run(args: &Args) -> Result<(), PedigreeError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing pedigree"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;
    let document = Document::from_json(&source)?;

    let mut session = EditorSession::new(&app_config);
    session.load_document(&document)?;
    if args.compact_ids {
        session.compact_ids();
    }

    let report = LayoutReport::from_layout(session.layout());
    let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    fs::write(&args.output, json)?;
    info!(
        output_file = args.output,
        placements = report.placements.len();
        "Layout exported successfully"
    );

    if let Some(path) = &args.document {
        fs::write(path, session.serialize().to_json()?)?;
        info!(document_file = path; "Document exported successfully");
    }

    Ok(())
}
