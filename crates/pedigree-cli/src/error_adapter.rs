//! Error adapter for converting PedigreeError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error type
//! and miette's rich diagnostic formatting used in the CLI.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use pedigree::PedigreeError;

/// Adapter giving a [`PedigreeError`] a stable diagnostic code and, where
/// one exists, a hint for fixing the input.
pub struct ErrorAdapter<'a>(pub &'a PedigreeError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            PedigreeError::Io(_) => "pedigree::io",
            PedigreeError::NotFound(_) => "pedigree::not_found",
            PedigreeError::InvalidParent(_) => "pedigree::invalid_parent",
            PedigreeError::CycleViolation { .. } => "pedigree::cycle",
            PedigreeError::DuplicatePartner { .. } => "pedigree::duplicate_partner",
            PedigreeError::InvalidPropertyValue { .. } => "pedigree::invalid_property",
            PedigreeError::CorruptDocument(_) => "pedigree::corrupt_document",
            PedigreeError::IdSpaceExhausted => "pedigree::id_space_exhausted",
            PedigreeError::DuplicateId(_) => "pedigree::duplicate_id",
            PedigreeError::RelationInUse(_) => "pedigree::relation_in_use",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            PedigreeError::CorruptDocument(_) => {
                "check that every partnership names two existing nodes and that no node descends from itself"
            }
            PedigreeError::CycleViolation { .. } => "a person cannot be their own ancestor",
            PedigreeError::IdSpaceExhausted => "run with --compact-ids to reclaim identifiers",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}
