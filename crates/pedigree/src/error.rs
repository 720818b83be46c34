//! Error types for pedigree editing operations.
//!
//! This module provides the main error type [`PedigreeError`] returned by the
//! graph model, the identifier registry, the action stack and the save/load
//! engine. Every failing mutation leaves the graph exactly as it was.

use std::io;

use thiserror::Error;

use pedigree_core::{identifier::Id, properties::PropertyError};

/// The main error type for pedigree operations.
///
/// Relationship-policy concerns that are only flagged (such as partnering a
/// node with its own ancestor) are reported as
/// [`Warning`](crate::structure::Warning) values, not as errors.
#[derive(Debug, Error)]
pub enum PedigreeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no node or partnership with id {0}")]
    NotFound(Id),

    #[error("partnership {0} does not exist")]
    InvalidParent(Id),

    #[error("linking node {child} under partnership {partnership} would make it its own ancestor")]
    CycleViolation { child: Id, partnership: Id },

    #[error("nodes {first} and {second} cannot form another partnership")]
    DuplicatePartner { first: Id, second: Id },

    #[error("invalid property value on {id}: {source}")]
    InvalidPropertyValue {
        id: Id,
        #[source]
        source: PropertyError,
    },

    #[error("corrupt document: {0}")]
    CorruptDocument(String),

    #[error("identifier space exhausted")]
    IdSpaceExhausted,

    #[error("identifier {0} is already in use")]
    DuplicateId(Id),

    #[error("{0} still has relations attached")]
    RelationInUse(Id),
}

impl PedigreeError {
    /// Wraps a schema violation raised while changing a property of `id`.
    pub fn invalid_property(id: Id, source: PropertyError) -> Self {
        Self::InvalidPropertyValue { id, source }
    }

    /// Builds a [`PedigreeError::CorruptDocument`] from any displayable reason.
    pub fn corrupt(reason: impl ToString) -> Self {
        Self::CorruptDocument(reason.to_string())
    }
}
