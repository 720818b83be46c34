//! The pedigree graph model.
//!
//! - [`PedigreeGraph`] - authoritative structural data and its operations
//! - [`Command`] / [`Change`] - reversible mutations and their outcomes
//! - [`Node`], [`Partnership`] - entity records
//! - [`Summary`] - read-only property projection for editing collaborators

mod childless;
mod command;
mod entity;
mod graph_base;
mod pedigree_graph;
mod summary;
mod validation;

pub use command::{Change, Command, GraphDelta, Warning};
pub use entity::{GraphSnapshot, Node, NodeKind, Partnership};
pub use pedigree_graph::{CascadePolicy, PedigreeGraph};
pub use summary::{Summary, SummaryField};
