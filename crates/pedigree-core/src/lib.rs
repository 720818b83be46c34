//! Pedigree Core Types and Definitions
//!
//! This crate provides the foundational types shared by the pedigree editor
//! crates. It includes:
//!
//! - **Identifiers**: Numeric entity identifiers and interned clinical term
//!   identifiers ([`identifier::Id`], [`identifier::TermId`])
//! - **Colors**: Color handling with CSS color support ([`color::Color`])
//! - **Geometry**: Basic geometric types ([`geometry`] module)
//! - **Attributes**: Enumerated person and partnership attributes ([`attributes`] module)
//! - **Properties**: The typed property schema and its validation ([`properties`] module)

pub mod attributes;
pub mod color;
pub mod geometry;
pub mod identifier;
pub mod properties;
