//! Pedigree - the core of a genetic-pedigree editor.
//!
//! A mutable family graph of persons, person groups and partnerships that is
//! laid out as a generation-ranked diagram after every edit, with linear
//! undo/redo, identifier compaction and structural documents.
//!
//! # Examples
//!
//! ```rust
//! use pedigree::{
//!     EditorSession,
//!     attributes::Gender,
//!     properties::{PartnershipProperties, PersonProperties},
//!     structure::CascadePolicy,
//! };
//!
//! let mut session = EditorSession::default();
//! let mother = session.add_person(None, PersonProperties::with_gender(Gender::Female))?;
//! let father = session.add_person(None, PersonProperties::with_gender(Gender::Male))?;
//! let (union, _warnings) =
//!     session.add_partnership(mother, father, PartnershipProperties::default())?;
//! let child = session.add_person(Some(union), PersonProperties::default())?;
//!
//! let rank = |id| session.placement(id).map(|placement| placement.rank());
//! assert_eq!(rank(union), rank(mother));
//! assert_eq!(rank(child), rank(union).map(|rank| rank + 1));
//!
//! session.remove_node(child, CascadePolicy::default())?;
//! session.undo()?;
//! assert!(session.graph().node(child).is_some());
//! # Ok::<(), pedigree::PedigreeError>(())
//! ```

pub mod config;
pub mod events;
pub mod history;
pub mod layout;
pub mod legend;
pub mod registry;
pub mod save_load;
pub mod structure;

mod error;
mod session;

pub use pedigree_core::{attributes, color, geometry, identifier, properties};

pub use error::PedigreeError;
pub use session::EditorSession;
