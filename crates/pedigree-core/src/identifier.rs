//! Identifiers for pedigree entities and clinical terms.
//!
//! Two identifier families live here:
//!
//! - [`Id`] - a small numeric identifier shared by nodes and partnerships. Ids
//!   are issued by the editor's identifier registry and stay stable across
//!   structural edits until an explicit compaction remaps them.
//! - [`TermId`] - an interned string naming a disorder, gene or phenotype
//!   term (e.g. `"OMIM:143100"`, `"BRCA1"`, `"HP:0001250"`).
//!
//! [`IdMapping`] carries the old→new table produced by a compaction so that
//! every holder of back-references can rewrite them.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Numeric identifier of a node or partnership.
///
/// # Examples
///
/// ```
/// use pedigree_core::identifier::Id;
///
/// let id = Id::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id(u32);

impl Id {
    /// Creates an `Id` from its raw value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Old→new identifier table produced when identifiers are compacted.
///
/// Ids absent from the table are unchanged.
///
/// # Examples
///
/// ```
/// use pedigree_core::identifier::{Id, IdMapping};
///
/// let mut mapping = IdMapping::new();
/// mapping.insert(Id::new(5), Id::new(2));
///
/// assert_eq!(mapping.apply(Id::new(5)), Id::new(2));
/// assert_eq!(mapping.apply(Id::new(9)), Id::new(9));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    changes: BTreeMap<Id, Id>,
}

impl IdMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `old` is now known as `new`. Identity entries are skipped.
    pub fn insert(&mut self, old: Id, new: Id) {
        if old != new {
            self.changes.insert(old, new);
        }
    }

    /// Translates an id through the mapping.
    pub fn apply(&self, id: Id) -> Id {
        self.changes.get(&id).copied().unwrap_or(id)
    }

    /// Returns `true` if no identifier changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of identifiers that change.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates over `(old, new)` pairs in ascending order of the old id.
    pub fn iter(&self) -> impl Iterator<Item = (Id, Id)> + '_ {
        self.changes.iter().map(|(old, new)| (*old, *new))
    }
}

impl FromIterator<(Id, Id)> for IdMapping {
    fn from_iter<I: IntoIterator<Item = (Id, Id)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (old, new) in iter {
            mapping.insert(old, new);
        }
        mapping
    }
}

/// Global string interner for clinical term identifiers.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn with_interner<R>(f: impl FnOnce(&mut DefaultStringInterner) -> R) -> R {
    let mut interner = INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut interner)
}

/// Interned identifier of a disorder, gene or phenotype term.
///
/// Term identifiers are compared and hashed by symbol, so equal strings always
/// yield equal `TermId`s.
///
/// # Examples
///
/// ```
/// use pedigree_core::identifier::TermId;
///
/// let a = TermId::new("HP:0001250");
/// let b = TermId::new("HP:0001250");
/// assert_eq!(a, b);
/// assert_eq!(a.as_string(), "HP:0001250");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermId(DefaultSymbol);

impl TermId {
    /// Interns `name` and returns its identifier.
    pub fn new(name: &str) -> Self {
        Self(with_interner(|interner| interner.get_or_intern(name)))
    }

    /// Returns the term name as an owned string.
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = with_interner(|interner| interner.resolve(self.0).map(str::to_owned));
        match name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<unresolved term>"),
        }
    }
}

impl PartialEq<str> for TermId {
    fn eq(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

impl PartialEq<&str> for TermId {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl From<&str> for TermId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Serialize for TermId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TermId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(&name))
    }
}
