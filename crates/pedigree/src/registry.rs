//! Identifier registry.
//!
//! Nodes and partnerships draw their identifiers from one shared space. An
//! identifier is *live* while an entity uses it and *retired* once the entity
//! is destroyed. Retired identifiers are never handed out again by
//! [`IdRegistry::allocate`], because undo history may still bring the entity
//! back with its original identifier through [`IdRegistry::claim`]. Only an
//! explicit [`IdRegistry::remap`] compacts the space.

use std::collections::BTreeSet;

use log::{debug, trace};

use pedigree_core::identifier::{Id, IdMapping};

use crate::error::PedigreeError;

/// Allocator of stable entity identifiers.
#[derive(Debug, Clone)]
pub struct IdRegistry {
    next: u32,
    live: BTreeSet<Id>,
    retired: BTreeSet<Id>,
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdRegistry {
    /// Creates an empty registry; the first allocated id is 1.
    pub fn new() -> Self {
        Self {
            next: 1,
            live: BTreeSet::new(),
            retired: BTreeSet::new(),
        }
    }

    /// Issues the next never-used identifier and marks it live.
    ///
    /// # Errors
    ///
    /// Returns [`PedigreeError::IdSpaceExhausted`] once `u32::MAX` has been issued.
    pub fn allocate(&mut self) -> Result<Id, PedigreeError> {
        let id = Id::new(self.next);
        self.next = self
            .next
            .checked_add(1)
            .ok_or(PedigreeError::IdSpaceExhausted)?;
        self.live.insert(id);
        trace!(id = id.get(); "Identifier allocated");
        Ok(id)
    }

    /// Retires a live identifier. Returns `false` if it was not live.
    pub fn release(&mut self, id: Id) -> bool {
        if !self.live.remove(&id) {
            return false;
        }
        self.retired.insert(id);
        trace!(id = id.get(); "Identifier retired");
        true
    }

    /// Marks a specific identifier live again, or for the first time.
    ///
    /// Claiming an id at or above the allocation counter advances the counter
    /// past it. Claiming an already live id is a no-op.
    pub fn claim(&mut self, id: Id) -> Result<(), PedigreeError> {
        if id.get() >= self.next {
            self.next = id
                .get()
                .checked_add(1)
                .ok_or(PedigreeError::IdSpaceExhausted)?;
        }
        self.retired.remove(&id);
        self.live.insert(id);
        Ok(())
    }

    /// Returns `true` if `id` is currently live.
    pub fn is_live(&self, id: Id) -> bool {
        self.live.contains(&id)
    }

    /// Returns `true` if `id` was issued and has since been retired.
    pub fn is_retired(&self, id: Id) -> bool {
        self.retired.contains(&id)
    }

    /// Number of live identifiers.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// The identifier the next call to [`allocate`](Self::allocate) returns.
    pub fn peek_next(&self) -> Id {
        Id::new(self.next)
    }

    /// Forgets every identifier and restarts allocation at 1.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Compacts identifiers to the dense range starting at 1.
    ///
    /// Live identifiers and the `reserved` ones (still referenced by undo
    /// history or other holders) keep their relative order; every other
    /// retired identifier is forgotten. Reserved identifiers that are not
    /// live stay retired under their new value.
    pub fn remap(&mut self, reserved: &BTreeSet<Id>) -> IdMapping {
        let kept: BTreeSet<Id> = self.live.union(reserved).copied().collect();

        let mut mapping = IdMapping::new();
        let mut live = BTreeSet::new();
        let mut retired = BTreeSet::new();
        // `kept` never holds more than `u32::MAX` ids, so the dense range fits.
        for (new, old) in (1..=u32::MAX).zip(kept.iter().copied()) {
            let new = Id::new(new);
            mapping.insert(old, new);
            if self.live.contains(&old) {
                live.insert(new);
            } else {
                retired.insert(new);
            }
        }

        self.next = u32::try_from(kept.len())
            .ok()
            .and_then(|count| count.checked_add(1))
            .unwrap_or(u32::MAX);
        self.live = live;
        self.retired = retired;

        debug!(
            remapped = mapping.len(),
            live = self.live.len(),
            reserved = self.retired.len();
            "Identifiers compacted"
        );
        mapping
    }
}
