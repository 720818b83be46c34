//! Reversible graph commands and the changes they produce.
//!
//! Every mutation of a [`PedigreeGraph`](super::PedigreeGraph) is expressed
//! as a [`Command`]. Applying one yields a [`Change`] carrying the structural
//! [`GraphDelta`], the command as applied and its exact inverse, so undo never
//! has to reconstruct an inverse after the fact.

use std::collections::BTreeSet;

use pedigree_core::{
    identifier::{Id, IdMapping},
    properties::{PropertyKey, PropertyValue},
};

use super::entity::{GraphSnapshot, Node, Partnership};

/// A reversible mutation of the pedigree graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateNode(Node),
    DestroyNode(Id),
    CreatePartnership(Partnership),
    DestroyPartnership(Id),
    /// Attaches `child` to the hub of `partnership` at position `index`.
    Link {
        child: Id,
        partnership: Id,
        index: usize,
    },
    /// Detaches `child` from its originating partnership.
    Unlink { child: Id },
    SetProperty {
        target: Id,
        key: PropertyKey,
        value: PropertyValue,
    },
    /// Applies the commands in order, atomically.
    Batch(Vec<Command>),
    /// Replaces the whole graph.
    Replace(Box<GraphSnapshot>),
}

impl Command {
    /// An empty batch, the inverse of a no-op.
    pub fn noop() -> Self {
        Self::Batch(Vec::new())
    }

    /// Returns `true` if applying the command changes nothing.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Batch(commands) => commands.iter().all(Command::is_noop),
            _ => false,
        }
    }

    /// Returns `true` if the command replaces the whole graph.
    pub fn is_replace(&self) -> bool {
        match self {
            Self::Replace(_) => true,
            Self::Batch(commands) => commands.iter().any(Command::is_replace),
            _ => false,
        }
    }

    /// Collects every identifier the command refers to.
    pub fn collect_ids(&self, ids: &mut BTreeSet<Id>) {
        match self {
            Self::CreateNode(node) => {
                ids.insert(node.id());
            }
            Self::DestroyNode(id) | Self::DestroyPartnership(id) | Self::Unlink { child: id } => {
                ids.insert(*id);
            }
            Self::CreatePartnership(partnership) => {
                ids.insert(partnership.id());
                ids.extend(partnership.partners());
            }
            Self::Link {
                child, partnership, ..
            } => {
                ids.insert(*child);
                ids.insert(*partnership);
            }
            Self::SetProperty { target, .. } => {
                ids.insert(*target);
            }
            Self::Batch(commands) => {
                for command in commands {
                    command.collect_ids(ids);
                }
            }
            Self::Replace(snapshot) => ids.extend(snapshot.ids()),
        }
    }

    /// Rewrites every identifier through `mapping`.
    pub fn remap(&mut self, mapping: &IdMapping) {
        match self {
            Self::CreateNode(node) => node.remap(mapping),
            Self::DestroyNode(id) | Self::DestroyPartnership(id) | Self::Unlink { child: id } => {
                *id = mapping.apply(*id);
            }
            Self::CreatePartnership(partnership) => partnership.remap(mapping),
            Self::Link {
                child, partnership, ..
            } => {
                *child = mapping.apply(*child);
                *partnership = mapping.apply(*partnership);
            }
            Self::SetProperty { target, .. } => *target = mapping.apply(*target),
            Self::Batch(commands) => {
                for command in commands {
                    command.remap(mapping);
                }
            }
            Self::Replace(snapshot) => snapshot.remap(mapping),
        }
    }

    /// Property assignments performed by the command, in application order.
    pub fn property_updates(&self) -> Vec<(Id, PropertyKey, &PropertyValue)> {
        let mut updates = Vec::new();
        self.push_property_updates(&mut updates);
        updates
    }

    fn push_property_updates<'a>(&'a self, updates: &mut Vec<(Id, PropertyKey, &'a PropertyValue)>) {
        match self {
            Self::SetProperty { target, key, value } => updates.push((*target, *key, value)),
            Self::Batch(commands) => {
                for command in commands {
                    command.push_property_updates(updates);
                }
            }
            _ => {}
        }
    }
}

/// Ids of entities added, removed or changed by a mutation.
///
/// Deltas compose: merging the delta of a creation with the delta of the
/// matching destruction cancels out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDelta {
    pub added: BTreeSet<Id>,
    pub removed: BTreeSet<Id>,
    pub changed: BTreeSet<Id>,
}

impl GraphDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn record_added(&mut self, id: Id) {
        if self.removed.remove(&id) {
            self.changed.insert(id);
        } else {
            self.added.insert(id);
        }
    }

    pub fn record_removed(&mut self, id: Id) {
        self.changed.remove(&id);
        if !self.added.remove(&id) {
            self.removed.insert(id);
        }
    }

    pub fn record_changed(&mut self, id: Id) {
        if !self.added.contains(&id) && !self.removed.contains(&id) {
            self.changed.insert(id);
        }
    }

    /// Folds a later delta into this one.
    pub fn merge(&mut self, later: &GraphDelta) {
        for id in &later.removed {
            self.record_removed(*id);
        }
        for id in &later.added {
            self.record_added(*id);
        }
        for id in &later.changed {
            self.record_changed(*id);
        }
    }

    /// Every id mentioned by the delta.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.changed)
            .copied()
    }

    pub fn remap(&mut self, mapping: &IdMapping) {
        for set in [&mut self.added, &mut self.removed, &mut self.changed] {
            *set = set.iter().map(|id| mapping.apply(*id)).collect();
        }
    }
}

/// Relationship-policy concerns that are flagged but not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A partnership joins a node with one of its own ancestors.
    IncestConstraintViolation { partnership: Id, ancestor: Id, descendant: Id },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncestConstraintViolation {
                partnership,
                ancestor,
                descendant,
            } => write!(
                f,
                "partnership {partnership} joins {descendant} with their ancestor {ancestor}"
            ),
        }
    }
}

/// Outcome of applying a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub delta: GraphDelta,
    /// The command as applied, normalised (e.g. clamped link positions).
    pub forward: Command,
    /// Restores the exact prior state when applied.
    pub inverse: Command,
    pub warnings: Vec<Warning>,
}

impl Change {
    pub(crate) fn new(delta: GraphDelta, forward: Command, inverse: Command) -> Self {
        Self {
            delta,
            forward,
            inverse,
            warnings: Vec::new(),
        }
    }

    /// A change that did nothing.
    pub fn noop(forward: Command) -> Self {
        Self::new(GraphDelta::new(), forward, Command::noop())
    }

    /// Combines changes applied in sequence into a single batch change.
    pub(crate) fn compose(changes: Vec<Change>) -> Self {
        let mut delta = GraphDelta::new();
        let mut forwards = Vec::with_capacity(changes.len());
        let mut inverses = Vec::with_capacity(changes.len());
        let mut warnings = Vec::new();
        for change in changes {
            delta.merge(&change.delta);
            forwards.push(change.forward);
            inverses.push(change.inverse);
            warnings.extend(change.warnings);
        }
        inverses.reverse();
        Self {
            delta,
            forward: Command::Batch(forwards),
            inverse: Command::Batch(inverses),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use pedigree_core::properties::PersonProperties;

    use super::*;

    #[test]
    fn test_delta_create_then_destroy_cancels() {
        let mut delta = GraphDelta::new();
        delta.record_added(Id::new(3));
        delta.record_changed(Id::new(3));
        delta.record_removed(Id::new(3));

        assert!(delta.is_empty());
    }

    #[test]
    fn test_delta_destroy_then_recreate_is_change() {
        let mut delta = GraphDelta::new();
        delta.record_removed(Id::new(4));
        delta.record_added(Id::new(4));

        assert!(delta.added.is_empty());
        assert!(delta.removed.is_empty());
        assert!(delta.changed.contains(&Id::new(4)));
    }

    #[test]
    fn test_compose_reverses_inverses() {
        let first = Change::new(
            GraphDelta::new(),
            Command::DestroyNode(Id::new(1)),
            Command::DestroyNode(Id::new(10)),
        );
        let second = Change::new(
            GraphDelta::new(),
            Command::DestroyNode(Id::new(2)),
            Command::DestroyNode(Id::new(20)),
        );

        let change = Change::compose(vec![first, second]);
        assert_eq!(
            change.inverse,
            Command::Batch(vec![
                Command::DestroyNode(Id::new(20)),
                Command::DestroyNode(Id::new(10)),
            ])
        );
    }

    #[test]
    fn test_collect_and_remap_ids() {
        let mut command = Command::Batch(vec![
            Command::CreateNode(Node::person(Id::new(5), PersonProperties::default())),
            Command::Link {
                child: Id::new(5),
                partnership: Id::new(8),
                index: 0,
            },
        ]);
        let mut ids = BTreeSet::new();
        command.collect_ids(&mut ids);
        assert_eq!(ids, BTreeSet::from([Id::new(5), Id::new(8)]));

        let mapping: IdMapping = [(Id::new(5), Id::new(1)), (Id::new(8), Id::new(2))]
            .into_iter()
            .collect();
        command.remap(&mapping);

        let mut ids = BTreeSet::new();
        command.collect_ids(&mut ids);
        assert_eq!(ids, BTreeSet::from([Id::new(1), Id::new(2)]));
    }

    #[test]
    fn test_property_updates_walk_batches() {
        let command = Command::Batch(vec![
            Command::SetProperty {
                target: Id::new(1),
                key: PropertyKey::Adopted,
                value: PropertyValue::Bool(true),
            },
            Command::Batch(vec![Command::SetProperty {
                target: Id::new(2),
                key: PropertyKey::Comments,
                value: "twin".into(),
            }]),
        ]);

        let updates = command.property_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].0, Id::new(2));
        assert_eq!(updates[1].1, PropertyKey::Comments);
    }

    #[test]
    fn test_noop_detection() {
        assert!(Command::noop().is_noop());
        assert!(Command::Batch(vec![Command::noop()]).is_noop());
        assert!(!Command::DestroyNode(Id::new(1)).is_noop());
    }
}
