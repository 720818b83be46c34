//! Low-level relation index for the pedigree graph.
//!
//! This module stores the two relations of a pedigree independently of the
//! entity records themselves:
//!
//! - **partner-of**: node → partnerships the node is a partner in
//! - **child-of**: child node → originating partnership, with the reverse
//!   *child hub* partnership → ordered children
//!
//! Both directions of each relation are kept so that traversals upwards
//! (ancestors) and downwards (descendants) are lookups rather than scans.
//! The index performs no policy checks; [`PedigreeGraph`](super::PedigreeGraph)
//! validates every change before it reaches this layer.

use std::collections::HashMap;

use pedigree_core::identifier::{Id, IdMapping};

// =============================================================================
// Core relation index
// =============================================================================

/// Bidirectional index of partner-of and child-of edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct RelationIndex {
    /// Partnerships each node is a partner in, sorted by id.
    unions: HashMap<Id, Vec<Id>>,
    /// Ordered children of each partnership.
    hubs: HashMap<Id, Vec<Id>>,
    /// Originating partnership of each child.
    origins: HashMap<Id, Id>,
}

impl RelationIndex {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Partnerships `node` is a partner in, in ascending id order.
    pub(super) fn unions(&self, node: Id) -> &[Id] {
        self.unions.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Children of `partnership` in child-hub order.
    pub(super) fn children(&self, partnership: Id) -> &[Id] {
        self.hubs.get(&partnership).map_or(&[], Vec::as_slice)
    }

    /// The partnership `child` descends from, if any.
    pub(super) fn origin(&self, child: Id) -> Option<Id> {
        self.origins.get(&child).copied()
    }

    /// Returns `true` if `id` takes part in any relation.
    pub(super) fn is_connected(&self, id: Id) -> bool {
        !self.unions(id).is_empty() || !self.children(id).is_empty() || self.origin(id).is_some()
    }

    /// Records `node` as a partner of `partnership`.
    pub(super) fn attach_partner(&mut self, node: Id, partnership: Id) {
        let unions = self.unions.entry(node).or_default();
        if let Err(position) = unions.binary_search(&partnership) {
            unions.insert(position, partnership);
        }
    }

    /// Removes the partner-of edge between `node` and `partnership`.
    pub(super) fn detach_partner(&mut self, node: Id, partnership: Id) {
        if let Some(unions) = self.unions.get_mut(&node) {
            unions.retain(|&id| id != partnership);
            if unions.is_empty() {
                self.unions.remove(&node);
            }
        }
    }

    /// Inserts `child` into the hub of `partnership` at `index`, clamped to
    /// the hub length. Returns the index actually used.
    pub(super) fn link_child(&mut self, child: Id, partnership: Id, index: usize) -> usize {
        let hub = self.hubs.entry(partnership).or_default();
        let index = index.min(hub.len());
        hub.insert(index, child);
        self.origins.insert(child, partnership);
        index
    }

    /// Detaches `child` from its originating partnership.
    ///
    /// Returns the partnership and the position the child held in its hub.
    pub(super) fn unlink_child(&mut self, child: Id) -> Option<(Id, usize)> {
        let partnership = self.origins.remove(&child)?;
        let hub = self.hubs.get_mut(&partnership)?;
        let index = hub.iter().position(|&id| id == child)?;
        hub.remove(index);
        if hub.is_empty() {
            self.hubs.remove(&partnership);
        }
        Some((partnership, index))
    }

    /// Rewrites every identifier through `mapping`.
    pub(super) fn remap(&mut self, mapping: &IdMapping) {
        self.unions = std::mem::take(&mut self.unions)
            .into_iter()
            .map(|(node, unions)| {
                let mut unions: Vec<Id> = unions.into_iter().map(|id| mapping.apply(id)).collect();
                unions.sort();
                (mapping.apply(node), unions)
            })
            .collect();
        self.hubs = std::mem::take(&mut self.hubs)
            .into_iter()
            .map(|(partnership, children)| {
                let children = children.into_iter().map(|id| mapping.apply(id)).collect();
                (mapping.apply(partnership), children)
            })
            .collect();
        self.origins = std::mem::take(&mut self.origins)
            .into_iter()
            .map(|(child, partnership)| (mapping.apply(child), mapping.apply(partnership)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> Id {
        Id::new(value)
    }

    #[test]
    fn test_new_index_is_empty() {
        let index = RelationIndex::new();
        assert!(index.unions(id(1)).is_empty());
        assert!(index.children(id(1)).is_empty());
        assert_eq!(index.origin(id(1)), None);
        assert!(!index.is_connected(id(1)));
    }

    #[test]
    fn test_unions_stay_sorted_and_unique() {
        let mut index = RelationIndex::new();
        index.attach_partner(id(1), id(9));
        index.attach_partner(id(1), id(4));
        index.attach_partner(id(1), id(9));

        assert_eq!(index.unions(id(1)), &[id(4), id(9)]);

        index.detach_partner(id(1), id(4));
        index.detach_partner(id(1), id(9));
        assert!(!index.is_connected(id(1)));
    }

    #[test]
    fn test_link_clamps_index_and_unlink_reports_position() {
        let mut index = RelationIndex::new();
        assert_eq!(index.link_child(id(3), id(10), 0), 0);
        assert_eq!(index.link_child(id(4), id(10), usize::MAX), 1);
        assert_eq!(index.link_child(id(5), id(10), 1), 1);

        assert_eq!(index.children(id(10)), &[id(3), id(5), id(4)]);
        assert_eq!(index.origin(id(5)), Some(id(10)));

        assert_eq!(index.unlink_child(id(5)), Some((id(10), 1)));
        assert_eq!(index.unlink_child(id(5)), None);
        assert_eq!(index.children(id(10)), &[id(3), id(4)]);
    }

    #[test]
    fn test_unlink_then_relink_restores_equality() {
        let mut index = RelationIndex::new();
        index.link_child(id(3), id(10), 0);
        index.link_child(id(4), id(10), 1);
        let before = index.clone();

        let (partnership, position) = index.unlink_child(id(3)).unwrap();
        index.link_child(id(3), partnership, position);

        assert_eq!(index, before);
    }

    #[test]
    fn test_remap_rewrites_both_directions() {
        let mut index = RelationIndex::new();
        index.attach_partner(id(5), id(8));
        index.link_child(id(6), id(8), 0);

        let mapping: IdMapping = [(id(5), id(1)), (id(6), id(2)), (id(8), id(3))]
            .into_iter()
            .collect();
        index.remap(&mapping);

        assert_eq!(index.unions(id(1)), &[id(3)]);
        assert_eq!(index.children(id(3)), &[id(2)]);
        assert_eq!(index.origin(id(2)), Some(id(3)));
        assert!(index.children(id(8)).is_empty());
    }
}
