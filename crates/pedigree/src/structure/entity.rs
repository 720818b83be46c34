//! Pedigree entities: nodes, partnerships and whole-graph snapshots.

use std::collections::BTreeMap;

use pedigree_core::{
    identifier::{Id, IdMapping},
    properties::{PartnershipProperties, PersonProperties},
};

/// Variant of a pedigree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Person,
    /// A compressed set of anonymous siblings. A count of 1 stands for an
    /// unknown number ("N").
    PersonGroup { count: u32 },
}

impl NodeKind {
    pub fn is_group(self) -> bool {
        matches!(self, Self::PersonGroup { .. })
    }

    /// Document name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::PersonGroup { .. } => "personGroup",
        }
    }
}

/// An individual or a group of individuals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: Id,
    kind: NodeKind,
    properties: PersonProperties,
}

impl Node {
    pub fn new(id: Id, kind: NodeKind, properties: PersonProperties) -> Self {
        Self {
            id,
            kind,
            properties,
        }
    }

    pub fn person(id: Id, properties: PersonProperties) -> Self {
        Self::new(id, NodeKind::Person, properties)
    }

    pub fn group(id: Id, count: u32, properties: PersonProperties) -> Self {
        Self::new(id, NodeKind::PersonGroup { count }, properties)
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn properties(&self) -> &PersonProperties {
        &self.properties
    }

    pub fn is_placeholder(&self) -> bool {
        self.properties.placeholder
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PersonProperties {
        &mut self.properties
    }

    pub(crate) fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    pub(crate) fn remap(&mut self, mapping: &IdMapping) {
        self.id = mapping.apply(self.id);
    }
}

/// A couple relationship between exactly two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partnership {
    id: Id,
    partners: [Id; 2],
    properties: PartnershipProperties,
}

impl Partnership {
    pub fn new(id: Id, partners: [Id; 2], properties: PartnershipProperties) -> Self {
        Self {
            id,
            partners,
            properties,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn partners(&self) -> [Id; 2] {
        self.partners
    }

    pub fn has_partner(&self, node: Id) -> bool {
        self.partners.contains(&node)
    }

    /// The partner that is not `node`, if `node` is a partner.
    pub fn other_partner(&self, node: Id) -> Option<Id> {
        match self.partners {
            [a, b] if a == node => Some(b),
            [a, b] if b == node => Some(a),
            _ => None,
        }
    }

    /// Returns `true` if this partnership joins exactly `a` and `b`.
    pub fn joins(&self, a: Id, b: Id) -> bool {
        self.partners == [a, b] || self.partners == [b, a]
    }

    pub fn properties(&self) -> &PartnershipProperties {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PartnershipProperties {
        &mut self.properties
    }

    pub(crate) fn remap(&mut self, mapping: &IdMapping) {
        self.id = mapping.apply(self.id);
        self.partners = self.partners.map(|partner| mapping.apply(partner));
    }
}

/// Complete structural state of a graph, independent of any registry.
///
/// Used by whole-graph replacement (loading, import, templates) and as the
/// payload of the undoable [`Command::Replace`](super::Command::Replace).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub partnerships: Vec<Partnership>,
    /// Ordered children of each partnership that has any.
    pub children: BTreeMap<Id, Vec<Id>>,
}

impl GraphSnapshot {
    /// Every identifier used by the snapshot.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.nodes
            .iter()
            .map(Node::id)
            .chain(self.partnerships.iter().map(Partnership::id))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.partnerships.is_empty()
    }

    pub(crate) fn remap(&mut self, mapping: &IdMapping) {
        for node in &mut self.nodes {
            node.remap(mapping);
        }
        for partnership in &mut self.partnerships {
            partnership.remap(mapping);
        }
        self.children = std::mem::take(&mut self.children)
            .into_iter()
            .map(|(partnership, children)| {
                let children = children.into_iter().map(|c| mapping.apply(c)).collect();
                (mapping.apply(partnership), children)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_partner() {
        let partnership = Partnership::new(
            Id::new(3),
            [Id::new(1), Id::new(2)],
            PartnershipProperties::default(),
        );

        assert_eq!(partnership.other_partner(Id::new(1)), Some(Id::new(2)));
        assert_eq!(partnership.other_partner(Id::new(2)), Some(Id::new(1)));
        assert_eq!(partnership.other_partner(Id::new(7)), None);
        assert!(partnership.joins(Id::new(2), Id::new(1)));
    }

    #[test]
    fn test_snapshot_remap_rewrites_every_reference() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![
                Node::person(Id::new(4), PersonProperties::default()),
                Node::person(Id::new(6), PersonProperties::default()),
                Node::person(Id::new(9), PersonProperties::default()),
            ],
            partnerships: vec![Partnership::new(
                Id::new(7),
                [Id::new(4), Id::new(6)],
                PartnershipProperties::default(),
            )],
            children: BTreeMap::from([(Id::new(7), vec![Id::new(9)])]),
        };
        let mapping: IdMapping = [
            (Id::new(4), Id::new(1)),
            (Id::new(6), Id::new(2)),
            (Id::new(7), Id::new(3)),
            (Id::new(9), Id::new(4)),
        ]
        .into_iter()
        .collect();

        snapshot.remap(&mapping);

        let ids: Vec<u32> = snapshot.ids().map(Id::get).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert_eq!(snapshot.partnerships[0].partners(), [Id::new(1), Id::new(2)]);
        assert_eq!(snapshot.children[&Id::new(3)], vec![Id::new(4)]);
    }
}
