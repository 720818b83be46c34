//! Structural validation of nodes and whole-graph snapshots.

use std::collections::{BTreeSet, HashSet};

use petgraph::{algo::toposort, graphmap::DiGraphMap};

use pedigree_core::{
    identifier::Id,
    properties::{PropertyError, PropertyKey, PersonProperties, MAX_GROUP_SIZE},
};

use super::entity::{GraphSnapshot, Node, NodeKind};

/// Checks node-level rules that depend on the node kind.
pub(super) fn check_node(node: &Node) -> Result<(), PropertyError> {
    if let NodeKind::PersonGroup { count } = node.kind() {
        if count == 0 || i64::from(count) > MAX_GROUP_SIZE {
            return Err(PropertyError::OutOfRange {
                key: PropertyKey::NumPersons.as_str(),
                reason: format!("{count} is not between 1 and {MAX_GROUP_SIZE}"),
            });
        }
    }
    check_kind_properties(node.kind(), node.properties())
}

/// Checks that `properties` are allowed for a node of `kind`.
pub(super) fn check_kind_properties(
    kind: NodeKind,
    properties: &PersonProperties,
) -> Result<(), PropertyError> {
    if kind.is_group() && !properties.life_status.is_allowed_for_group() {
        return Err(PropertyError::NotApplicable {
            key: PropertyKey::LifeStatus.as_str(),
            target: "a person group",
        });
    }
    Ok(())
}

/// Validates a snapshot against every structural invariant.
///
/// Returns a human-readable reason for the first violation found.
pub(super) fn check_snapshot(snapshot: &GraphSnapshot) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in snapshot.ids() {
        if !seen.insert(id) {
            return Err(format!("identifier {id} is used more than once"));
        }
        if id.get() == u32::MAX {
            return Err(format!("identifier {id} leaves no room for new entities"));
        }
    }

    let node_ids: HashSet<Id> = snapshot.nodes.iter().map(Node::id).collect();
    for node in &snapshot.nodes {
        check_node(node).map_err(|err| format!("node {}: {err}", node.id()))?;
    }

    let mut graph = DiGraphMap::<Id, ()>::new();
    let mut couples = BTreeSet::new();
    for partnership in &snapshot.partnerships {
        let id = partnership.id();
        let [a, b] = partnership.partners();
        for partner in [a, b] {
            if !node_ids.contains(&partner) {
                return Err(format!("partnership {id} refers to unknown node {partner}"));
            }
        }
        if a == b {
            return Err(format!("partnership {id} joins node {a} with itself"));
        }
        if !couples.insert((a.min(b), a.max(b))) {
            return Err(format!("nodes {a} and {b} have more than one partnership"));
        }
        graph.add_edge(a, id, ());
        graph.add_edge(b, id, ());
    }

    let mut has_parents = HashSet::new();
    for (&partnership, children) in &snapshot.children {
        let Some(owner) = snapshot.partnerships.iter().find(|p| p.id() == partnership) else {
            return Err(format!("children listed for unknown partnership {partnership}"));
        };
        for &child in children {
            if !node_ids.contains(&child) {
                return Err(format!("partnership {partnership} has unknown child {child}"));
            }
            if owner.has_partner(child) {
                return Err(format!(
                    "node {child} is both partner and child of partnership {partnership}"
                ));
            }
            if !has_parents.insert(child) {
                return Err(format!("node {child} is a child of more than one partnership"));
            }
            graph.add_edge(partnership, child, ());
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| format!("node {} is its own ancestor", cycle.node_id()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pedigree_core::{attributes::LifeStatus, properties::PartnershipProperties};

    use super::*;
    use crate::structure::entity::Partnership;

    fn person(id: u32) -> Node {
        Node::person(Id::new(id), PersonProperties::default())
    }

    fn couple(id: u32, a: u32, b: u32) -> Partnership {
        Partnership::new(
            Id::new(id),
            [Id::new(a), Id::new(b)],
            PartnershipProperties::default(),
        )
    }

    fn family() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![person(1), person(2), person(4)],
            partnerships: vec![couple(3, 1, 2)],
            children: BTreeMap::from([(Id::new(3), vec![Id::new(4)])]),
        }
    }

    #[test]
    fn test_valid_family_passes() {
        assert!(check_snapshot(&family()).is_ok());
        assert!(check_snapshot(&GraphSnapshot::default()).is_ok());
    }

    #[test]
    fn test_duplicate_identifier() {
        let mut snapshot = family();
        snapshot.nodes.push(person(3));
        assert!(check_snapshot(&snapshot).unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_largest_identifier_is_rejected() {
        let mut snapshot = family();
        snapshot.nodes.push(person(u32::MAX));
        assert!(check_snapshot(&snapshot).unwrap_err().contains("no room"));

        let mut snapshot = family();
        snapshot.nodes.push(person(u32::MAX - 1));
        assert!(check_snapshot(&snapshot).is_ok());
    }

    #[test]
    fn test_self_partnership() {
        let mut snapshot = family();
        snapshot.partnerships.push(couple(5, 4, 4));
        assert!(check_snapshot(&snapshot).unwrap_err().contains("with itself"));
    }

    #[test]
    fn test_duplicate_couple() {
        let mut snapshot = family();
        snapshot.partnerships.push(couple(5, 2, 1));
        assert!(check_snapshot(&snapshot).is_err());
    }

    #[test]
    fn test_child_with_two_origins() {
        let mut snapshot = family();
        snapshot.nodes.extend([person(6), person(7)]);
        snapshot.partnerships.push(couple(5, 6, 7));
        snapshot.children.insert(Id::new(5), vec![Id::new(4)]);
        assert!(check_snapshot(&snapshot).unwrap_err().contains("more than one"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        // 4 is a child of (1, 2), and 1 is a child of (4, 5)
        let mut snapshot = family();
        snapshot.nodes.push(person(5));
        snapshot.partnerships.push(couple(6, 4, 5));
        snapshot.children.insert(Id::new(6), vec![Id::new(1)]);
        assert!(check_snapshot(&snapshot).unwrap_err().contains("own ancestor"));
    }

    #[test]
    fn test_group_life_status_rule() {
        let mut properties = PersonProperties::default();
        properties.life_status = LifeStatus::Unborn;
        let group = Node::group(Id::new(1), 3, properties);
        assert!(check_node(&group).is_err());

        let empty_group = Node::group(Id::new(2), 0, PersonProperties::default());
        assert!(check_node(&empty_group).is_err());
    }
}
