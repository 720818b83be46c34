//! Childless-status handling shared by persons and partnerships.
//!
//! Both kinds of entity carry a [`ChildlessStatus`]. The marker only makes
//! sense while the entity has no biological children, that is children that
//! are neither placeholders nor adopted.

use pedigree_core::{
    attributes::ChildlessStatus,
    identifier::Id,
    properties::{PersonProperties, PropertyKey, PropertyValue},
};

use super::{command::Command, pedigree_graph::PedigreeGraph};

/// Returns `true` if a child with these properties counts against a
/// childless marker.
pub(super) fn is_biological(child: &PersonProperties) -> bool {
    !child.placeholder && !child.adopted
}

/// Returns `true` if any of `children` is a biological child.
pub(super) fn has_biological_children(graph: &PedigreeGraph, children: &[Id]) -> bool {
    children
        .iter()
        .filter_map(|&child| graph.node(child))
        .any(|node| is_biological(node.properties()))
}

/// Returns `true` if the person has a biological child in any partnership.
pub(super) fn person_has_biological_children(graph: &PedigreeGraph, person: Id) -> bool {
    graph
        .partnerships_of(person)
        .iter()
        .any(|&partnership| has_biological_children(graph, graph.children_of(partnership)))
}

/// Commands clearing childless markers made stale by adding `child` under
/// `partnership`: the partnership's own marker and those of both partners.
pub(super) fn clear_for_new_child(
    graph: &PedigreeGraph,
    partnership: Id,
    child: &PersonProperties,
) -> Vec<Command> {
    if !is_biological(child) {
        return Vec::new();
    }
    let Some(record) = graph.partnership(partnership) else {
        return Vec::new();
    };

    let mut commands = Vec::new();
    if record.properties().childless_status.is_set() {
        commands.push(reset(partnership));
    }
    for partner in record.partners() {
        let marked = graph
            .node(partner)
            .is_some_and(|node| node.properties().childless_status.is_set());
        if marked {
            commands.push(reset(partner));
        }
    }
    commands
}

fn reset(target: Id) -> Command {
    Command::SetProperty {
        target,
        key: PropertyKey::ChildlessStatus,
        value: PropertyValue::from(ChildlessStatus::None.as_str()),
    }
}
