//! Structural invariants checked over random editing sessions.

use proptest::prelude::*;

use pedigree::{
    EditorSession, PedigreeError,
    attributes::Gender,
    identifier::Id,
    layout::LayoutEngine,
    properties::{PartnershipProperties, PersonProperties, PropertyKey, PropertyValue},
    save_load,
    structure::{CascadePolicy, PedigreeGraph},
};

/// An edit whose operands are picked by index among the live entities.
#[derive(Debug, Clone)]
enum Op {
    AddPerson { parent: Option<usize>, gender: u8 },
    AddGroup { parent: Option<usize>, count: u32 },
    AddPartnership { first: usize, second: usize },
    RemoveNode { node: usize, policy: u8 },
    RemovePartnership { partnership: usize },
    Reparent { node: usize, parent: Option<usize> },
    Rename { node: usize, name: String },
    Undo,
    Redo,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (proptest::option::of(any::<usize>()), 0u8..3)
            .prop_map(|(parent, gender)| Op::AddPerson { parent, gender }),
        1 => (proptest::option::of(any::<usize>()), 1u32..6)
            .prop_map(|(parent, count)| Op::AddGroup { parent, count }),
        3 => (any::<usize>(), any::<usize>())
            .prop_map(|(first, second)| Op::AddPartnership { first, second }),
        1 => (any::<usize>(), 0u8..3).prop_map(|(node, policy)| Op::RemoveNode { node, policy }),
        1 => any::<usize>().prop_map(|partnership| Op::RemovePartnership { partnership }),
        2 => (any::<usize>(), proptest::option::of(any::<usize>()))
            .prop_map(|(node, parent)| Op::Reparent { node, parent }),
        1 => (any::<usize>(), "[A-Z][a-z]{1,6}").prop_map(|(node, name)| Op::Rename { node, name }),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn pick_node(graph: &PedigreeGraph, index: usize) -> Option<Id> {
    let count = graph.node_count();
    if count == 0 {
        return None;
    }
    graph.nodes().nth(index % count).map(|node| node.id())
}

fn pick_partnership(graph: &PedigreeGraph, index: usize) -> Option<Id> {
    let count = graph.partnership_count();
    if count == 0 {
        return None;
    }
    graph
        .partnerships()
        .nth(index % count)
        .map(|partnership| partnership.id())
}

fn gender(code: u8) -> Gender {
    match code {
        0 => Gender::Male,
        1 => Gender::Female,
        _ => Gender::Unknown,
    }
}

fn policy(code: u8) -> CascadePolicy {
    match code {
        0 => CascadePolicy::RemoveOrphanedPartnerships,
        1 => CascadePolicy::ReplaceWithPlaceholder,
        _ => CascadePolicy::RemoveDisconnected,
    }
}

/// Runs `op`; operands that select nothing make it a no-op.
fn run(session: &mut EditorSession, op: &Op) -> Result<(), PedigreeError> {
    let graph = session.graph();
    let parent = |index: Option<usize>| index.and_then(|index| pick_partnership(graph, index));

    match op {
        Op::AddPerson { parent: index, gender: code } => {
            let parent = parent(*index);
            session.add_person(parent, PersonProperties::with_gender(gender(*code)))?;
        }
        Op::AddGroup { parent: index, count } => {
            let parent = parent(*index);
            session.add_person_group(parent, *count, PersonProperties::default())?;
        }
        Op::AddPartnership { first, second } => {
            let (Some(first), Some(second)) = (pick_node(graph, *first), pick_node(graph, *second))
            else {
                return Ok(());
            };
            session.add_partnership(first, second, PartnershipProperties::default())?;
        }
        Op::RemoveNode { node, policy: code } => {
            let Some(node) = pick_node(graph, *node) else {
                return Ok(());
            };
            session.remove_node(node, policy(*code))?;
        }
        Op::RemovePartnership { partnership } => {
            let Some(partnership) = pick_partnership(graph, *partnership) else {
                return Ok(());
            };
            session.remove_partnership(partnership)?;
        }
        Op::Reparent { node, parent: index } => {
            let Some(node) = pick_node(graph, *node) else {
                return Ok(());
            };
            let parent = parent(*index);
            session.reparent(node, parent)?;
        }
        Op::Rename { node, name } => {
            let Some(node) = pick_node(graph, *node) else {
                return Ok(());
            };
            session.set_property(node, PropertyKey::FirstName, PropertyValue::Text(name.clone()))?;
        }
        Op::Undo => {
            session.undo()?;
        }
        Op::Redo => {
            session.redo()?;
        }
    }
    Ok(())
}

fn check_structure(graph: &PedigreeGraph) {
    for node in graph.nodes() {
        assert!(
            !graph.ancestors_of(node.id()).contains(&node.id()),
            "node {} is its own ancestor",
            node.id()
        );
    }
    for partnership in graph.partnerships() {
        let [first, second] = partnership.partners();
        assert_ne!(first, second);
        assert!(graph.node(first).is_some() && graph.node(second).is_some());
        for &child in graph.children_of(partnership.id()) {
            assert_eq!(graph.origin_of(child), Some(partnership.id()));
        }
    }
}

fn check_layout(session: &EditorSession) {
    let graph = session.graph();
    let layout = session.layout();
    assert_eq!(
        layout.len(),
        graph.node_count() + graph.partnership_count()
    );
    for partnership in graph.partnerships() {
        let rank = layout.placement(partnership.id()).unwrap().rank();
        for partner in partnership.partners() {
            assert!(layout.placement(partner).unwrap().rank() <= rank);
        }
        for &child in graph.children_of(partnership.id()) {
            assert!(
                layout.placement(child).unwrap().rank() > rank,
                "child {child} is not below partnership {}",
                partnership.id()
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_edits_preserve_invariants(ops in proptest::collection::vec(op(), 1..28)) {
        let mut session = EditorSession::default();
        for op in &ops {
            let before = session.graph().clone();
            if run(&mut session, op).is_err() {
                prop_assert_eq!(session.graph(), &before);
            }
            check_structure(session.graph());
            check_layout(&session);
        }
    }

    #[test]
    fn prop_undo_restores_exact_state(ops in proptest::collection::vec(op(), 1..20)) {
        let mut session = EditorSession::default();
        for op in &ops {
            if matches!(op, Op::Undo | Op::Redo) {
                continue;
            }
            let before = session.graph().clone();
            let depth = session.history().entries().len();
            if run(&mut session, op).is_err() {
                continue;
            }
            if session.history().entries().len() == depth {
                prop_assert_eq!(session.graph(), &before);
                continue;
            }
            let after = session.graph().clone();

            session.undo().unwrap();
            prop_assert_eq!(session.graph(), &before);
            session.redo().unwrap();
            prop_assert_eq!(session.graph(), &after);
        }
    }

    #[test]
    fn prop_full_layout_is_idempotent(ops in proptest::collection::vec(op(), 1..24)) {
        let mut session = EditorSession::default();
        for op in &ops {
            let _ = run(&mut session, op);
        }
        let engine = LayoutEngine::default();
        let first = engine.compute(session.graph(), None);
        let second = engine.compute(session.graph(), None);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_documents_round_trip(ops in proptest::collection::vec(op(), 1..24)) {
        let mut session = EditorSession::default();
        for op in &ops {
            let _ = run(&mut session, op);
        }
        let json = session.serialize().to_json().unwrap();
        let document = save_load::Document::from_json(&json).unwrap();
        let snapshot = save_load::deserialize(&document).unwrap();
        let restored = PedigreeGraph::from_snapshot(snapshot).unwrap();
        prop_assert_eq!(&restored, session.graph());
    }
}
