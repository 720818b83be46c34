//! Linear undo/redo history.
//!
//! Every entry keeps the command that was applied and its exact inverse, as
//! produced by the graph when the mutation was committed.

use std::collections::BTreeSet;

use log::debug;

use pedigree_core::identifier::{Id, IdMapping};

use crate::{
    config::HistoryConfig,
    error::PedigreeError,
    structure::{Change, Command, PedigreeGraph},
};

/// One undoable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    label: String,
    forward: Command,
    inverse: Command,
}

impl HistoryEntry {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn forward(&self) -> &Command {
        &self.forward
    }

    pub fn inverse(&self) -> &Command {
        &self.inverse
    }
}

/// Result of [`ActionStack::undo`] and [`ActionStack::redo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The stored command was applied; the change carries its delta.
    Applied(Change),
    /// Nothing to undo or redo.
    NoOp,
}

/// Undo/redo stack with a cursor and a save point.
#[derive(Debug, Clone)]
pub struct ActionStack {
    entries: Vec<HistoryEntry>,
    /// Number of entries currently applied.
    cursor: usize,
    /// Cursor value at the last save, `None` once that state is unreachable.
    saved: Option<usize>,
    max_depth: usize,
}

impl ActionStack {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            saved: Some(0),
            max_depth: config.max_depth(),
        }
    }

    /// Records a committed change, dropping the redo tail.
    ///
    /// Returns `false` for no-op changes, which are not recorded.
    pub fn push(&mut self, label: impl Into<String>, change: &Change) -> bool {
        if change.forward.is_noop() {
            return false;
        }

        if self.cursor < self.entries.len() {
            self.entries.truncate(self.cursor);
            if self.saved.is_some_and(|saved| saved > self.cursor) {
                self.saved = None;
            }
        }

        self.entries.push(HistoryEntry {
            label: label.into(),
            forward: change.forward.clone(),
            inverse: change.inverse.clone(),
        });
        self.cursor += 1;

        if self.entries.len() > self.max_depth {
            let excess = self.entries.len() - self.max_depth;
            self.entries.drain(..excess);
            self.cursor -= excess;
            self.saved = self.saved.and_then(|saved| saved.checked_sub(excess));
            debug!(dropped = excess; "History depth limit reached");
        }
        true
    }

    /// Applies the inverse of the entry before the cursor.
    ///
    /// # Errors
    ///
    /// Propagates graph errors; the cursor only moves on success.
    pub fn undo(&mut self, graph: &mut PedigreeGraph) -> Result<UndoOutcome, PedigreeError> {
        let Some(entry) = self.cursor.checked_sub(1).and_then(|i| self.entries.get(i)) else {
            return Ok(UndoOutcome::NoOp);
        };
        let change = graph.apply(entry.inverse.clone())?;
        debug!(label = entry.label.as_str(), cursor = self.cursor - 1; "Undo");
        self.cursor -= 1;
        Ok(UndoOutcome::Applied(change))
    }

    /// Re-applies the entry at the cursor.
    ///
    /// # Errors
    ///
    /// Propagates graph errors; the cursor only moves on success.
    pub fn redo(&mut self, graph: &mut PedigreeGraph) -> Result<UndoOutcome, PedigreeError> {
        let Some(entry) = self.entries.get(self.cursor) else {
            return Ok(UndoOutcome::NoOp);
        };
        let change = graph.apply(entry.forward.clone())?;
        debug!(label = entry.label.as_str(), cursor = self.cursor + 1; "Redo");
        self.cursor += 1;
        Ok(UndoOutcome::Applied(change))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Label of the entry [`undo`](Self::undo) would revert.
    pub fn undo_label(&self) -> Option<&str> {
        let index = self.cursor.checked_sub(1)?;
        self.entries.get(index).map(HistoryEntry::label)
    }

    /// Label of the entry [`redo`](Self::redo) would re-apply.
    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(HistoryEntry::label)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.saved != Some(self.cursor)
    }

    pub fn mark_saved(&mut self) {
        self.saved = Some(self.cursor);
    }

    /// Forgets every entry. The save point is lost too.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.saved = None;
    }

    /// Every id mentioned by a retained command.
    pub fn referenced_ids(&self) -> BTreeSet<Id> {
        let mut ids = BTreeSet::new();
        for entry in &self.entries {
            entry.forward.collect_ids(&mut ids);
            entry.inverse.collect_ids(&mut ids);
        }
        ids
    }

    /// Rewrites retained commands after identifier compaction.
    pub fn remap_ids(&mut self, mapping: &IdMapping) {
        for entry in &mut self.entries {
            entry.forward.remap(mapping);
            entry.inverse.remap(mapping);
        }
    }
}

impl Default for ActionStack {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use pedigree_core::{
        attributes::Gender,
        properties::{PersonProperties, PropertyKey, PropertyValue},
    };

    use super::*;
    use crate::structure::CascadePolicy;

    fn add(graph: &mut PedigreeGraph, history: &mut ActionStack) -> Id {
        let (id, change) = graph
            .add_person(None, PersonProperties::with_gender(Gender::Female))
            .unwrap();
        history.push("add person", &change);
        id
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        let id = add(&mut graph, &mut history);
        let after = graph.clone();

        assert!(matches!(history.undo(&mut graph).unwrap(), UndoOutcome::Applied(_)));
        assert!(graph.node(id).is_none());
        assert_eq!(history.undo(&mut graph).unwrap(), UndoOutcome::NoOp);

        history.redo(&mut graph).unwrap();
        assert_eq!(graph, after);
        assert_eq!(history.redo(&mut graph).unwrap(), UndoOutcome::NoOp);
    }

    #[test]
    fn test_undo_restores_removed_node_with_same_id() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        let id = add(&mut graph, &mut history);
        let before = graph.clone();

        let change = graph.remove_node(id, CascadePolicy::default()).unwrap();
        history.push("remove", &change);
        history.undo(&mut graph).unwrap();

        assert_eq!(graph, before);
        assert_eq!(
            graph.node(id).unwrap().properties().gender,
            Gender::Female
        );
    }

    #[test]
    fn test_push_after_undo_drops_redo_tail() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        add(&mut graph, &mut history);
        add(&mut graph, &mut history);
        history.undo(&mut graph).unwrap();
        assert!(history.can_redo());

        add(&mut graph, &mut history);
        assert!(!history.can_redo());
        assert_eq!(history.entries().len(), 2);
    }

    #[test]
    fn test_unsaved_changes_track_save_point() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        assert!(!history.has_unsaved_changes());

        add(&mut graph, &mut history);
        assert!(history.has_unsaved_changes());
        history.mark_saved();
        assert!(!history.has_unsaved_changes());

        history.undo(&mut graph).unwrap();
        assert!(history.has_unsaved_changes());
        history.redo(&mut graph).unwrap();
        assert!(!history.has_unsaved_changes());

        // The saved state becomes unreachable once its branch is dropped.
        history.undo(&mut graph).unwrap();
        add(&mut graph, &mut history);
        history.undo(&mut graph).unwrap();
        assert!(history.has_unsaved_changes());
    }

    #[test]
    fn test_depth_limit_drops_oldest() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::new(&HistoryConfig::new(2));
        for _ in 0..3 {
            add(&mut graph, &mut history);
        }
        assert_eq!(history.entries().len(), 2);
        history.undo(&mut graph).unwrap();
        history.undo(&mut graph).unwrap();
        assert!(!history.can_undo());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_noop_is_not_recorded() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        let id = add(&mut graph, &mut history);
        let change = graph.reparent(id, None).unwrap();
        assert!(!history.push("reparent", &change));
        assert_eq!(history.undo_label(), Some("add person"));
    }

    #[test]
    fn test_property_undo_restores_previous_value() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        let id = add(&mut graph, &mut history);
        let change = graph
            .set_property(id, PropertyKey::FirstName, PropertyValue::from("Ada"))
            .unwrap();
        history.push("rename", &change);

        history.undo(&mut graph).unwrap();
        assert_eq!(graph.node(id).unwrap().properties().first_name, None);
    }

    #[test]
    fn test_remap_rewrites_stored_ids() {
        let mut graph = PedigreeGraph::new();
        let mut history = ActionStack::default();
        let id = add(&mut graph, &mut history);
        assert!(history.referenced_ids().contains(&id));

        let mapping = IdMapping::from_iter([(id, Id::new(7))]);
        history.remap_ids(&mapping);
        assert!(history.referenced_ids().contains(&Id::new(7)));
        assert!(!history.referenced_ids().contains(&id));
    }
}
