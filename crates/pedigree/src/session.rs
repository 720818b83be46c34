//! The editor session: one graph, its layout, its history and its
//! subscribers.
//!
//! Every mutating operation follows the same sequence: the graph applies the
//! command, the change is recorded on the [`ActionStack`], the layout is
//! recomputed once, and the matching [`EditorEvent`]s are published.

use log::{debug, info};

use pedigree_core::{
    identifier::{Id, IdMapping},
    properties::{PartnershipProperties, PersonProperties, PropertyKey, PropertyValue},
};

use crate::{
    config::AppConfig,
    error::PedigreeError,
    events::{EditorEvent, EventBus, SubscriberRef},
    history::{ActionStack, UndoOutcome},
    layout::{LayoutEngine, PedigreeLayout, Placement},
    save_load::{self, Document},
    structure::{CascadePolicy, Change, PedigreeGraph, Summary, Warning},
};

#[derive(Debug)]
pub struct EditorSession {
    graph: PedigreeGraph,
    layout: LayoutEngine,
    history: ActionStack,
    events: EventBus,
}

impl EditorSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            graph: PedigreeGraph::new(),
            layout: LayoutEngine::new(config.layout().clone()),
            history: ActionStack::new(config.history()),
            events: EventBus::new(),
        }
    }

    /// Replaces the layout engine, e.g. to plug in another ordering
    /// strategy. The layout is recomputed.
    pub fn with_layout_engine(mut self, engine: LayoutEngine) -> Self {
        self.layout = engine;
        self.layout.recompute(&self.graph);
        self
    }

    pub fn graph(&self) -> &PedigreeGraph {
        &self.graph
    }

    pub fn history(&self) -> &ActionStack {
        &self.history
    }

    pub fn layout(&self) -> &PedigreeLayout {
        self.layout.layout()
    }

    pub fn placement(&self, id: Id) -> Option<&Placement> {
        self.layout.layout().placement(id)
    }

    pub fn summary(&self, id: Id) -> Result<Summary, PedigreeError> {
        self.graph.summary(id)
    }

    pub fn subscribe(&mut self, subscriber: SubscriberRef) {
        self.events.subscribe(subscriber);
    }

    // -------------------------------------------------------------------------
    // Graph operations
    // -------------------------------------------------------------------------

    pub fn add_person(
        &mut self,
        parent: Option<Id>,
        properties: PersonProperties,
    ) -> Result<Id, PedigreeError> {
        let (id, change) = self.graph.add_person(parent, properties)?;
        self.commit("Add person", change);
        Ok(id)
    }

    pub fn add_person_group(
        &mut self,
        parent: Option<Id>,
        count: u32,
        properties: PersonProperties,
    ) -> Result<Id, PedigreeError> {
        let (id, change) = self.graph.add_person_group(parent, count, properties)?;
        self.commit("Add person group", change);
        Ok(id)
    }

    /// Adds a partnership and returns it with any relationship warnings.
    pub fn add_partnership(
        &mut self,
        first: Id,
        second: Id,
        properties: PartnershipProperties,
    ) -> Result<(Id, Vec<Warning>), PedigreeError> {
        let (id, change) = self.graph.add_partnership(first, second, properties)?;
        let warnings = change.warnings.clone();
        self.commit("Add partnership", change);
        Ok((id, warnings))
    }

    pub fn remove_node(&mut self, id: Id, policy: CascadePolicy) -> Result<(), PedigreeError> {
        let change = self.graph.remove_node(id, policy)?;
        self.commit("Remove node", change);
        Ok(())
    }

    pub fn remove_partnership(&mut self, id: Id) -> Result<(), PedigreeError> {
        let change = self.graph.remove_partnership(id)?;
        self.commit("Remove partnership", change);
        Ok(())
    }

    pub fn reparent(&mut self, node: Id, parent: Option<Id>) -> Result<(), PedigreeError> {
        let change = self.graph.reparent(node, parent)?;
        self.commit("Move node", change);
        Ok(())
    }

    pub fn set_property(
        &mut self,
        target: Id,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<(), PedigreeError> {
        let change = self.graph.set_property(target, key, value)?;
        self.commit("Set property", change);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<UndoOutcome, PedigreeError> {
        let outcome = self.history.undo(&mut self.graph)?;
        if let UndoOutcome::Applied(change) = &outcome {
            self.publish(change);
        }
        Ok(outcome)
    }

    pub fn redo(&mut self) -> Result<UndoOutcome, PedigreeError> {
        let outcome = self.history.redo(&mut self.graph)?;
        if let UndoOutcome::Applied(change) = &outcome {
            self.publish(change);
        }
        Ok(outcome)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.history.has_unsaved_changes()
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    /// Compacts identifiers to a dense range.
    ///
    /// Ids still referenced by the history are kept reachable. The mapping
    /// is applied to the graph, the layout, the history and, through
    /// [`EditorEvent::IdsRemapped`], to every subscriber before returning.
    pub fn compact_ids(&mut self) -> IdMapping {
        let reserved = self.history.referenced_ids();
        let mapping = self.graph.remap_ids(&reserved);
        if mapping.is_empty() {
            return mapping;
        }
        self.layout.remap_ids(&mapping);
        self.history.remap_ids(&mapping);
        info!(remapped = mapping.len(); "Identifiers compacted");
        self.events
            .publish(&EditorEvent::IdsRemapped(mapping.clone()), &self.graph);
        mapping
    }

    // -------------------------------------------------------------------------
    // Documents
    // -------------------------------------------------------------------------

    pub fn serialize(&self) -> Document {
        save_load::serialize(&self.graph)
    }

    /// Opens `document` as a fresh, saved state with an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`PedigreeError::CorruptDocument`] and leaves the session
    /// untouched if the document is invalid.
    pub fn load_document(&mut self, document: &Document) -> Result<(), PedigreeError> {
        let snapshot = save_load::deserialize(document)?;
        let change = self.graph.replace(snapshot)?;
        self.history.clear();
        self.history.mark_saved();
        self.publish(&change);
        Ok(())
    }

    /// Replaces the graph with `document` as one undoable step.
    pub fn replace_graph(&mut self, document: &Document) -> Result<(), PedigreeError> {
        let snapshot = save_load::deserialize(document)?;
        let change = self.graph.replace(snapshot)?;
        self.commit("Replace pedigree", change);
        Ok(())
    }

    fn commit(&mut self, label: &str, change: Change) {
        if !self.history.push(label, &change) {
            debug!(label = label; "Nothing changed");
            return;
        }
        self.publish(&change);
    }

    /// Runs the single layout recompute for `change` and notifies
    /// subscribers.
    fn publish(&mut self, change: &Change) {
        let moved = if change.forward.is_replace() {
            self.layout.recompute(&self.graph)
        } else {
            self.layout.update(&self.graph, &change.delta)
        };

        for (id, key, value) in change.forward.property_updates() {
            let event = EditorEvent::PropertyChanged {
                id,
                key,
                value: value.clone(),
            };
            self.events.publish(&event, &self.graph);
        }
        if !change.delta.is_empty() {
            self.events
                .publish(&EditorEvent::StructureChanged(change.delta.clone()), &self.graph);
        }
        if !moved.is_empty() {
            self.events
                .publish(&EditorEvent::LayoutChanged { moved }, &self.graph);
        }
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}
