//! The authoritative pedigree graph.
//!
//! [`PedigreeGraph`] owns the entity records, the relation index and the
//! identifier registry. All mutations go through [`PedigreeGraph::apply`],
//! which validates a [`Command`] completely before touching any state; the
//! higher-level operations (`add_person`, `remove_node`, ...) only assemble
//! command batches. A batch that fails part-way is rolled back, so every
//! operation is atomic.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, error, info, warn};

use pedigree_core::{
    attributes::{Consanguinity, Gender},
    identifier::{Id, IdMapping},
    properties::{
        PartnershipProperties, PersonProperties, PropertyError, PropertyKey, PropertyValue,
    },
};

use super::{
    childless,
    command::{Change, Command, GraphDelta, Warning},
    entity::{GraphSnapshot, Node, NodeKind, Partnership},
    graph_base::RelationIndex,
    summary::{self, Summary},
    validation,
};
use crate::{error::PedigreeError, registry::IdRegistry};

/// What happens to relations left dangling by [`PedigreeGraph::remove_node`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Partnerships of the removed node are removed; their children are
    /// detached and kept.
    #[default]
    RemoveOrphanedPartnerships,
    /// Partnerships with children survive with a new placeholder partner of
    /// unknown gender in place of the removed node.
    ReplaceWithPlaceholder,
    /// Like [`RemoveOrphanedPartnerships`](Self::RemoveOrphanedPartnerships),
    /// then every node left without any relation is removed as well.
    RemoveDisconnected,
}

/// The pedigree: persons, groups, partnerships and their relations.
#[derive(Debug, Clone, Default)]
pub struct PedigreeGraph {
    registry: IdRegistry,
    nodes: BTreeMap<Id, Node>,
    partnerships: BTreeMap<Id, Partnership>,
    relations: RelationIndex,
}

/// Structural equality; the registry's retired-id bookkeeping is ignored.
impl PartialEq for PedigreeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.partnerships == other.partnerships
            && self.relations == other.relations
    }
}

impl Eq for PedigreeGraph {}

impl PedigreeGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PedigreeError::CorruptDocument`] if the snapshot violates a
    /// structural invariant.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, PedigreeError> {
        let mut graph = Self::new();
        graph.apply(Command::Replace(Box::new(snapshot)))?;
        Ok(graph)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn partnership(&self, id: Id) -> Option<&Partnership> {
        self.partnerships.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Partnerships in ascending id order.
    pub fn partnerships(&self) -> impl Iterator<Item = &Partnership> {
        self.partnerships.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn partnership_count(&self) -> usize {
        self.partnerships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.partnerships.is_empty()
    }

    /// Returns `true` if `id` names a node or a partnership.
    pub fn contains(&self, id: Id) -> bool {
        self.nodes.contains_key(&id) || self.partnerships.contains_key(&id)
    }

    /// The partnership `node` is a child of.
    pub fn origin_of(&self, node: Id) -> Option<Id> {
        self.relations.origin(node)
    }

    /// The two parents of `node`, if it has an originating partnership.
    pub fn parents_of(&self, node: Id) -> Option<[Id; 2]> {
        self.origin_of(node)
            .and_then(|partnership| self.partnership(partnership))
            .map(Partnership::partners)
    }

    /// Children of `partnership` in child-hub order.
    pub fn children_of(&self, partnership: Id) -> &[Id] {
        self.relations.children(partnership)
    }

    /// Partnerships `node` is a partner in, in ascending id order.
    pub fn partnerships_of(&self, node: Id) -> &[Id] {
        self.relations.unions(node)
    }

    /// Every partner of `node` across its partnerships.
    pub fn partners_of(&self, node: Id) -> Vec<Id> {
        self.partnerships_of(node)
            .iter()
            .filter_map(|&id| self.partnership(id))
            .filter_map(|partnership| partnership.other_partner(node))
            .collect()
    }

    /// Other children of the partnership `node` descends from.
    pub fn siblings_of(&self, node: Id) -> Vec<Id> {
        self.origin_of(node)
            .map(|partnership| {
                self.children_of(partnership)
                    .iter()
                    .copied()
                    .filter(|&child| child != node)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All ancestors of `node`.
    pub fn ancestors_of(&self, node: Id) -> BTreeSet<Id> {
        let mut ancestors = BTreeSet::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            for parent in self.parents_of(current).into_iter().flatten() {
                if ancestors.insert(parent) {
                    pending.push(parent);
                }
            }
        }
        ancestors
    }

    /// Returns `true` if `ancestor` is a (transitive) parent of `descendant`.
    pub fn is_ancestor(&self, ancestor: Id, descendant: Id) -> bool {
        ancestor != descendant && self.ancestors_of(descendant).contains(&ancestor)
    }

    /// Returns `true` if the partnership is consanguineous.
    ///
    /// With the consanguinity mode set to auto, partners are consanguineous
    /// when one descends from the other or both share an ancestor.
    pub fn is_consanguineous(&self, partnership: Id) -> bool {
        let Some(record) = self.partnership(partnership) else {
            return false;
        };
        match record.properties().consanguinity {
            Consanguinity::Yes => true,
            Consanguinity::No => false,
            Consanguinity::Auto => {
                let [a, b] = record.partners();
                let ancestors_a = self.ancestors_of(a);
                let ancestors_b = self.ancestors_of(b);
                ancestors_a.contains(&b)
                    || ancestors_b.contains(&a)
                    || !ancestors_a.is_disjoint(&ancestors_b)
            }
        }
    }

    /// Returns `true` if `partnership` has a child that is not a placeholder.
    pub fn has_non_placeholder_children(&self, partnership: Id) -> bool {
        self.children_of(partnership)
            .iter()
            .filter_map(|&child| self.node(child))
            .any(|node| !node.is_placeholder())
    }

    /// Property summary of a node or partnership.
    pub fn summary(&self, id: Id) -> Result<Summary, PedigreeError> {
        summary::summarize(self, id)
    }

    /// Captures the structural state of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let children = self
            .partnerships
            .keys()
            .filter_map(|&id| {
                let children = self.children_of(id);
                (!children.is_empty()).then(|| (id, children.to_vec()))
            })
            .collect();
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            partnerships: self.partnerships.values().cloned().collect(),
            children,
        }
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Adds a person, optionally as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// - [`PedigreeError::InvalidParent`] if `parent` is not a partnership.
    /// - [`PedigreeError::InvalidPropertyValue`] if `properties` are invalid.
    pub fn add_person(
        &mut self,
        parent: Option<Id>,
        properties: PersonProperties,
    ) -> Result<(Id, Change), PedigreeError> {
        self.add_node(parent, NodeKind::Person, properties)
    }

    /// Adds a group of `count` anonymous siblings.
    pub fn add_person_group(
        &mut self,
        parent: Option<Id>,
        count: u32,
        properties: PersonProperties,
    ) -> Result<(Id, Change), PedigreeError> {
        self.add_node(parent, NodeKind::PersonGroup { count }, properties)
    }

    fn add_node(
        &mut self,
        parent: Option<Id>,
        kind: NodeKind,
        properties: PersonProperties,
    ) -> Result<(Id, Change), PedigreeError> {
        if let Some(parent) = parent {
            if self.partnership(parent).is_none() {
                return Err(PedigreeError::InvalidParent(parent));
            }
        }

        let id = self.registry.allocate()?;
        let mut commands = Vec::new();
        if let Some(parent) = parent {
            commands.extend(childless::clear_for_new_child(self, parent, &properties));
        }
        commands.push(Command::CreateNode(Node::new(id, kind, properties)));
        if let Some(parent) = parent {
            commands.push(Command::Link {
                child: id,
                partnership: parent,
                index: usize::MAX,
            });
        }

        let change = self.apply_allocated(&[id], Command::Batch(commands))?;
        Ok((id, change))
    }

    /// Adds a partnership between two nodes.
    ///
    /// Partnering a node with its own ancestor succeeds with a
    /// [`Warning::IncestConstraintViolation`].
    ///
    /// # Errors
    ///
    /// - [`PedigreeError::NotFound`] if either node is unknown.
    /// - [`PedigreeError::DuplicatePartner`] for a self-partnership or a
    ///   second partnership between the same two nodes.
    pub fn add_partnership(
        &mut self,
        first: Id,
        second: Id,
        properties: PartnershipProperties,
    ) -> Result<(Id, Change), PedigreeError> {
        self.check_couple(first, second)?;
        let id = self.registry.allocate()?;
        let command = Command::CreatePartnership(Partnership::new(id, [first, second], properties));
        let change = self.apply_allocated(&[id], command)?;
        Ok((id, change))
    }

    /// Removes a node, cascading according to `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`PedigreeError::NotFound`] for unknown ids.
    pub fn remove_node(&mut self, id: Id, policy: CascadePolicy) -> Result<Change, PedigreeError> {
        if self.node(id).is_none() {
            return Err(PedigreeError::NotFound(id));
        }

        let mut commands = Vec::new();
        let mut allocated = Vec::new();
        if self.origin_of(id).is_some() {
            commands.push(Command::Unlink { child: id });
        }

        let unions = self.partnerships_of(id).to_vec();
        let records: Vec<Partnership> = unions
            .iter()
            .filter_map(|&partnership| self.partnership(partnership))
            .cloned()
            .collect();
        for record in records {
            let partnership = record.id();
            let children = self.children_of(partnership).to_vec();
            commands.extend(children.iter().map(|&child| Command::Unlink { child }));
            commands.push(Command::DestroyPartnership(partnership));

            if policy == CascadePolicy::ReplaceWithPlaceholder && !children.is_empty() {
                let placeholder = match self.registry.allocate() {
                    Ok(placeholder) => placeholder,
                    Err(err) => {
                        self.release_all(&allocated);
                        return Err(err);
                    }
                };
                allocated.push(placeholder);

                let partners = record
                    .partners()
                    .map(|partner| if partner == id { placeholder } else { partner });
                commands.push(Command::CreateNode(Node::person(
                    placeholder,
                    PersonProperties {
                        gender: Gender::Unknown,
                        ..PersonProperties::placeholder()
                    },
                )));
                commands.push(Command::CreatePartnership(Partnership::new(
                    partnership,
                    partners,
                    record.properties().clone(),
                )));
                commands.extend(children.iter().enumerate().map(|(index, &child)| {
                    Command::Link {
                        child,
                        partnership,
                        index,
                    }
                }));
            }
        }
        commands.push(Command::DestroyNode(id));

        if policy == CascadePolicy::RemoveDisconnected {
            commands.extend(
                self.disconnected_after_removal(id, &unions)
                    .into_iter()
                    .map(Command::DestroyNode),
            );
        }

        let change = self.apply_allocated(&allocated, Command::Batch(commands))?;
        debug!(node_id = id.get(), policy:?; "Node removed");
        Ok(change)
    }

    /// Nodes left without any relation once `removed` and its partnerships
    /// `unions` are gone.
    fn disconnected_after_removal(&self, removed: Id, unions: &[Id]) -> BTreeSet<Id> {
        let mut candidates = BTreeSet::new();
        for &partnership in unions {
            if let Some(other) = self
                .partnership(partnership)
                .and_then(|record| record.other_partner(removed))
            {
                candidates.insert(other);
            }
            candidates.extend(self.children_of(partnership).iter().copied());
        }
        candidates.remove(&removed);

        candidates
            .into_iter()
            .filter(|&candidate| {
                let detached = self
                    .origin_of(candidate)
                    .is_none_or(|origin| unions.contains(&origin));
                let unpartnered = self
                    .partnerships_of(candidate)
                    .iter()
                    .all(|partnership| unions.contains(partnership));
                detached && unpartnered
            })
            .collect()
    }

    /// Removes a partnership; its children are detached and kept.
    pub fn remove_partnership(&mut self, id: Id) -> Result<Change, PedigreeError> {
        if self.partnership(id).is_none() {
            return Err(PedigreeError::NotFound(id));
        }
        let mut commands: Vec<Command> = self
            .children_of(id)
            .iter()
            .map(|&child| Command::Unlink { child })
            .collect();
        commands.push(Command::DestroyPartnership(id));
        self.apply(Command::Batch(commands))
    }

    /// Moves `node` under `parent`, or detaches it when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// - [`PedigreeError::NotFound`] if `node` is unknown.
    /// - [`PedigreeError::InvalidParent`] if `parent` is not a partnership.
    /// - [`PedigreeError::CycleViolation`] if `node` would become its own ancestor.
    pub fn reparent(&mut self, node: Id, parent: Option<Id>) -> Result<Change, PedigreeError> {
        let record = self.node(node).ok_or(PedigreeError::NotFound(node))?;
        let current = self.origin_of(node);
        if current == parent {
            return Ok(Change::noop(Command::noop()));
        }

        let mut commands = Vec::new();
        if current.is_some() {
            commands.push(Command::Unlink { child: node });
        }
        if let Some(parent) = parent {
            if self.partnership(parent).is_none() {
                return Err(PedigreeError::InvalidParent(parent));
            }
            if self.would_cycle(node, parent) {
                return Err(PedigreeError::CycleViolation {
                    child: node,
                    partnership: parent,
                });
            }
            commands.extend(childless::clear_for_new_child(
                self,
                parent,
                record.properties(),
            ));
            commands.push(Command::Link {
                child: node,
                partnership: parent,
                index: usize::MAX,
            });
        }
        self.apply(Command::Batch(commands))
    }

    /// Validates and stores a property of a node or partnership.
    pub fn set_property(
        &mut self,
        target: Id,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<Change, PedigreeError> {
        self.apply(Command::SetProperty { target, key, value })
    }

    /// Replaces the whole graph with `snapshot`.
    pub fn replace(&mut self, snapshot: GraphSnapshot) -> Result<Change, PedigreeError> {
        self.apply(Command::Replace(Box::new(snapshot)))
    }

    /// Compacts identifiers, keeping `reserved` ones (referenced elsewhere)
    /// alive in the mapping. Returns the old→new table.
    pub fn remap_ids(&mut self, reserved: &BTreeSet<Id>) -> IdMapping {
        let mapping = self.registry.remap(reserved);
        if mapping.is_empty() {
            return mapping;
        }
        self.nodes = std::mem::take(&mut self.nodes)
            .into_values()
            .map(|mut node| {
                node.remap(&mapping);
                (node.id(), node)
            })
            .collect();
        self.partnerships = std::mem::take(&mut self.partnerships)
            .into_values()
            .map(|mut partnership| {
                partnership.remap(&mapping);
                (partnership.id(), partnership)
            })
            .collect();
        self.relations.remap(&mapping);
        mapping
    }

    // -------------------------------------------------------------------------
    // Command application
    // -------------------------------------------------------------------------

    /// Applies a command atomically.
    ///
    /// On success the returned [`Change`] holds the exact inverse. On failure
    /// the graph is unchanged.
    pub fn apply(&mut self, command: Command) -> Result<Change, PedigreeError> {
        match command {
            Command::CreateNode(node) => self.create_node(node),
            Command::DestroyNode(id) => self.destroy_node(id),
            Command::CreatePartnership(partnership) => self.create_partnership(partnership),
            Command::DestroyPartnership(id) => self.destroy_partnership(id),
            Command::Link {
                child,
                partnership,
                index,
            } => self.link(child, partnership, index),
            Command::Unlink { child } => self.unlink(child),
            Command::SetProperty { target, key, value } => self.store_property(target, key, value),
            Command::Batch(commands) => self.apply_batch(commands),
            Command::Replace(snapshot) => self.replace_all(*snapshot),
        }
    }

    /// Applies a command that uses freshly allocated ids, retiring them again
    /// if the command fails.
    fn apply_allocated(&mut self, allocated: &[Id], command: Command) -> Result<Change, PedigreeError> {
        self.apply(command).inspect_err(|_| self.release_all(allocated))
    }

    fn release_all(&mut self, ids: &[Id]) {
        for &id in ids {
            self.registry.release(id);
        }
    }

    fn apply_batch(&mut self, commands: Vec<Command>) -> Result<Change, PedigreeError> {
        let mut applied = Vec::with_capacity(commands.len());
        for command in commands {
            match self.apply(command) {
                Ok(change) => applied.push(change),
                Err(err) => {
                    self.rollback(applied);
                    return Err(err);
                }
            }
        }
        Ok(Change::compose(applied))
    }

    fn rollback(&mut self, applied: Vec<Change>) {
        for change in applied.into_iter().rev() {
            // Inverses of successfully applied commands always apply.
            if let Err(err) = self.apply(change.inverse) {
                error!(err:%; "Failed to roll back a partially applied batch");
            }
        }
    }

    fn create_node(&mut self, node: Node) -> Result<Change, PedigreeError> {
        let id = node.id();
        if self.contains(id) {
            return Err(PedigreeError::DuplicateId(id));
        }
        validation::check_node(&node).map_err(|err| PedigreeError::invalid_property(id, err))?;
        self.registry.claim(id)?;

        let inverse = Command::DestroyNode(id);
        let forward = Command::CreateNode(node.clone());
        self.nodes.insert(id, node);

        let mut delta = GraphDelta::new();
        delta.record_added(id);
        debug!(node_id = id.get(); "Node created");
        Ok(Change::new(delta, forward, inverse))
    }

    fn destroy_node(&mut self, id: Id) -> Result<Change, PedigreeError> {
        if !self.nodes.contains_key(&id) {
            return Err(PedigreeError::NotFound(id));
        }
        if self.relations.is_connected(id) {
            return Err(PedigreeError::RelationInUse(id));
        }
        let node = self.nodes.remove(&id).ok_or(PedigreeError::NotFound(id))?;
        self.registry.release(id);

        let mut delta = GraphDelta::new();
        delta.record_removed(id);
        debug!(node_id = id.get(); "Node destroyed");
        Ok(Change::new(delta, Command::DestroyNode(id), Command::CreateNode(node)))
    }

    fn check_couple(&self, first: Id, second: Id) -> Result<(), PedigreeError> {
        for partner in [first, second] {
            if self.node(partner).is_none() {
                return Err(PedigreeError::NotFound(partner));
            }
        }
        let already_partnered = self
            .partnerships_of(first)
            .iter()
            .filter_map(|&id| self.partnership(id))
            .any(|partnership| partnership.joins(first, second));
        if first == second || already_partnered {
            return Err(PedigreeError::DuplicatePartner { first, second });
        }
        Ok(())
    }

    fn create_partnership(&mut self, partnership: Partnership) -> Result<Change, PedigreeError> {
        let id = partnership.id();
        if self.contains(id) {
            return Err(PedigreeError::DuplicateId(id));
        }
        let [first, second] = partnership.partners();
        self.check_couple(first, second)?;
        self.registry.claim(id)?;

        let mut warnings = Vec::new();
        if let Some((ancestor, descendant)) = [(first, second), (second, first)]
            .into_iter()
            .find(|&(ancestor, descendant)| self.is_ancestor(ancestor, descendant))
        {
            warn!(
                partnership_id = id.get(),
                ancestor = ancestor.get(),
                descendant = descendant.get();
                "Partnership joins a node with its own ancestor"
            );
            warnings.push(Warning::IncestConstraintViolation {
                partnership: id,
                ancestor,
                descendant,
            });
        }

        self.relations.attach_partner(first, id);
        self.relations.attach_partner(second, id);
        let forward = Command::CreatePartnership(partnership.clone());
        self.partnerships.insert(id, partnership);

        let mut delta = GraphDelta::new();
        delta.record_added(id);
        delta.record_changed(first);
        delta.record_changed(second);
        debug!(partnership_id = id.get(), first = first.get(), second = second.get(); "Partnership created");

        let mut change = Change::new(delta, forward, Command::DestroyPartnership(id));
        change.warnings = warnings;
        Ok(change)
    }

    fn destroy_partnership(&mut self, id: Id) -> Result<Change, PedigreeError> {
        if !self.partnerships.contains_key(&id) {
            return Err(PedigreeError::NotFound(id));
        }
        if !self.children_of(id).is_empty() {
            return Err(PedigreeError::RelationInUse(id));
        }
        let partnership = self
            .partnerships
            .remove(&id)
            .ok_or(PedigreeError::NotFound(id))?;
        let [first, second] = partnership.partners();
        self.relations.detach_partner(first, id);
        self.relations.detach_partner(second, id);
        self.registry.release(id);

        let mut delta = GraphDelta::new();
        delta.record_removed(id);
        delta.record_changed(first);
        delta.record_changed(second);
        debug!(partnership_id = id.get(); "Partnership destroyed");
        Ok(Change::new(
            delta,
            Command::DestroyPartnership(id),
            Command::CreatePartnership(partnership),
        ))
    }

    /// Returns `true` if making `child` a child of `partnership` would make
    /// it its own ancestor.
    fn would_cycle(&self, child: Id, partnership: Id) -> bool {
        self.partnership(partnership).is_some_and(|record| {
            record
                .partners()
                .into_iter()
                .any(|partner| partner == child || self.is_ancestor(child, partner))
        })
    }

    fn link(&mut self, child: Id, partnership: Id, index: usize) -> Result<Change, PedigreeError> {
        if self.node(child).is_none() {
            return Err(PedigreeError::NotFound(child));
        }
        if self.partnership(partnership).is_none() {
            return Err(PedigreeError::InvalidParent(partnership));
        }
        if self.origin_of(child).is_some() {
            return Err(PedigreeError::RelationInUse(child));
        }
        if self.would_cycle(child, partnership) {
            return Err(PedigreeError::CycleViolation { child, partnership });
        }

        let index = self.relations.link_child(child, partnership, index);

        let mut delta = GraphDelta::new();
        delta.record_changed(child);
        delta.record_changed(partnership);
        debug!(child = child.get(), partnership_id = partnership.get(), index; "Child linked");
        Ok(Change::new(
            delta,
            Command::Link {
                child,
                partnership,
                index,
            },
            Command::Unlink { child },
        ))
    }

    fn unlink(&mut self, child: Id) -> Result<Change, PedigreeError> {
        if self.node(child).is_none() {
            return Err(PedigreeError::NotFound(child));
        }
        let Some((partnership, index)) = self.relations.unlink_child(child) else {
            return Ok(Change::noop(Command::Unlink { child }));
        };

        let mut delta = GraphDelta::new();
        delta.record_changed(child);
        delta.record_changed(partnership);
        debug!(child = child.get(), partnership_id = partnership.get(); "Child unlinked");
        Ok(Change::new(
            delta,
            Command::Unlink { child },
            Command::Link {
                child,
                partnership,
                index,
            },
        ))
    }

    fn store_property(
        &mut self,
        target: Id,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<Change, PedigreeError> {
        let invalid = |err| PedigreeError::invalid_property(target, err);

        let (previous, stored) = if let Some(node) = self.nodes.get_mut(&target) {
            if key == PropertyKey::NumPersons {
                let NodeKind::PersonGroup { count } = node.kind() else {
                    return Err(invalid(PropertyError::NotApplicable {
                        key: key.as_str(),
                        target: "a person",
                    }));
                };
                let new_count = value.as_group_size().map_err(invalid)?;
                node.set_kind(NodeKind::PersonGroup { count: new_count });
                (
                    PropertyValue::Int(i64::from(count)),
                    PropertyValue::Int(i64::from(new_count)),
                )
            } else {
                let mut properties = node.properties().clone();
                let previous = properties.set(key, &value).map_err(invalid)?;
                validation::check_kind_properties(node.kind(), &properties).map_err(invalid)?;
                let stored = properties.get(key).map_err(invalid)?;
                *node.properties_mut() = properties;
                (previous, stored)
            }
        } else if let Some(partnership) = self.partnerships.get_mut(&target) {
            let properties = partnership.properties_mut();
            let previous = properties.set(key, &value).map_err(invalid)?;
            let stored = properties.get(key).map_err(invalid)?;
            (previous, stored)
        } else {
            return Err(PedigreeError::NotFound(target));
        };

        let mut delta = GraphDelta::new();
        delta.record_changed(target);
        debug!(target_id = target.get(), key:%; "Property set");
        Ok(Change::new(
            delta,
            Command::SetProperty {
                target,
                key,
                value: stored,
            },
            Command::SetProperty {
                target,
                key,
                value: previous,
            },
        ))
    }

    fn replace_all(&mut self, snapshot: GraphSnapshot) -> Result<Change, PedigreeError> {
        validation::check_snapshot(&snapshot).map_err(PedigreeError::CorruptDocument)?;

        let previous = self.snapshot();
        let old_ids: BTreeSet<Id> = previous.ids().collect();
        let new_ids: BTreeSet<Id> = snapshot.ids().collect();

        let mut registry = self.registry.clone();
        for &id in old_ids.difference(&new_ids) {
            registry.release(id);
        }
        for &id in &new_ids {
            registry.claim(id)?;
        }

        let mut relations = RelationIndex::new();
        for partnership in &snapshot.partnerships {
            for partner in partnership.partners() {
                relations.attach_partner(partner, partnership.id());
            }
        }
        for (&partnership, children) in &snapshot.children {
            for (index, &child) in children.iter().enumerate() {
                relations.link_child(child, partnership, index);
            }
        }

        let forward = Command::Replace(Box::new(snapshot.clone()));
        self.registry = registry;
        self.relations = relations;
        self.nodes = snapshot
            .nodes
            .into_iter()
            .map(|node| (node.id(), node))
            .collect();
        self.partnerships = snapshot
            .partnerships
            .into_iter()
            .map(|partnership| (partnership.id(), partnership))
            .collect();

        let mut delta = GraphDelta::new();
        delta.removed.extend(old_ids.difference(&new_ids));
        delta.added.extend(new_ids.difference(&old_ids));
        delta.changed.extend(old_ids.intersection(&new_ids));

        info!(
            nodes = self.nodes.len(),
            partnerships = self.partnerships.len();
            "Graph replaced"
        );
        Ok(Change::new(delta, forward, Command::Replace(Box::new(previous))))
    }
}

#[cfg(test)]
mod tests {
    use pedigree_core::attributes::{ChildlessStatus, LifeStatus};

    use super::*;

    fn female() -> PersonProperties {
        PersonProperties::with_gender(Gender::Female)
    }

    fn male() -> PersonProperties {
        PersonProperties::with_gender(Gender::Male)
    }

    /// Mother, father, their partnership and one child.
    fn family() -> (PedigreeGraph, Id, Id, Id, Id) {
        let mut graph = PedigreeGraph::new();
        let (mother, _) = graph.add_person(None, female()).unwrap();
        let (father, _) = graph.add_person(None, male()).unwrap();
        let (couple, _) = graph
            .add_partnership(mother, father, PartnershipProperties::default())
            .unwrap();
        let (child, _) = graph
            .add_person(Some(couple), PersonProperties::default())
            .unwrap();
        (graph, mother, father, couple, child)
    }

    #[test]
    fn test_add_person_links_child() {
        let (graph, mother, father, couple, child) = family();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.partnership_count(), 1);
        assert_eq!(graph.origin_of(child), Some(couple));
        assert_eq!(graph.parents_of(child), Some([mother, father]));
        assert_eq!(graph.children_of(couple), &[child]);
        assert_eq!(graph.partners_of(mother), vec![father]);
    }

    #[test]
    fn test_add_person_with_unknown_parent_fails() {
        let mut graph = PedigreeGraph::new();
        let err = graph
            .add_person(Some(Id::new(42)), PersonProperties::default())
            .unwrap_err();

        assert!(matches!(err, PedigreeError::InvalidParent(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_duplicate_partner_is_rejected() {
        let (mut graph, mother, father, _, _) = family();

        let err = graph
            .add_partnership(father, mother, PartnershipProperties::default())
            .unwrap_err();
        assert!(matches!(err, PedigreeError::DuplicatePartner { .. }));

        let err = graph
            .add_partnership(mother, mother, PartnershipProperties::default())
            .unwrap_err();
        assert!(matches!(err, PedigreeError::DuplicatePartner { .. }));
    }

    #[test]
    fn test_partnering_with_ancestor_warns() {
        let (mut graph, mother, _, _, child) = family();

        let (_, change) = graph
            .add_partnership(child, mother, PartnershipProperties::default())
            .unwrap();

        assert_eq!(change.warnings.len(), 1);
        assert!(matches!(
            change.warnings[0],
            Warning::IncestConstraintViolation { ancestor, descendant, .. }
                if ancestor == mother && descendant == child
        ));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let (mut graph, mother, _, couple, child) = family();
        let (spouse, _) = graph.add_person(None, male()).unwrap();
        let (child_couple, _) = graph
            .add_partnership(child, spouse, PartnershipProperties::default())
            .unwrap();

        // The mother cannot become a child of her own child's partnership.
        let err = graph.reparent(mother, Some(child_couple)).unwrap_err();
        assert!(matches!(err, PedigreeError::CycleViolation { .. }));

        // A partner cannot become a child of its own partnership.
        let err = graph.reparent(mother, Some(couple)).unwrap_err();
        assert!(matches!(err, PedigreeError::CycleViolation { .. }));
    }

    #[test]
    fn test_reparent_moves_child() {
        let (mut graph, _, _, couple, child) = family();
        let (a, _) = graph.add_person(None, female()).unwrap();
        let (b, _) = graph.add_person(None, male()).unwrap();
        let (other, _) = graph
            .add_partnership(a, b, PartnershipProperties::default())
            .unwrap();

        graph.reparent(child, Some(other)).unwrap();
        assert_eq!(graph.origin_of(child), Some(other));
        assert!(graph.children_of(couple).is_empty());

        graph.reparent(child, None).unwrap();
        assert_eq!(graph.origin_of(child), None);
    }

    #[test]
    fn test_inverse_restores_exact_state() {
        let (mut graph, mother, _, _, _) = family();
        let before = graph.clone();

        let change = graph
            .remove_node(mother, CascadePolicy::RemoveOrphanedPartnerships)
            .unwrap();
        assert_ne!(graph, before);

        graph.apply(change.inverse).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_remove_orphans_partnership_and_detaches_children() {
        let (mut graph, mother, _, couple, child) = family();

        let change = graph
            .remove_node(mother, CascadePolicy::RemoveOrphanedPartnerships)
            .unwrap();

        assert!(graph.partnership(couple).is_none());
        assert!(graph.node(child).is_some());
        assert_eq!(graph.origin_of(child), None);
        assert!(change.delta.removed.contains(&mother));
        assert!(change.delta.removed.contains(&couple));
    }

    #[test]
    fn test_remove_with_placeholder_keeps_partnership() {
        let (mut graph, mother, father, couple, child) = family();

        graph
            .remove_node(mother, CascadePolicy::ReplaceWithPlaceholder)
            .unwrap();

        let partnership = graph.partnership(couple).unwrap();
        let placeholder = partnership.other_partner(father).unwrap();
        assert_ne!(placeholder, mother);
        assert!(graph.node(placeholder).unwrap().is_placeholder());
        assert_eq!(graph.children_of(couple), &[child]);
    }

    #[test]
    fn test_remove_disconnected_cleans_up() {
        let (mut graph, mother, father, _, child) = family();

        graph
            .remove_node(mother, CascadePolicy::RemoveDisconnected)
            .unwrap();

        assert!(graph.node(father).is_none());
        assert!(graph.node(child).is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let (mut graph, _, _, couple, child) = family();
        let before = graph.clone();

        let err = graph
            .apply(Command::Batch(vec![
                Command::Unlink { child },
                Command::DestroyPartnership(couple),
                Command::DestroyNode(Id::new(999)),
            ]))
            .unwrap_err();

        assert!(matches!(err, PedigreeError::NotFound(_)));
        assert_eq!(graph, before);
        assert!(graph.registry().is_live(couple));
    }

    #[test]
    fn test_destroying_connected_entity_is_rejected() {
        let (mut graph, mother, _, couple, _) = family();

        assert!(matches!(
            graph.apply(Command::DestroyNode(mother)),
            Err(PedigreeError::RelationInUse(_))
        ));
        assert!(matches!(
            graph.apply(Command::DestroyPartnership(couple)),
            Err(PedigreeError::RelationInUse(_))
        ));
    }

    #[test]
    fn test_set_property_validates() {
        let (mut graph, mother, _, couple, _) = family();

        let change = graph
            .set_property(mother, PropertyKey::LifeStatus, "deceased".into())
            .unwrap();
        assert_eq!(
            graph.node(mother).unwrap().properties().life_status,
            LifeStatus::Deceased
        );
        assert_eq!(
            change.inverse,
            Command::SetProperty {
                target: mother,
                key: PropertyKey::LifeStatus,
                value: "alive".into(),
            }
        );

        let err = graph
            .set_property(mother, PropertyKey::LifeStatus, "zombie".into())
            .unwrap_err();
        assert!(matches!(err, PedigreeError::InvalidPropertyValue { .. }));

        let err = graph
            .set_property(couple, PropertyKey::Gender, "F".into())
            .unwrap_err();
        assert!(matches!(err, PedigreeError::InvalidPropertyValue { .. }));
    }

    #[test]
    fn test_group_size_and_status() {
        let mut graph = PedigreeGraph::new();
        let (group, _) = graph
            .add_person_group(None, 3, PersonProperties::default())
            .unwrap();

        graph
            .set_property(group, PropertyKey::NumPersons, PropertyValue::Int(5))
            .unwrap();
        assert_eq!(
            graph.node(group).unwrap().kind(),
            NodeKind::PersonGroup { count: 5 }
        );

        assert!(
            graph
                .set_property(group, PropertyKey::LifeStatus, "unborn".into())
                .is_err()
        );
        assert!(
            graph
                .add_person_group(None, 0, PersonProperties::default())
                .is_err()
        );
    }

    #[test]
    fn test_new_child_clears_childless_marker() {
        let (mut graph, mother, _, couple, _) = family();
        graph
            .set_property(couple, PropertyKey::ChildlessStatus, "childless".into())
            .unwrap();
        graph
            .set_property(mother, PropertyKey::ChildlessStatus, "infertile".into())
            .unwrap();

        let (_, change) = graph
            .add_person(Some(couple), PersonProperties::default())
            .unwrap();

        assert_eq!(
            graph.partnership(couple).unwrap().properties().childless_status,
            ChildlessStatus::None
        );
        assert_eq!(
            graph.node(mother).unwrap().properties().childless_status,
            ChildlessStatus::None
        );

        graph.apply(change.inverse).unwrap();
        assert_eq!(
            graph.partnership(couple).unwrap().properties().childless_status,
            ChildlessStatus::Childless
        );
    }

    #[test]
    fn test_consanguinity_detection() {
        let (mut graph, _, _, couple, child) = family();
        let (sibling, _) = graph
            .add_person(Some(couple), PersonProperties::default())
            .unwrap();
        let (siblings, _) = graph
            .add_partnership(child, sibling, PartnershipProperties::default())
            .unwrap();

        assert!(graph.is_consanguineous(siblings));
        assert!(!graph.is_consanguineous(couple));

        graph
            .set_property(siblings, PropertyKey::Consanguinity, "N".into())
            .unwrap();
        assert!(!graph.is_consanguineous(siblings));
    }

    #[test]
    fn test_summary_flags() {
        let (mut graph, mother, _, couple, child) = family();

        let summary = graph.summary(mother).unwrap();
        assert!(summary["gestationAge"].inactive);
        assert!(summary["deathDate"].inactive);
        assert!(summary["childlessStatus"].inactive);
        assert!(summary["adopted"].disabled);
        assert!(summary["twinGroup"].disabled);

        let summary = graph.summary(child).unwrap();
        assert!(!summary["adopted"].disabled);
        assert!(!summary["childlessStatus"].inactive);

        let summary = graph.summary(couple).unwrap();
        let keys: Vec<&str> = summary.keys().copied().collect();
        assert_eq!(keys, vec!["identifier", "childlessSelect", "consangr", "broken"]);
        assert!(summary["childlessSelect"].inactive);

        graph
            .set_property(child, PropertyKey::Adopted, PropertyValue::Bool(true))
            .unwrap();
        assert!(!graph.summary(couple).unwrap()["childlessSelect"].inactive);

        assert!(matches!(
            graph.summary(Id::new(99)),
            Err(PedigreeError::NotFound(_))
        ));
    }

    #[test]
    fn test_remap_ids_compacts() {
        let (mut graph, mother, _, couple, child) = family();
        graph
            .remove_node(mother, CascadePolicy::RemoveOrphanedPartnerships)
            .unwrap();

        let mapping = graph.remap_ids(&BTreeSet::new());
        assert!(!mapping.is_empty());
        let ids: Vec<u32> = graph.nodes().map(|node| node.id().get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(graph.partnership(mapping.apply(couple)).is_none());
        assert!(graph.node(mapping.apply(child)).is_some());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (graph, ..) = family();
        let rebuilt = PedigreeGraph::from_snapshot(graph.snapshot()).unwrap();
        assert_eq!(rebuilt, graph);
    }
}
