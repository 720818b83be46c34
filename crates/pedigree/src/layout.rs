//! Layout engine for pedigree diagrams.
//!
//! Turns the structure of a [`PedigreeGraph`] into a rank, an order within
//! the rank and a position for every node and partnership.
//!
//! # Pipeline
//!
//! ```text
//! PedigreeGraph
//!     ↓ rank          generations (partners share a rank when possible)
//! Ranks
//!     ↓ layer         items per rank, bend points, couple chains
//! Layering
//!     ↓ ordering      crossing minimisation (pluggable strategy)
//! Order
//!     ↓ positioning   x coordinates with minimum gaps
//! PedigreeLayout
//! ```
//!
//! A full [`LayoutEngine::compute`] depends on the graph alone, so running it
//! twice on the same graph gives identical placements.

mod layer;
mod ordering;
mod positioning;
mod rank;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use serde::Serialize;

use pedigree_core::{
    geometry::Point,
    identifier::{Id, IdMapping},
};

pub use ordering::{Barycenter, Median, OrderingStrategy};

use crate::{
    config::LayoutConfig,
    structure::{GraphDelta, NodeKind, PedigreeGraph},
};
use layer::Item;

/// What a placement stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementKind {
    Person,
    PersonGroup,
    Partnership,
}

impl PlacementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::PersonGroup => "personGroup",
            Self::Partnership => "partnership",
        }
    }
}

/// Rank, order and center position of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    rank: usize,
    order: usize,
    position: Point,
    kind: PlacementKind,
}

impl Placement {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Position among the entities of the same rank, counted from the left.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn kind(&self) -> PlacementKind {
        self.kind
    }
}

/// Placements of every node and partnership of a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PedigreeLayout {
    placements: BTreeMap<Id, Placement>,
    rank_count: usize,
}

impl PedigreeLayout {
    pub fn placement(&self, id: Id) -> Option<&Placement> {
        self.placements.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, &Placement)> {
        self.placements.iter().map(|(&id, placement)| (id, placement))
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn rank_count(&self) -> usize {
        self.rank_count
    }

    /// Entity ids per rank, left to right.
    pub fn ranks(&self) -> Vec<Vec<Id>> {
        let mut ranks = vec![Vec::new(); self.rank_count];
        for (&id, placement) in &self.placements {
            if let Some(rank) = ranks.get_mut(placement.rank) {
                rank.push((placement.order, id));
            }
        }
        ranks
            .into_iter()
            .map(|mut rank| {
                rank.sort_unstable();
                rank.into_iter().map(|(_, id)| id).collect()
            })
            .collect()
    }

    /// Ids that are new in `self` or whose placement differs from `previous`.
    pub fn moved_since(&self, previous: &PedigreeLayout) -> BTreeSet<Id> {
        self.placements
            .iter()
            .filter(|(id, placement)| previous.placements.get(id) != Some(placement))
            .map(|(&id, _)| id)
            .collect()
    }

    pub(crate) fn remap(&mut self, mapping: &IdMapping) {
        self.placements = std::mem::take(&mut self.placements)
            .into_iter()
            .map(|(id, placement)| (mapping.apply(id), placement))
            .collect();
    }
}

/// Computes and caches the layout of a graph.
#[derive(Debug)]
pub struct LayoutEngine {
    config: LayoutConfig,
    strategy: Box<dyn OrderingStrategy>,
    current: PedigreeLayout,
}

impl LayoutEngine {
    /// Creates an engine using the ordering heuristic named in `config`.
    pub fn new(config: LayoutConfig) -> Self {
        let strategy = ordering::strategy_for(config.ordering());
        Self {
            config,
            strategy,
            current: PedigreeLayout::default(),
        }
    }

    /// Replaces the crossing-minimisation strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn OrderingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The cached layout from the last recompute.
    pub fn layout(&self) -> &PedigreeLayout {
        &self.current
    }

    /// Computes the layout of `graph` without touching the cache.
    ///
    /// With a `hint`, entities that kept their rank start from their order in
    /// the hint, which keeps the diagram stable across small edits.
    pub fn compute(&self, graph: &PedigreeGraph, hint: Option<&PedigreeLayout>) -> PedigreeLayout {
        let ranks = rank::assign(graph);
        let layering = layer::build(graph, &ranks);
        let order = ordering::minimize_crossings(
            &layering,
            ordering::initial_order(&layering, hint),
            self.strategy.as_ref(),
            self.config.ordering_passes(),
        );

        let xs = positioning::assign_x(
            &layering,
            &order,
            |item| self.width(graph, item),
            self.config.horizontal_gap(),
            self.config.positioning_passes(),
        );

        let mut placements = BTreeMap::new();
        for (rank, blocks) in order.iter().enumerate() {
            let entities = blocks
                .iter()
                .flatten()
                .filter_map(|&item| Some((item, self.kind(graph, item)?)));
            for (index, (item, kind)) in entities.enumerate() {
                let Some(id) = item.entity() else {
                    continue;
                };
                let x = xs.get(&item).copied().unwrap_or_default();
                let y = rank as f32 * self.config.rank_spacing();
                placements.insert(
                    id,
                    Placement {
                        rank,
                        order: index,
                        position: Point::new(x, y),
                        kind,
                    },
                );
            }
        }

        debug!(
            entities = placements.len(),
            ranks = ranks.count(),
            strategy = self.strategy.name();
            "Layout computed"
        );
        PedigreeLayout {
            placements,
            rank_count: ranks.count(),
        }
    }

    /// Recomputes from scratch and returns the ids that moved.
    pub fn recompute(&mut self, graph: &PedigreeGraph) -> BTreeSet<Id> {
        let next = self.compute(graph, None);
        self.replace_current(next)
    }

    /// Recomputes after `delta`, starting from the cached order.
    ///
    /// An empty delta leaves the cache untouched.
    pub fn update(&mut self, graph: &PedigreeGraph, delta: &GraphDelta) -> BTreeSet<Id> {
        if delta.is_empty() {
            trace!("Layout unchanged, empty delta");
            return BTreeSet::new();
        }
        let next = self.compute(graph, Some(&self.current));
        self.replace_current(next)
    }

    /// Rewrites cached ids after identifier compaction.
    pub fn remap_ids(&mut self, mapping: &IdMapping) {
        self.current.remap(mapping);
    }

    fn replace_current(&mut self, next: PedigreeLayout) -> BTreeSet<Id> {
        let moved = next.moved_since(&self.current);
        self.current = next;
        moved
    }

    fn kind(&self, graph: &PedigreeGraph, item: Item) -> Option<PlacementKind> {
        match item {
            Item::Node(id) => graph.node(id).map(|node| match node.kind() {
                NodeKind::Person => PlacementKind::Person,
                NodeKind::PersonGroup { .. } => PlacementKind::PersonGroup,
            }),
            Item::Partnership(_) => Some(PlacementKind::Partnership),
            Item::Virtual { .. } => None,
        }
    }

    fn width(&self, graph: &PedigreeGraph, item: Item) -> f32 {
        match self.kind(graph, item) {
            Some(PlacementKind::Person) => self.config.person_width(),
            Some(PlacementKind::PersonGroup) => self.config.group_width(),
            Some(PlacementKind::Partnership) => self.config.partnership_width(),
            None => self.config.virtual_width(),
        }
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}
