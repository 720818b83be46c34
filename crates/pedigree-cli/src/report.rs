//! The layout report written by the CLI.

use serde::Serialize;

use pedigree::{
    identifier::Id,
    layout::{PedigreeLayout, PlacementKind},
};

/// Placement of one entity, flattened for consumers of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementRecord {
    pub id: Id,
    pub kind: PlacementKind,
    pub rank: usize,
    pub order: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutReport {
    pub placements: Vec<PlacementRecord>,
}

impl LayoutReport {
    /// Lists every placement of `layout`, sorted by rank then order.
    pub fn from_layout(layout: &PedigreeLayout) -> Self {
        let mut placements: Vec<PlacementRecord> = layout
            .iter()
            .map(|(id, placement)| PlacementRecord {
                id,
                kind: placement.kind(),
                rank: placement.rank(),
                order: placement.order(),
                x: placement.position().x(),
                y: placement.position().y(),
            })
            .collect();
        placements.sort_by_key(|record| (record.rank, record.order));
        Self { placements }
    }
}
