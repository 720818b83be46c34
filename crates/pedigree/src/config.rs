//! Configuration types for the pedigree editor core.
//!
//! This module provides configuration structures that control how pedigrees
//! are laid out and how much undo history is retained. All types implement
//! [`serde::Deserialize`] for flexible loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining layout and history settings.
//! - [`LayoutConfig`] - Relative widths, gaps and pass budgets of the layout engine.
//! - [`HistoryConfig`] - Depth of the undo history.
//!
//! # Example
//!
//! ```
//! # use pedigree::config::AppConfig;
//! // Use default configuration
//! let config = AppConfig::default();
//! assert_eq!(config.history().max_depth(), 100);
//! assert_eq!(config.layout().person_width(), 1.0);
//! ```

use serde::Deserialize;

/// Top-level configuration combining layout and history settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Undo history configuration section.
    #[serde(default)]
    history: HistoryConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified sections.
    ///
    /// # Arguments
    ///
    /// * `layout` - Layout engine settings.
    /// * `history` - Undo history settings.
    pub fn new(layout: LayoutConfig, history: HistoryConfig) -> Self {
        Self { layout, history }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the history configuration.
    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }
}

/// Crossing-minimisation heuristic used when ordering items within a rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingHeuristic {
    /// Sort by the mean order of neighbours in the adjacent rank.
    #[default]
    Barycenter,
    /// Sort by the median order of neighbours in the adjacent rank.
    Median,
}

/// Layout engine settings.
///
/// Widths and gaps are expressed in relative units where a person is one
/// unit wide by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    person_width: f32,
    group_width: f32,
    partnership_width: f32,
    virtual_width: f32,
    horizontal_gap: f32,
    rank_spacing: f32,
    ordering_passes: usize,
    positioning_passes: usize,
    ordering: OrderingHeuristic,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            person_width: 1.0,
            group_width: 1.0,
            partnership_width: 0.3,
            virtual_width: 0.2,
            horizontal_gap: 0.5,
            rank_spacing: 2.0,
            ordering_passes: 24,
            positioning_passes: 8,
            ordering: OrderingHeuristic::default(),
        }
    }
}

impl LayoutConfig {
    /// Width of a single person.
    pub fn person_width(&self) -> f32 {
        self.person_width
    }

    /// Width of a person group.
    pub fn group_width(&self) -> f32 {
        self.group_width
    }

    /// Width of a partnership junction.
    pub fn partnership_width(&self) -> f32 {
        self.partnership_width
    }

    /// Width reserved for an edge passing through a rank.
    pub fn virtual_width(&self) -> f32 {
        self.virtual_width
    }

    /// Minimum gap between adjacent items of a rank.
    pub fn horizontal_gap(&self) -> f32 {
        self.horizontal_gap
    }

    /// Vertical distance between consecutive ranks.
    pub fn rank_spacing(&self) -> f32 {
        self.rank_spacing
    }

    /// Maximum number of crossing-minimisation sweeps.
    pub fn ordering_passes(&self) -> usize {
        self.ordering_passes
    }

    /// Number of coordinate relaxation passes.
    pub fn positioning_passes(&self) -> usize {
        self.positioning_passes
    }

    /// Heuristic used by the ordering sweeps.
    pub fn ordering(&self) -> OrderingHeuristic {
        self.ordering
    }

    /// Returns a copy using the given ordering heuristic.
    pub fn with_ordering(mut self, ordering: OrderingHeuristic) -> Self {
        self.ordering = ordering;
        self
    }

    /// Returns a copy using the given minimum gap.
    pub fn with_horizontal_gap(mut self, gap: f32) -> Self {
        self.horizontal_gap = gap;
        self
    }
}

/// Undo history settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl HistoryConfig {
    /// Creates a history configuration retaining at most `max_depth` entries.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Maximum number of undo entries retained.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "layout": { "horizontal_gap": 2.0, "ordering": "median" } }"#,
        )
        .unwrap();

        assert_eq!(config.layout().horizontal_gap(), 2.0);
        assert_eq!(config.layout().ordering(), OrderingHeuristic::Median);
        assert_eq!(config.layout().rank_spacing(), 2.0);
        assert_eq!(config.history().max_depth(), 100);
    }

    #[test]
    fn test_unknown_heuristic_is_rejected() {
        let result: Result<AppConfig, _> =
            serde_json::from_str(r#"{ "layout": { "ordering": "random" } }"#);
        assert!(result.is_err());
    }
}
