//! Legends of clinical terms.
//!
//! A [`Legend`] follows one term-list property (disorders, candidate genes or
//! phenotypes) and records which nodes carry each term, together with the
//! color the term is drawn in. A term keeps its color for the lifetime of
//! the legend, even after its last case is gone.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use log::trace;

use pedigree_core::{
    color::Color,
    identifier::{Id, IdMapping, TermId},
    properties::PropertyKey,
};

use crate::{
    events::{EditorEvent, Subscriber},
    structure::PedigreeGraph,
};

/// One term of a legend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    color: Color,
    cases: BTreeSet<Id>,
}

impl LegendEntry {
    pub fn color(&self) -> Color {
        self.color
    }

    /// Nodes carrying the term.
    pub fn cases(&self) -> &BTreeSet<Id> {
        &self.cases
    }
}

#[derive(Debug, Clone)]
pub struct Legend {
    key: PropertyKey,
    entries: IndexMap<TermId, LegendEntry>,
    colors: HashMap<TermId, Color>,
}

impl Legend {
    /// Creates a legend for a term-list property; `None` for other keys.
    pub fn for_key(key: PropertyKey) -> Option<Self> {
        key.is_term_list().then(|| Self {
            key,
            entries: IndexMap::new(),
            colors: HashMap::new(),
        })
    }

    pub fn disorders() -> Self {
        Self::term_list(PropertyKey::Disorders)
    }

    pub fn genes() -> Self {
        Self::term_list(PropertyKey::Genes)
    }

    pub fn phenotypes() -> Self {
        Self::term_list(PropertyKey::Phenotypes)
    }

    fn term_list(key: PropertyKey) -> Self {
        Self {
            key,
            entries: IndexMap::new(),
            colors: HashMap::new(),
        }
    }

    pub fn key(&self) -> PropertyKey {
        self.key
    }

    /// Terms in order of first appearance.
    pub fn entries(&self) -> impl Iterator<Item = (&TermId, &LegendEntry)> {
        self.entries.iter()
    }

    pub fn entry(&self, term: &TermId) -> Option<&LegendEntry> {
        self.entries.get(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that `node` carries `term`.
    pub fn add_case(&mut self, term: TermId, node: Id) {
        let next = self.colors.len();
        let color = *self
            .colors
            .entry(term)
            .or_insert_with(|| Color::from_palette(next));
        self.entries
            .entry(term)
            .or_insert_with(|| LegendEntry {
                color,
                cases: BTreeSet::new(),
            })
            .cases
            .insert(node);
    }

    /// Removes `node` from `term`; terms without cases leave the legend.
    pub fn remove_case(&mut self, term: &TermId, node: Id) {
        let Some(entry) = self.entries.get_mut(term) else {
            return;
        };
        entry.cases.remove(&node);
        if entry.cases.is_empty() {
            self.entries.shift_remove(term);
        }
    }

    /// Makes `node` a case of exactly `terms`.
    pub fn sync_node(&mut self, node: Id, terms: &[TermId]) {
        let stale: Vec<TermId> = self
            .entries
            .iter()
            .filter(|(term, entry)| entry.cases.contains(&node) && !terms.contains(term))
            .map(|(term, _)| *term)
            .collect();
        for term in stale {
            self.remove_case(&term, node);
        }
        for &term in terms {
            self.add_case(term, node);
        }
    }

    pub fn remove_node(&mut self, node: Id) {
        self.sync_node(node, &[]);
    }

    /// Rewrites case ids after identifier compaction.
    pub fn replace_ids(&mut self, mapping: &IdMapping) {
        for entry in self.entries.values_mut() {
            entry.cases = entry.cases.iter().map(|&id| mapping.apply(id)).collect();
        }
    }

    /// Rebuilds every entry from `graph`, keeping assigned colors.
    pub fn rebuild(&mut self, graph: &PedigreeGraph) {
        self.entries.clear();
        for node in graph.nodes() {
            for &term in node.properties().terms(self.key) {
                self.add_case(term, node.id());
            }
        }
    }
}

impl Subscriber for Legend {
    fn notify(&mut self, event: &EditorEvent, graph: &PedigreeGraph) {
        match event {
            EditorEvent::PropertyChanged { id, key, value } if *key == self.key => {
                self.sync_node(*id, value.terms());
            }
            EditorEvent::StructureChanged(delta) => {
                for &id in &delta.removed {
                    self.remove_node(id);
                }
                for &id in delta.added.iter().chain(&delta.changed) {
                    if let Some(node) = graph.node(id) {
                        self.sync_node(id, node.properties().terms(self.key));
                    }
                }
            }
            EditorEvent::IdsRemapped(mapping) => self.replace_ids(mapping),
            EditorEvent::PropertyChanged { .. } | EditorEvent::LayoutChanged { .. } => {}
        }
        trace!(key = self.key.as_str(), terms = self.entries.len(); "Legend updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(name: &str) -> TermId {
        TermId::new(name)
    }

    #[test]
    fn test_for_key_accepts_term_lists_only() {
        assert!(Legend::for_key(PropertyKey::Genes).is_some());
        assert!(Legend::for_key(PropertyKey::FirstName).is_none());
    }

    #[test]
    fn test_cases_and_colors() {
        let mut legend = Legend::disorders();
        legend.add_case(term("Marfan syndrome"), Id::new(1));
        legend.add_case(term("Marfan syndrome"), Id::new(2));
        legend.add_case(term("Huntington disease"), Id::new(2));

        assert_eq!(legend.len(), 2);
        let marfan = legend.entry(&term("Marfan syndrome")).unwrap();
        assert_eq!(marfan.cases().len(), 2);
        assert_eq!(marfan.color(), Color::from_palette(0));
        assert_eq!(
            legend.entry(&term("Huntington disease")).unwrap().color(),
            Color::from_palette(1)
        );
    }

    #[test]
    fn test_color_is_retained_after_last_case() {
        let mut legend = Legend::genes();
        legend.add_case(term("BRCA1"), Id::new(1));
        legend.add_case(term("TP53"), Id::new(1));
        legend.remove_case(&term("BRCA1"), Id::new(1));
        assert!(legend.entry(&term("BRCA1")).is_none());

        legend.add_case(term("BRCA1"), Id::new(5));
        assert_eq!(
            legend.entry(&term("BRCA1")).unwrap().color(),
            Color::from_palette(0)
        );
    }

    #[test]
    fn test_sync_node_replaces_terms() {
        let mut legend = Legend::phenotypes();
        legend.sync_node(Id::new(1), &[term("HP:0001250"), term("HP:0000252")]);
        legend.sync_node(Id::new(1), &[term("HP:0000252")]);

        assert!(legend.entry(&term("HP:0001250")).is_none());
        assert!(legend.entry(&term("HP:0000252")).unwrap().cases().contains(&Id::new(1)));
    }

    #[test]
    fn test_ids_remapped_event() {
        let mut legend = Legend::disorders();
        legend.add_case(term("Fabry disease"), Id::new(9));

        let mapping = IdMapping::from_iter([(Id::new(9), Id::new(2))]);
        legend.notify(&EditorEvent::IdsRemapped(mapping), &PedigreeGraph::new());
        let cases = legend.entry(&term("Fabry disease")).unwrap().cases();
        assert_eq!(cases, &BTreeSet::from([Id::new(2)]));
    }
}
