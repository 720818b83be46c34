//! Generation rank assignment.
//!
//! Partners are merged into same-generation classes with a union-find, unless
//! one partner's class already lies above the other's (an age gap implied by
//! the structure, e.g. a step-relationship across generations). Class ranks
//! are the longest path over the class DAG, parentless classes are pulled
//! down next to their highest child class, and a partnership sits at the
//! lower (larger) rank of its two partners.

use std::collections::HashMap;

use log::{error, trace};
use petgraph::{
    Direction,
    algo::toposort,
    graph::{DiGraph, NodeIndex},
};

use pedigree_core::identifier::Id;

use crate::structure::PedigreeGraph;

/// Rank of every node and partnership, normalised to start at 0.
#[derive(Debug, Clone, Default)]
pub(super) struct Ranks {
    ranks: HashMap<Id, usize>,
    count: usize,
}

impl Ranks {
    pub(super) fn get(&self, id: Id) -> Option<usize> {
        self.ranks.get(&id).copied()
    }

    /// Number of ranks in use.
    pub(super) fn count(&self) -> usize {
        self.count
    }
}

/// Disjoint-set forest over node indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    /// Merges two classes; the smaller root index wins so results do not
    /// depend on merge order.
    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        let (root, child) = if a < b { (a, b) } else { (b, a) };
        self.parent[child] = root;
    }
}

/// Returns `true` if class `from` reaches class `to` over parent→child edges.
fn class_reaches(classes: &mut UnionFind, edges: &[(usize, usize)], from: usize, to: usize) -> bool {
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(parent, child) in edges {
        let (parent, child) = (classes.find(parent), classes.find(child));
        adjacency.entry(parent).or_default().push(child);
    }

    let mut visited = vec![false; classes.parent.len()];
    let mut pending = vec![from];
    while let Some(class) = pending.pop() {
        if class == to {
            return true;
        }
        if std::mem::replace(&mut visited[class], true) {
            continue;
        }
        if let Some(next) = adjacency.get(&class) {
            pending.extend(next.iter().copied());
        }
    }
    false
}

/// Assigns ranks to every node and partnership of `graph`.
pub(super) fn assign(graph: &PedigreeGraph) -> Ranks {
    let ids: Vec<Id> = graph.nodes().map(|node| node.id()).collect();
    if ids.is_empty() {
        return Ranks::default();
    }
    let index_of: HashMap<Id, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    // Parent → child edges between node indices.
    let mut edges = Vec::new();
    for node in graph.nodes() {
        for parent in graph.parents_of(node.id()).into_iter().flatten() {
            if let (Some(&p), Some(&c)) = (index_of.get(&parent), index_of.get(&node.id())) {
                edges.push((p, c));
            }
        }
    }

    let mut classes = UnionFind::new(ids.len());
    for partnership in graph.partnerships() {
        let [a, b] = partnership.partners();
        let (Some(&a), Some(&b)) = (index_of.get(&a), index_of.get(&b)) else {
            continue;
        };
        let (ca, cb) = (classes.find(a), classes.find(b));
        if ca == cb {
            continue;
        }
        if class_reaches(&mut classes, &edges, ca, cb) || class_reaches(&mut classes, &edges, cb, ca) {
            trace!(partnership_id = partnership.id().get(); "Partners kept on separate ranks");
            continue;
        }
        classes.union(ca, cb);
    }

    // Class DAG.
    let mut dag = DiGraph::<usize, ()>::new();
    let mut class_node: HashMap<usize, NodeIndex> = HashMap::new();
    for index in 0..ids.len() {
        let class = classes.find(index);
        class_node
            .entry(class)
            .or_insert_with(|| dag.add_node(class));
    }
    for &(parent, child) in &edges {
        let from = class_node[&classes.find(parent)];
        let to = class_node[&classes.find(child)];
        dag.update_edge(from, to, ());
    }

    let order = toposort(&dag, None).unwrap_or_else(|cycle| {
        // Merges never join a class with one it reaches, so the DAG is acyclic.
        error!(class = dag[cycle.node_id()]; "Rank classes form a cycle");
        dag.node_indices().collect()
    });

    let mut class_rank = vec![0usize; dag.node_count()];
    for &class in &order {
        let rank = dag
            .neighbors_directed(class, Direction::Incoming)
            .map(|parent| class_rank[parent.index()] + 1)
            .max()
            .unwrap_or(0);
        class_rank[class.index()] = rank;
    }

    // Parentless classes sit directly above their highest child class.
    for &class in &order {
        let is_source = dag
            .neighbors_directed(class, Direction::Incoming)
            .next()
            .is_none();
        if !is_source {
            continue;
        }
        if let Some(highest_child) = dag
            .neighbors_directed(class, Direction::Outgoing)
            .map(|child| class_rank[child.index()])
            .min()
        {
            class_rank[class.index()] = highest_child.saturating_sub(1);
        }
    }

    let mut ranks = HashMap::with_capacity(ids.len() + graph.partnership_count());
    for (index, &id) in ids.iter().enumerate() {
        let class = class_node[&classes.find(index)];
        ranks.insert(id, class_rank[class.index()]);
    }
    for partnership in graph.partnerships() {
        let rank = partnership
            .partners()
            .iter()
            .filter_map(|partner| ranks.get(partner).copied())
            .max()
            .unwrap_or(0);
        ranks.insert(partnership.id(), rank);
    }

    let min = ranks.values().copied().min().unwrap_or(0);
    let mut max = 0;
    for rank in ranks.values_mut() {
        *rank -= min;
        max = max.max(*rank);
    }

    Ranks {
        ranks,
        count: max + 1,
    }
}

#[cfg(test)]
mod tests {
    use pedigree_core::properties::{PartnershipProperties, PersonProperties};

    use super::*;

    fn person(graph: &mut PedigreeGraph, parent: Option<Id>) -> Id {
        graph
            .add_person(parent, PersonProperties::default())
            .unwrap()
            .0
    }

    fn couple(graph: &mut PedigreeGraph, a: Id, b: Id) -> Id {
        graph
            .add_partnership(a, b, PartnershipProperties::default())
            .unwrap()
            .0
    }

    #[test]
    fn test_empty_graph() {
        let ranks = assign(&PedigreeGraph::new());
        assert_eq!(ranks.count(), 0);
    }

    #[test]
    fn test_partners_share_rank_and_children_are_below() {
        let mut graph = PedigreeGraph::new();
        let mother = person(&mut graph, None);
        let father = person(&mut graph, None);
        let union = couple(&mut graph, mother, father);
        let child = person(&mut graph, Some(union));

        let ranks = assign(&graph);
        assert_eq!(ranks.get(mother), Some(0));
        assert_eq!(ranks.get(father), Some(0));
        assert_eq!(ranks.get(union), Some(0));
        assert_eq!(ranks.get(child), Some(1));
        assert_eq!(ranks.count(), 2);
    }

    #[test]
    fn test_married_in_spouse_joins_generation() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let parents = couple(&mut graph, a, b);
        let child = person(&mut graph, Some(parents));
        let spouse = person(&mut graph, None);
        let union = couple(&mut graph, child, spouse);
        let grandchild = person(&mut graph, Some(union));

        let ranks = assign(&graph);
        assert_eq!(ranks.get(spouse), Some(1));
        assert_eq!(ranks.get(union), Some(1));
        assert_eq!(ranks.get(grandchild), Some(2));
    }

    #[test]
    fn test_partnering_with_own_descendant_keeps_ranks_apart() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let parents = couple(&mut graph, a, b);
        let child = person(&mut graph, Some(parents));
        let union = couple(&mut graph, a, child);
        let late = person(&mut graph, Some(union));

        let ranks = assign(&graph);
        assert_eq!(ranks.get(a), Some(0));
        assert_eq!(ranks.get(child), Some(1));
        assert_eq!(ranks.get(union), Some(1));
        assert_eq!(ranks.get(late), Some(2));
    }

    #[test]
    fn test_founder_spouse_shares_partner_rank() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let parents = couple(&mut graph, a, b);
        let child = person(&mut graph, Some(parents));
        let founder = person(&mut graph, None);
        let union = couple(&mut graph, child, founder);
        person(&mut graph, Some(union));

        let ranks = assign(&graph);
        assert_eq!(ranks.get(founder), ranks.get(child));
    }
}
