//! Layered view of a ranked pedigree.
//!
//! Every node and partnership becomes an [`Item`] on its rank. Edges that
//! span more than one rank are split by virtual items so that all adjacency
//! runs between neighbouring ranks. Partners that share the partnership's
//! rank are not connected vertically; they are chained horizontally into a
//! [`Block`] that the ordering step moves as one unit.

use std::collections::{HashMap, HashSet};

use log::{error, trace};

use pedigree_core::identifier::Id;

use super::rank::Ranks;
use crate::structure::PedigreeGraph;

/// An entry of a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(super) enum Item {
    Node(Id),
    Partnership(Id),
    /// Bend point of the edge `from → to` on `rank`; `from` is the upper end.
    Virtual { from: Id, to: Id, rank: usize },
}

impl Item {
    /// The graph entity behind this item, if it is not virtual.
    pub(super) fn entity(self) -> Option<Id> {
        match self {
            Self::Node(id) | Self::Partnership(id) => Some(id),
            Self::Virtual { .. } => None,
        }
    }
}

/// Items that keep their relative order and stay adjacent.
pub(super) type Block = Vec<Item>;

#[derive(Debug, Default)]
pub(super) struct Layering {
    ranks: Vec<Vec<Block>>,
    up: HashMap<Item, Vec<Item>>,
    down: HashMap<Item, Vec<Item>>,
    couple_links: HashMap<Item, Vec<Item>>,
    family: HashMap<Item, Id>,
    rank_of: HashMap<Item, usize>,
}

impl Layering {
    /// Blocks of every rank in construction order.
    pub(super) fn ranks(&self) -> &[Vec<Block>] {
        &self.ranks
    }

    pub(super) fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    #[cfg(test)]
    pub(super) fn rank_of(&self, item: Item) -> Option<usize> {
        self.rank_of.get(&item).copied()
    }

    /// Neighbours on the rank above.
    pub(super) fn up(&self, item: Item) -> &[Item] {
        self.up.get(&item).map_or(&[], Vec::as_slice)
    }

    /// Neighbours on the rank below, children in child-hub order.
    pub(super) fn down(&self, item: Item) -> &[Item] {
        self.down.get(&item).map_or(&[], Vec::as_slice)
    }

    /// Same-rank partner ↔ partnership links.
    pub(super) fn couple_links(&self, item: Item) -> &[Item] {
        self.couple_links.get(&item).map_or(&[], Vec::as_slice)
    }

    /// The partnership whose child chain starts at `item`.
    pub(super) fn family(&self, item: Item) -> Option<Id> {
        self.family.get(&item).copied()
    }

    fn connect(&mut self, upper: Item, lower: Item) {
        self.down.entry(upper).or_default().push(lower);
        self.up.entry(lower).or_default().push(upper);
    }

    fn link_couple(&mut self, node: Item, partnership: Item) {
        for (from, to) in [(node, partnership), (partnership, node)] {
            let links = self.couple_links.entry(from).or_default();
            if let Err(index) = links.binary_search(&to) {
                links.insert(index, to);
            }
        }
    }

    /// Connects `upper` to `lower` through one virtual item per intermediate
    /// rank and returns the item directly below `upper`.
    fn add_chain(
        &mut self,
        items: &mut [Vec<Item>],
        (upper, upper_rank): (Item, usize),
        (lower, lower_rank): (Item, usize),
        (from, to): (Id, Id),
    ) -> Item {
        if lower_rank <= upper_rank {
            error!(from = from.get(), to = to.get(); "Edge does not point down the ranks");
            return lower;
        }

        let mut previous = upper;
        let mut first = lower;
        for rank in upper_rank + 1..lower_rank {
            let bend = Item::Virtual { from, to, rank };
            items[rank].push(bend);
            self.rank_of.insert(bend, rank);
            self.connect(previous, bend);
            if previous == upper {
                first = bend;
            }
            previous = bend;
        }
        self.connect(previous, lower);
        first
    }
}

/// Builds the layering of `graph` under `ranks`.
pub(super) fn build(graph: &PedigreeGraph, ranks: &Ranks) -> Layering {
    let mut layering = Layering::default();
    let mut items: Vec<Vec<Item>> = vec![Vec::new(); ranks.count()];

    let entities = graph
        .nodes()
        .map(|node| Item::Node(node.id()))
        .chain(graph.partnerships().map(|p| Item::Partnership(p.id())));
    for item in entities {
        let Some(rank) = item.entity().and_then(|id| ranks.get(id)) else {
            continue;
        };
        items[rank].push(item);
        layering.rank_of.insert(item, rank);
    }

    for partnership in graph.partnerships() {
        let id = partnership.id();
        let Some(hub_rank) = ranks.get(id) else {
            continue;
        };
        let hub = Item::Partnership(id);

        for partner in partnership.partners() {
            let Some(partner_rank) = ranks.get(partner) else {
                continue;
            };
            let node = Item::Node(partner);
            if partner_rank == hub_rank {
                layering.link_couple(node, hub);
            } else {
                layering.add_chain(
                    &mut items,
                    (node, partner_rank),
                    (hub, hub_rank),
                    (partner, id),
                );
            }
        }

        for &child in graph.children_of(id) {
            let Some(child_rank) = ranks.get(child) else {
                continue;
            };
            let top = layering.add_chain(
                &mut items,
                (hub, hub_rank),
                (Item::Node(child), child_rank),
                (id, child),
            );
            layering.family.insert(top, id);
        }
    }

    layering.ranks = items
        .iter()
        .map(|rank| couple_blocks(&layering, rank))
        .collect();
    trace!(ranks = layering.ranks.len(), items = layering.rank_of.len(); "Layering built");
    layering
}

/// Splits a rank into blocks, chaining each couple component from the
/// partner with the fewest same-rank partnerships.
fn couple_blocks(layering: &Layering, rank: &[Item]) -> Vec<Block> {
    let mut assigned = HashSet::new();
    let mut blocks = Vec::new();

    for &item in rank {
        if assigned.contains(&item) {
            continue;
        }
        if layering.couple_links(item).is_empty() {
            assigned.insert(item);
            blocks.push(vec![item]);
            continue;
        }

        let mut component = Vec::new();
        let mut pending = vec![item];
        let mut seen = HashSet::from([item]);
        while let Some(current) = pending.pop() {
            component.push(current);
            for &next in layering.couple_links(current) {
                if seen.insert(next) {
                    pending.push(next);
                }
            }
        }

        let start = component
            .iter()
            .copied()
            .filter(|member| matches!(member, Item::Node(_)))
            .min_by_key(|&member| (layering.couple_links(member).len(), member))
            .unwrap_or(item);

        let mut block = Vec::with_capacity(component.len());
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !assigned.insert(current) {
                continue;
            }
            block.push(current);
            for &next in layering.couple_links(current).iter().rev() {
                if !assigned.contains(&next) {
                    stack.push(next);
                }
            }
        }
        blocks.push(block);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use pedigree_core::properties::{PartnershipProperties, PersonProperties};

    use super::*;
    use crate::layout::rank;

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

    fn layering(graph: &PedigreeGraph) -> Layering {
        build(graph, &rank::assign(graph))
    }

    #[test]
    fn test_couple_forms_one_block() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let union = couple(&mut graph, a, b);
        let child = person(&mut graph, Some(union));

        let layering = layering(&graph);
        assert_eq!(layering.rank_count(), 2);
        assert_eq!(
            layering.ranks()[0],
            vec![vec![Item::Node(a), Item::Partnership(union), Item::Node(b)]]
        );
        assert_eq!(layering.down(Item::Partnership(union)), &[Item::Node(child)]);
        assert_eq!(layering.up(Item::Node(child)), &[Item::Partnership(union)]);
        assert_eq!(layering.family(Item::Node(child)), Some(union));
    }

    #[test]
    fn test_partner_with_two_partnerships_sits_in_the_middle() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let c = person(&mut graph, None);
        let first = couple(&mut graph, a, b);
        let second = couple(&mut graph, a, c);

        let layering = layering(&graph);
        assert_eq!(
            layering.ranks()[0],
            vec![vec![
                Item::Node(b),
                Item::Partnership(first),
                Item::Node(a),
                Item::Partnership(second),
                Item::Node(c),
            ]]
        );
    }

    #[test]
    fn test_long_edges_get_virtual_items() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let parents = couple(&mut graph, a, b);
        let child = person(&mut graph, Some(parents));
        let union = couple(&mut graph, a, child);
        let late = person(&mut graph, Some(union));

        let layering = layering(&graph);
        // `a` sits on rank 0, the partnership with `child` on rank 1.
        assert_eq!(layering.rank_of(Item::Node(a)), Some(0));
        assert_eq!(layering.rank_of(Item::Partnership(union)), Some(1));
        assert_eq!(layering.down(Item::Node(a)), &[Item::Partnership(union)]);
        assert_eq!(layering.rank_of(Item::Node(late)), Some(2));
        assert!(layering.up(Item::Node(late)).contains(&Item::Partnership(union)));
    }

    #[test]
    fn test_spanning_child_edge_uses_bend_points() {
        let mut graph = PedigreeGraph::new();
        // Grandparents with a child who marries a grandchild-rank person.
        let a = person(&mut graph, None);
        let b = person(&mut graph, None);
        let top = couple(&mut graph, a, b);
        let middle = person(&mut graph, Some(top));
        let spouse = person(&mut graph, None);
        let lower = couple(&mut graph, middle, spouse);
        let low = person(&mut graph, Some(lower));
        let late = couple(&mut graph, a, low);
        let child = person(&mut graph, Some(late));

        let layering = layering(&graph);
        let bend = Item::Virtual {
            from: a,
            to: late,
            rank: 1,
        };
        assert_eq!(layering.rank_of(bend), Some(1));
        assert_eq!(layering.down(Item::Node(a)), &[bend]);
        assert_eq!(layering.down(bend), &[Item::Partnership(late)]);
        assert_eq!(layering.family(Item::Node(child)), Some(late));
    }
}
