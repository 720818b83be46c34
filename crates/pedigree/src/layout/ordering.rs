//! Crossing minimisation within ranks.
//!
//! The starting order comes from a depth-first walk over the layering, so
//! families start out close together. Sweeps then re-sort each rank by a
//! weight computed from neighbour positions on the adjacent rank. How that
//! weight is computed is the pluggable [`OrderingStrategy`].

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use log::{debug, trace};

use super::{
    PedigreeLayout,
    layer::{Block, Item, Layering},
};
use crate::config::OrderingHeuristic;

/// Blocks of every rank, left to right.
pub(super) type Order = Vec<Vec<Block>>;

/// Computes the sort key of a block from the positions of its neighbours on
/// the fixed adjacent rank.
pub trait OrderingStrategy: fmt::Debug {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Returns the weight for `positions`, or `None` when there are no
    /// neighbours and the block should keep its slot.
    fn weight(&self, positions: &mut [f32]) -> Option<f32>;
}

/// Mean neighbour position.
#[derive(Debug, Clone, Copy, Default)]
pub struct Barycenter;

impl OrderingStrategy for Barycenter {
    fn name(&self) -> &'static str {
        "barycenter"
    }

    fn weight(&self, positions: &mut [f32]) -> Option<f32> {
        if positions.is_empty() {
            return None;
        }
        Some(positions.iter().sum::<f32>() / positions.len() as f32)
    }
}

/// Median neighbour position; the two middle values are averaged for even
/// counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Median;

impl OrderingStrategy for Median {
    fn name(&self) -> &'static str {
        "median"
    }

    fn weight(&self, positions: &mut [f32]) -> Option<f32> {
        if positions.is_empty() {
            return None;
        }
        positions.sort_by(f32::total_cmp);
        let middle = positions.len() / 2;
        if positions.len() % 2 == 1 {
            Some(positions[middle])
        } else {
            Some((positions[middle - 1] + positions[middle]) / 2.0)
        }
    }
}

/// Creates the strategy selected in the configuration.
pub(super) fn strategy_for(heuristic: OrderingHeuristic) -> Box<dyn OrderingStrategy> {
    match heuristic {
        OrderingHeuristic::Barycenter => Box::new(Barycenter),
        OrderingHeuristic::Median => Box::new(Median),
    }
}

/// Index of every item within its rank.
pub(super) fn index_positions(order: &Order) -> HashMap<Item, usize> {
    order
        .iter()
        .flat_map(|rank| rank.iter().flatten().enumerate())
        .map(|(index, &item)| (item, index))
        .collect()
}

/// Depth-first starting order, optionally biased towards `hint`.
///
/// With a hint, blocks containing an entity that kept its rank are sorted by
/// that entity's previous order; new blocks follow the block visited just
/// before them.
pub(super) fn initial_order(layering: &Layering, hint: Option<&PedigreeLayout>) -> Order {
    let visited = depth_first(layering);
    let Some(hint) = hint else {
        return visited;
    };

    visited
        .into_iter()
        .enumerate()
        .map(|(rank, blocks)| {
            let mut anchor = -1.0_f32;
            let mut keyed: Vec<(f32, usize, Block)> = blocks
                .into_iter()
                .enumerate()
                .map(|(index, block)| {
                    let previous = block.iter().find_map(|item| {
                        let placement = hint.placement(item.entity()?)?;
                        (placement.rank() == rank).then_some(placement.order() as f32)
                    });
                    anchor = previous.unwrap_or(anchor);
                    (anchor, index, block)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            keyed.into_iter().map(|(_, _, block)| block).collect()
        })
        .collect()
}

fn depth_first(layering: &Layering) -> Order {
    let mut block_of = HashMap::new();
    for (rank, blocks) in layering.ranks().iter().enumerate() {
        for (index, block) in blocks.iter().enumerate() {
            for &item in block {
                block_of.insert(item, (rank, index));
            }
        }
    }

    let mut order: Order = vec![Vec::new(); layering.rank_count()];
    let mut visited = HashSet::new();
    for (rank, blocks) in layering.ranks().iter().enumerate() {
        for index in 0..blocks.len() {
            let mut stack = vec![(rank, index)];
            while let Some((rank, index)) = stack.pop() {
                if !visited.insert((rank, index)) {
                    continue;
                }
                let block = &layering.ranks()[rank][index];
                order[rank].push(block.clone());

                let neighbours: Vec<(usize, usize)> = block
                    .iter()
                    .flat_map(|&item| layering.down(item).iter().chain(layering.up(item)))
                    .filter_map(|next| block_of.get(next).copied())
                    .collect();
                stack.extend(
                    neighbours
                        .into_iter()
                        .rev()
                        .filter(|next| !visited.contains(next)),
                );
            }
        }
    }
    order
}

/// Makes the blocks of each sibling set contiguous, at the position of the
/// first sibling block.
pub(super) fn regroup_siblings(layering: &Layering, blocks: &mut Vec<Block>) {
    let families: Vec<_> = blocks
        .iter()
        .map(|block| block.iter().find_map(|&item| layering.family(item)))
        .collect();

    let mut emitted = HashSet::new();
    let mut regrouped = Vec::with_capacity(blocks.len());
    for (index, family) in families.iter().enumerate() {
        match family {
            None => regrouped.push(index),
            Some(family) if emitted.insert(*family) => regrouped.extend(
                families
                    .iter()
                    .enumerate()
                    .filter(|(_, other)| *other == &Some(*family))
                    .map(|(other, _)| other),
            ),
            Some(_) => {}
        }
    }

    *blocks = regrouped.into_iter().map(|index| blocks[index].clone()).collect();
}

/// Number of pairwise crossings between edges of adjacent ranks.
pub(super) fn crossings(layering: &Layering, order: &Order) -> usize {
    let positions = index_positions(order);
    let mut total = 0;
    for rank in order {
        let mut edges = Vec::new();
        for &upper in rank.iter().flatten() {
            let Some(&from) = positions.get(&upper) else {
                continue;
            };
            for lower in layering.down(upper) {
                if let Some(&to) = positions.get(lower) {
                    edges.push((from, to));
                }
            }
        }

        for (index, a) in edges.iter().enumerate() {
            for b in &edges[index + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    total += 1;
                }
            }
        }
    }
    total
}

/// One sweep over all ranks, top-down (`downward`) or bottom-up.
fn sweep(layering: &Layering, order: &mut Order, strategy: &dyn OrderingStrategy, downward: bool) {
    let rank_count = order.len();
    let ranks: Vec<usize> = if downward {
        (1..rank_count).collect()
    } else {
        (0..rank_count.saturating_sub(1)).rev().collect()
    };

    for rank in ranks {
        let fixed = if downward { rank - 1 } else { rank + 1 };
        let reference: HashMap<Item, usize> = order[fixed]
            .iter()
            .flatten()
            .enumerate()
            .map(|(index, &item)| (item, index))
            .collect();

        let blocks = &order[rank];
        let mut movable: Vec<(usize, f32)> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                let mut positions: Vec<f32> = block
                    .iter()
                    .flat_map(|&item| {
                        if downward {
                            layering.up(item)
                        } else {
                            layering.down(item)
                        }
                    })
                    .filter_map(|neighbour| reference.get(neighbour))
                    .map(|&position| position as f32)
                    .collect();
                strategy.weight(&mut positions).map(|weight| (index, weight))
            })
            .collect();
        let slots: Vec<usize> = movable.iter().map(|(index, _)| *index).collect();
        movable.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut picks: Vec<usize> = (0..blocks.len()).collect();
        for (&slot, &(source, _)) in slots.iter().zip(&movable) {
            picks[slot] = source;
        }
        let mut sorted: Vec<Block> = picks.into_iter().map(|index| blocks[index].clone()).collect();
        regroup_siblings(layering, &mut sorted);
        order[rank] = sorted;
    }
}

/// Runs alternating sweeps while each one strictly lowers the crossing
/// count, up to `passes` sweeps.
pub(super) fn minimize_crossings(
    layering: &Layering,
    mut order: Order,
    strategy: &dyn OrderingStrategy,
    passes: usize,
) -> Order {
    for blocks in &mut order {
        regroup_siblings(layering, blocks);
    }
    let mut best = crossings(layering, &order);
    debug!(strategy = strategy.name(), crossings = best; "Initial ordering");

    let mut used = 0;
    for pass in 0..passes {
        if best == 0 {
            break;
        }
        let mut candidate = order.clone();
        sweep(layering, &mut candidate, strategy, pass % 2 == 0);
        let count = crossings(layering, &candidate);
        used = pass + 1;
        trace!(pass = pass, crossings = count; "Ordering sweep");
        if count >= best {
            break;
        }
        order = candidate;
        best = count;
    }

    debug!(passes = used, crossings = best; "Ordering finished");
    order
}
