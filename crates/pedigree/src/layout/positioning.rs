//! Horizontal coordinate assignment.
//!
//! Each rank is first packed left to right. Relaxation passes then pull every
//! item towards the mean position of its neighbours and project the rank back
//! onto the minimum-gap constraints with an isotonic regression, so the
//! ordering and the gaps survive every pass unchanged.

use std::collections::HashMap;

use log::trace;

use super::{
    layer::{Item, Layering},
    ordering::Order,
};

/// Distribute items horizontally with a minimum gap between them.
///
/// Returns the center of each item; the first item's left edge is at 0.
pub(super) fn distribute_horizontally(widths: &[f32], min_spacing: f32) -> Vec<f32> {
    let mut positions = Vec::with_capacity(widths.len());
    let mut x_position: f32 = 0.0;

    for (i, width) in widths.iter().enumerate() {
        if i == 0 {
            x_position += width / 2.0;
        } else {
            // Half of the previous width, the gap, half of the current width
            x_position += (widths[i - 1] / 2.0) + min_spacing + (width / 2.0);
        }
        positions.push(x_position);
    }

    positions
}

/// Closest positions to `targets` (in the least-squares sense) that keep the
/// centers at least as far apart as [`distribute_horizontally`] would.
fn project(targets: &[f32], widths: &[f32], min_spacing: f32) -> Vec<f32> {
    let packed = distribute_horizontally(widths, min_spacing);
    let base = packed.first().copied().unwrap_or(0.0);
    let offsets: Vec<f32> = packed.iter().map(|center| center - base).collect();

    // Pool adjacent violators on the offset-free values.
    let mut pools: Vec<(f32, usize)> = Vec::with_capacity(targets.len());
    for (target, offset) in targets.iter().zip(&offsets) {
        pools.push((target - offset, 1));
        while let [.., (left_sum, left_len), (right_sum, right_len)] = pools[..] {
            if left_sum / left_len as f32 <= right_sum / right_len as f32 {
                break;
            }
            pools.pop();
            if let Some(last) = pools.last_mut() {
                *last = (left_sum + right_sum, left_len + right_len);
            }
        }
    }

    pools
        .into_iter()
        .flat_map(|(sum, len)| std::iter::repeat_n(sum / len as f32, len))
        .zip(offsets)
        .map(|(level, offset)| level + offset)
        .collect()
}

/// Where `item` would like to be, given the current positions.
///
/// Partnerships follow their partners; everything else follows all of its
/// neighbours. Items without placed neighbours stay where they are.
fn desired(layering: &Layering, item: Item, xs: &HashMap<Item, f32>) -> Option<f32> {
    let neighbours: Vec<Item> = match item {
        Item::Partnership(_) => layering
            .couple_links(item)
            .iter()
            .chain(layering.up(item))
            .copied()
            .collect(),
        _ => layering
            .up(item)
            .iter()
            .chain(layering.down(item))
            .chain(layering.couple_links(item))
            .copied()
            .collect(),
    };

    let placed: Vec<f32> = neighbours
        .iter()
        .filter_map(|neighbour| xs.get(neighbour).copied())
        .collect();
    if placed.is_empty() {
        return None;
    }
    Some(placed.iter().sum::<f32>() / placed.len() as f32)
}

/// Assigns an x coordinate to the center of every item in `order`.
pub(super) fn assign_x(
    layering: &Layering,
    order: &Order,
    width: impl Fn(Item) -> f32,
    min_spacing: f32,
    passes: usize,
) -> HashMap<Item, f32> {
    let rows: Vec<Vec<Item>> = order
        .iter()
        .map(|rank| rank.iter().flatten().copied().collect())
        .collect();
    let widths: Vec<Vec<f32>> = rows
        .iter()
        .map(|row| row.iter().map(|&item| width(item)).collect())
        .collect();

    let mut xs = HashMap::new();
    for (row, widths) in rows.iter().zip(&widths) {
        xs.extend(
            row.iter()
                .copied()
                .zip(distribute_horizontally(widths, min_spacing)),
        );
    }

    for pass in 0..passes {
        let indices: Vec<usize> = if pass % 2 == 0 {
            (0..rows.len()).collect()
        } else {
            (0..rows.len()).rev().collect()
        };
        for index in indices {
            let row = &rows[index];
            let targets: Vec<f32> = row
                .iter()
                .map(|&item| {
                    desired(layering, item, &xs)
                        .or_else(|| xs.get(&item).copied())
                        .unwrap_or(0.0)
                })
                .collect();
            let projected = project(&targets, &widths[index], min_spacing);
            xs.extend(row.iter().copied().zip(projected));
        }
        trace!(pass = pass; "Positioning pass");
    }

    let left = rows
        .iter()
        .zip(&widths)
        .flat_map(|(row, widths)| row.iter().zip(widths))
        .filter_map(|(item, width)| xs.get(item).map(|x| x - width / 2.0))
        .reduce(f32::min)
        .unwrap_or(0.0);
    for x in xs.values_mut() {
        *x -= left;
    }
    xs
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn test_distribute_horizontally() {
        let positions = distribute_horizontally(&[1.0, 2.0, 1.0], 0.5);
        assert_eq!(positions, vec![0.5, 2.5, 4.5]);
        assert!(distribute_horizontally(&[], 0.5).is_empty());
    }

    #[test]
    fn test_project_keeps_satisfied_targets() {
        let targets = [0.0, 3.0, 10.0];
        let projected = project(&targets, &[1.0, 1.0, 1.0], 0.5);
        for (a, b) in projected.iter().zip(targets) {
            assert!(approx_eq!(f32, *a, b, epsilon = 1e-5));
        }
    }

    #[test]
    fn test_project_spreads_colliding_targets() {
        // Both want x = 5; they end up symmetric around it, 1.5 apart.
        let projected = project(&[5.0, 5.0], &[1.0, 1.0], 0.5);
        assert!(approx_eq!(f32, projected[0], 4.25, epsilon = 1e-5));
        assert!(approx_eq!(f32, projected[1], 5.75, epsilon = 1e-5));
    }

    #[test]
    fn test_project_only_moves_violating_pool() {
        let projected = project(&[0.0, 6.0, 6.0], &[1.0, 1.0, 1.0], 0.5);
        assert!(approx_eq!(f32, projected[0], 0.0, epsilon = 1e-5));
        assert!(approx_eq!(f32, projected[1], 5.25, epsilon = 1e-5));
        assert!(approx_eq!(f32, projected[2], 6.75, epsilon = 1e-5));
    }
}
