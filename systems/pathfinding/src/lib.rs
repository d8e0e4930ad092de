#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid A* used to route defeated enemies back to their enclosure.
//!
//! The search runs over a flattened, row-major occupancy table in which only
//! one code matters: cells holding the `occupied` code are impassable and
//! every other cell is open. Movement is 4-connected with unit step cost and
//! the Manhattan distance as heuristic.
//!
//! Frontier ties are broken deterministically. Among nodes with the same
//! `f = g + h` the node with the smaller `h` is expanded first, then the one
//! with the smaller row, then the one with the smaller column. Equal-length
//! routes therefore resolve towards the top-left of the grid.

use std::collections::BTreeSet;

use log::{debug, trace};
use maze_chase_core::{Direction, SlotCoord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    f: u32,
    h: u32,
    row: i32,
    column: i32,
}

/// Finds a shortest 4-connected route between two slots.
///
/// The returned waypoints include both `start` and `goal`. The start slot is
/// expanded whatever its code, while the goal must be open to be reached.
/// Returns `None` when the table does not match the dimensions, when either
/// endpoint lies outside the grid, or when the goal is unreachable.
#[must_use]
pub fn a_star_manhattan(
    cells: &[u8],
    rows: u32,
    columns: u32,
    occupied: u8,
    start: SlotCoord,
    goal: SlotCoord,
) -> Option<Vec<SlotCoord>> {
    let Some(layout) = FlatLayout::new(cells.len(), rows, columns) else {
        debug!(
            "occupancy table of {} cells does not describe a {rows}x{columns} grid",
            cells.len()
        );
        return None;
    };
    let start_index = layout.index(start)?;
    let goal_index = layout.index(goal)?;

    let mut g_score = vec![u32::MAX; cells.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; cells.len()];
    let mut closed = vec![false; cells.len()];
    let mut open = BTreeSet::new();

    g_score[start_index] = 0;
    let h = start.manhattan_distance(goal);
    let _ = open.insert(OpenNode {
        f: h,
        h,
        row: start.row(),
        column: start.column(),
    });

    while let Some(node) = open.pop_first() {
        let slot = SlotCoord::new(node.row, node.column);
        let Some(index) = layout.index(slot) else {
            continue;
        };
        if closed[index] {
            continue;
        }
        closed[index] = true;

        if index == goal_index {
            let path = reconstruct_path(&came_from, &layout, goal_index);
            trace!("route {start:?} -> {goal:?} spans {} slots", path.len());
            return Some(path);
        }

        let tentative = g_score[index].saturating_add(1);
        for direction in Direction::ALL {
            let next = slot.neighbor(direction);
            let Some(next_index) = layout.index(next) else {
                continue;
            };
            if closed[next_index] || cells[next_index] == occupied {
                continue;
            }
            if tentative < g_score[next_index] {
                g_score[next_index] = tentative;
                came_from[next_index] = Some(index);
                let h = next.manhattan_distance(goal);
                let _ = open.insert(OpenNode {
                    f: tentative + h,
                    h,
                    row: next.row(),
                    column: next.column(),
                });
            }
        }
    }

    debug!("no route from {start:?} to {goal:?}");
    None
}

#[derive(Clone, Copy, Debug)]
struct FlatLayout {
    rows: u32,
    columns: u32,
}

impl FlatLayout {
    fn new(cell_count: usize, rows: u32, columns: u32) -> Option<Self> {
        let expected = usize::try_from(u64::from(rows) * u64::from(columns)).ok()?;
        (expected == cell_count && expected > 0).then_some(Self { rows, columns })
    }

    fn index(&self, slot: SlotCoord) -> Option<usize> {
        let row = u32::try_from(slot.row()).ok()?;
        let column = u32::try_from(slot.column()).ok()?;
        if row < self.rows && column < self.columns {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn slot(&self, index: usize) -> SlotCoord {
        let width = self.columns as usize;
        SlotCoord::new((index / width) as i32, (index % width) as i32)
    }
}

fn reconstruct_path(came_from: &[Option<usize>], layout: &FlatLayout, goal: usize) -> Vec<SlotCoord> {
    let mut path = vec![layout.slot(goal)];
    let mut current = goal;
    while let Some(previous) = came_from[current] {
        path.push(layout.slot(previous));
        current = previous;
    }
    path.reverse();
    path
}
