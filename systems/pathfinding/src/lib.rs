#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic constrained shortest-path search over the traffic grid.
//!
//! The search is a best-first expansion ordered by accumulated step cost plus
//! the Manhattan distance to the goal. Cells painted with an arrow may only be
//! left in the three directions that do not reverse against the arrow, cells
//! holding obstacles are never entered, and nodes the map cannot classify are
//! treated as dead ends.
//!
//! Frontier entries are ordered by `(priority, column, row)`, so two
//! candidates with the same priority are resolved by the smaller column and
//! then the smaller row. The resulting plans are identical across runs and
//! platforms regardless of neighbour enumeration order.

use std::{cmp::Reverse, collections::BinaryHeap};

use traffic_grid_core::{CellCoord, Direction, MapCell};

/// Reusable search workspace.
///
/// The dense buffers are sized to the grid on every query and retained
/// between calls so that repeated planning does not reallocate.
#[derive(Debug, Default)]
pub struct Pathfinder {
    costs: Vec<u32>,
    came_from: Vec<Option<CellCoord>>,
    frontier: BinaryHeap<Reverse<FrontierEntry>>,
}

impl Pathfinder {
    /// Computes the cheapest path from `start` to `goal`.
    ///
    /// The returned path begins with `start` and ends with `goal`. It is empty
    /// when the goal cannot be reached, when either endpoint lies outside the
    /// `columns` x `rows` grid, or when the goal itself holds an obstacle.
    /// `classify` yields the map classification of a cell, or `None` when the
    /// map has no data for it; `has_obstacle` reports cells blocked by
    /// obstacles.
    pub fn compute_path<M, O>(
        &mut self,
        start: CellCoord,
        goal: CellCoord,
        columns: u32,
        rows: u32,
        classify: M,
        has_obstacle: O,
    ) -> Vec<CellCoord>
    where
        M: Fn(CellCoord) -> Option<MapCell>,
        O: Fn(CellCoord) -> bool,
    {
        let Some(cell_count) = cell_count(columns, rows) else {
            return Vec::new();
        };
        let width = columns as usize;
        let (Some(start_index), Some(goal_index)) = (
            index(width, columns, rows, start),
            index(width, columns, rows, goal),
        ) else {
            return Vec::new();
        };

        self.reset(cell_count);
        self.costs[start_index] = 0;
        self.frontier
            .push(Reverse(FrontierEntry::new(start, 0, start.manhattan_distance(goal))));

        let mut reached = false;
        while let Some(Reverse(entry)) = self.frontier.pop() {
            let cell = entry.cell();
            let Some(current_index) = index(width, columns, rows, cell) else {
                continue;
            };
            if entry.cost > self.costs[current_index] {
                continue;
            }

            if cell == goal {
                reached = true;
                break;
            }

            let Some(classification) = classify(cell) else {
                continue;
            };

            let next_cost = entry.cost.saturating_add(1);
            for direction in Direction::ALL {
                if let MapCell::Direction(arrow) = classification {
                    if !arrow.permits(direction) {
                        continue;
                    }
                }

                let Some(neighbor) = cell.step(direction, columns, rows) else {
                    continue;
                };
                if has_obstacle(neighbor) {
                    continue;
                }
                let Some(neighbor_index) = index(width, columns, rows, neighbor) else {
                    continue;
                };
                if next_cost >= self.costs[neighbor_index] {
                    continue;
                }

                self.costs[neighbor_index] = next_cost;
                self.came_from[neighbor_index] = Some(cell);
                let priority = next_cost.saturating_add(neighbor.manhattan_distance(goal));
                self.frontier
                    .push(Reverse(FrontierEntry::new(neighbor, next_cost, priority)));
            }
        }

        if !reached {
            return Vec::new();
        }

        let mut path = vec![goal];
        let mut cursor = goal_index;
        while let Some(previous) = self.came_from[cursor] {
            path.push(previous);
            match index(width, columns, rows, previous) {
                Some(previous_index) => cursor = previous_index,
                None => break,
            }
        }
        path.reverse();

        if path.first() == Some(&start) {
            path
        } else {
            Vec::new()
        }
    }

    fn reset(&mut self, cell_count: usize) {
        self.costs.clear();
        self.costs.resize(cell_count, u32::MAX);
        self.came_from.clear();
        self.came_from.resize(cell_count, None);
        self.frontier.clear();
    }
}

/// Convenience wrapper that runs a single search with a fresh workspace.
pub fn compute_path<M, O>(
    start: CellCoord,
    goal: CellCoord,
    columns: u32,
    rows: u32,
    classify: M,
    has_obstacle: O,
) -> Vec<CellCoord>
where
    M: Fn(CellCoord) -> Option<MapCell>,
    O: Fn(CellCoord) -> bool,
{
    Pathfinder::default().compute_path(start, goal, columns, rows, classify, has_obstacle)
}

// Field order defines the frontier ordering: priority, then column, then row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct FrontierEntry {
    priority: u32,
    column: u32,
    row: u32,
    cost: u32,
}

impl FrontierEntry {
    fn new(cell: CellCoord, cost: u32, priority: u32) -> Self {
        Self {
            priority,
            column: cell.column(),
            row: cell.row(),
            cost,
        }
    }

    fn cell(&self) -> CellCoord {
        CellCoord::new(self.column, self.row)
    }
}

fn cell_count(columns: u32, rows: u32) -> Option<usize> {
    let count = usize::try_from(columns)
        .ok()?
        .checked_mul(usize::try_from(rows).ok()?)?;
    (count > 0).then_some(count)
}

fn index(width: usize, columns: u32, rows: u32, cell: CellCoord) -> Option<usize> {
    if cell.column() >= columns || cell.row() >= rows {
        return None;
    }
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
