#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Corner spawning policy used to introduce new pathfinding agents.
//!
//! New agents only ever enter the grid at one of its four corners. Each
//! attempt draws a corner and a destination uniformly from the caller's random
//! source; the attempt is rejected when the corner is not free or coincides
//! with the drawn destination. Attempts are bounded so that a saturated grid
//! surfaces an error instead of looping.

use rand::{seq::SliceRandom, Rng};
use thiserror::Error;
use traffic_grid_core::CellCoord;

/// Default number of draws before a spawn request gives up.
pub const DEFAULT_SPAWN_ATTEMPTS: u32 = 64;

/// Configuration parameters required to construct the spawning policy.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    attempts: u32,
}

impl Config {
    /// Creates a new configuration allowing `attempts` draws per spawn.
    #[must_use]
    pub const fn new(attempts: u32) -> Self {
        Self { attempts }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SPAWN_ATTEMPTS)
    }
}

/// Start cell and destination chosen for a new agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnSite {
    /// Corner the agent is placed on.
    pub cell: CellCoord,
    /// Destination the agent travels toward.
    pub destination: CellCoord,
}

/// Reasons the policy could not produce a spawn site.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The map offers no destination cells.
    #[error("no destination cells are available")]
    NoDestination,
    /// The grid has no cells, so it has no corners either.
    #[error("the grid has no corners")]
    NoCorners,
    /// Every draw was rejected because its corner was occupied or coincided
    /// with its destination.
    ///
    /// Maps whose destinations cover every corner only spawn when a draw pairs
    /// a corner with a different destination; on a single-cell grid that never
    /// happens.
    #[error("no free spawn corner found after {attempts} attempts")]
    NoFreeCorner {
        /// Number of draws performed.
        attempts: u32,
    },
}

/// Pure policy selecting where new agents enter the grid.
#[derive(Clone, Copy, Debug)]
pub struct Spawning {
    attempts: u32,
}

impl Spawning {
    /// Creates a new spawning policy using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            attempts: config.attempts,
        }
    }

    /// Draws a spawn site, retrying until `is_free` accepts a corner.
    pub fn select<R, F>(
        &self,
        rng: &mut R,
        columns: u32,
        rows: u32,
        destinations: &[CellCoord],
        is_free: F,
    ) -> Result<SpawnSite, SelectionError>
    where
        R: Rng + ?Sized,
        F: Fn(CellCoord) -> bool,
    {
        if destinations.is_empty() {
            return Err(SelectionError::NoDestination);
        }
        let corners = corners(columns, rows).ok_or(SelectionError::NoCorners)?;

        for _ in 0..self.attempts {
            let (Some(&cell), Some(&destination)) =
                (corners.choose(rng), destinations.choose(rng))
            else {
                break;
            };

            if cell != destination && is_free(cell) {
                return Ok(SpawnSite { cell, destination });
            }
        }

        Err(SelectionError::NoFreeCorner {
            attempts: self.attempts,
        })
    }
}

impl Default for Spawning {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// The four corner cells of a `columns` x `rows` grid.
///
/// Narrow grids repeat cells, which keeps each corner slot equally likely.
#[must_use]
pub fn corners(columns: u32, rows: u32) -> Option<[CellCoord; 4]> {
    let last_column = columns.checked_sub(1)?;
    let last_row = rows.checked_sub(1)?;
    Some([
        CellCoord::new(0, 0),
        CellCoord::new(last_column, 0),
        CellCoord::new(0, last_row),
        CellCoord::new(last_column, last_row),
    ])
}
