//! Dense occupancy index over the simulation grid.

use std::collections::HashMap;

use thiserror::Error;
use traffic_grid_core::{AgentId, AgentKind, CellCoord, Occupant};

/// Reasons a grid placement or relocation may be rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The cell lies outside the configured grid.
    #[error("cell {cell} lies outside the grid")]
    OutOfBounds {
        /// Rejected cell.
        cell: CellCoord,
    },
    /// The cell already holds an occupant of a conflicting kind.
    #[error("cell {cell} is already occupied by {occupant}")]
    Occupied {
        /// Rejected cell.
        cell: CellCoord,
        /// Agent holding the cell.
        occupant: AgentId,
    },
    /// The agent has not been placed on the grid.
    #[error("{id} is not placed on the grid")]
    NotPlaced {
        /// Unknown agent.
        id: AgentId,
    },
    /// The agent is already placed on the grid.
    #[error("{id} is already placed on the grid")]
    AlreadyPlaced {
        /// Duplicate agent.
        id: AgentId,
    },
    /// The requested dimensions exceed [`MAX_GRID_CELLS`].
    #[error("a {columns}x{rows} grid exceeds the cell limit")]
    TooLarge {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
}

/// Largest number of cells a grid may hold.
pub const MAX_GRID_CELLS: u64 = 1 << 20;

#[derive(Clone, Copy, Debug)]
struct Placement {
    cell: CellCoord,
    kind: AgentKind,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    blocker: Option<Occupant>,
    signal: Option<AgentId>,
}

/// Bounded occupancy index mapping cells to the agents placed on them.
///
/// A cell holds at most one blocking occupant (an obstacle or a pathfinding
/// agent) and, independently, at most one traffic light. Lights never prevent
/// other agents from sharing their cell. Coordinates never wrap around.
#[derive(Clone, Debug)]
pub struct GridWorld {
    columns: u32,
    rows: u32,
    cells: Vec<Slot>,
    placements: HashMap<AgentId, Placement>,
}

impl GridWorld {
    /// Creates an empty grid with the provided dimensions.
    ///
    /// Fails when the grid would hold more than [`MAX_GRID_CELLS`] cells.
    pub fn new(columns: u32, rows: u32) -> Result<Self, GridError> {
        let too_large = GridError::TooLarge { columns, rows };
        let capacity = u64::from(columns)
            .checked_mul(u64::from(rows))
            .filter(|cells| *cells <= MAX_GRID_CELLS)
            .and_then(|cells| usize::try_from(cells).ok())
            .ok_or(too_large)?;
        Ok(Self {
            columns,
            rows,
            cells: vec![Slot::default(); capacity],
            placements: HashMap::new(),
        })
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Places a new agent of the provided kind on `cell`.
    pub fn place(&mut self, id: AgentId, kind: AgentKind, cell: CellCoord) -> Result<(), GridError> {
        if self.placements.contains_key(&id) {
            return Err(GridError::AlreadyPlaced { id });
        }
        let index = self.index(cell).ok_or(GridError::OutOfBounds { cell })?;
        let slot = &mut self.cells[index];

        if kind.is_blocking() {
            if let Some(existing) = slot.blocker {
                return Err(GridError::Occupied {
                    cell,
                    occupant: existing.id,
                });
            }
            slot.blocker = Some(Occupant { id, kind });
        } else {
            if let Some(existing) = slot.signal {
                return Err(GridError::Occupied {
                    cell,
                    occupant: existing,
                });
            }
            slot.signal = Some(id);
        }

        let _ = self.placements.insert(id, Placement { cell, kind });
        Ok(())
    }

    /// Relocates a placed blocking agent, returning the cell it left.
    pub fn move_to(&mut self, id: AgentId, cell: CellCoord) -> Result<CellCoord, GridError> {
        let Placement { cell: from, kind } =
            *self.placements.get(&id).ok_or(GridError::NotPlaced { id })?;
        if from == cell {
            return Ok(from);
        }

        let to_index = self.index(cell).ok_or(GridError::OutOfBounds { cell })?;
        let from_index = self.index(from).ok_or(GridError::OutOfBounds { cell: from })?;

        if kind.is_blocking() {
            if let Some(existing) = self.cells[to_index].blocker {
                return Err(GridError::Occupied {
                    cell,
                    occupant: existing.id,
                });
            }
            self.cells[from_index].blocker = None;
            self.cells[to_index].blocker = Some(Occupant { id, kind });
        } else {
            if let Some(existing) = self.cells[to_index].signal {
                return Err(GridError::Occupied {
                    cell,
                    occupant: existing,
                });
            }
            self.cells[from_index].signal = None;
            self.cells[to_index].signal = Some(id);
        }

        let _ = self.placements.insert(id, Placement { cell, kind });
        Ok(from)
    }

    /// Removes an agent from the grid, returning the cell it occupied.
    pub fn remove(&mut self, id: AgentId) -> Option<CellCoord> {
        let Placement { cell, kind } = self.placements.remove(&id)?;
        if let Some(index) = self.index(cell) {
            let slot = &mut self.cells[index];
            if kind.is_blocking() {
                slot.blocker = None;
            } else {
                slot.signal = None;
            }
        }
        Some(cell)
    }

    /// Cell currently occupied by the agent.
    #[must_use]
    pub fn position(&self, id: AgentId) -> Option<CellCoord> {
        self.placements.get(&id).map(|placement| placement.cell)
    }

    /// Agents placed on the cell, blocking occupant first.
    #[must_use]
    pub fn contents(&self, cell: CellCoord) -> Vec<Occupant> {
        let Some(slot) = self.slot(cell) else {
            return Vec::new();
        };

        let mut occupants = Vec::with_capacity(2);
        occupants.extend(slot.blocker);
        occupants.extend(slot.signal.map(|id| Occupant {
            id,
            kind: AgentKind::TrafficLight,
        }));
        occupants
    }

    /// Reports whether the cell lies inside the grid and holds no agent at all.
    #[must_use]
    pub fn is_empty(&self, cell: CellCoord) -> bool {
        self.slot(cell)
            .is_some_and(|slot| slot.blocker.is_none() && slot.signal.is_none())
    }

    /// Reports whether a blocking agent could be placed on the cell.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.slot(cell).is_some_and(|slot| slot.blocker.is_none())
    }

    /// Reports whether the cell holds a blocking agent other than `agent`.
    #[must_use]
    pub fn blocks(&self, cell: CellCoord, agent: AgentId) -> bool {
        self.slot(cell)
            .and_then(|slot| slot.blocker)
            .is_some_and(|occupant| occupant.id != agent)
    }

    /// Reports whether the cell holds an obstacle.
    #[must_use]
    pub fn has_obstacle(&self, cell: CellCoord) -> bool {
        self.slot(cell)
            .and_then(|slot| slot.blocker)
            .is_some_and(|occupant| occupant.kind == AgentKind::Obstacle)
    }

    fn slot(&self, cell: CellCoord) -> Option<&Slot> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
