#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Traffic Grid engine.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the pure systems, and the adapters. The world classifies map cells into
//! [`MapCell`] values, tracks agents by [`AgentId`], and broadcasts [`Event`]
//! values describing every mutation performed during a tick. Adapters and
//! tests consume immutable snapshots such as [`AgentView`] rather than the
//! world's internal state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every cardinal direction in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

/// Painted arrow restricting which neighbours are reachable from a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arrow {
    /// `>`: traffic flows toward increasing columns.
    Right,
    /// `<`: traffic flows toward decreasing columns.
    Left,
    /// `^`: traffic flows toward decreasing rows.
    Up,
    /// `v`: traffic flows toward increasing rows.
    Down,
}

impl Arrow {
    /// Parses the map glyph for an arrow.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '>' => Some(Self::Right),
            '<' => Some(Self::Left),
            '^' => Some(Self::Up),
            'v' => Some(Self::Down),
            _ => None,
        }
    }

    /// Direction the arrow points toward.
    #[must_use]
    pub const fn heading(self) -> Direction {
        match self {
            Self::Right => Direction::East,
            Self::Left => Direction::West,
            Self::Up => Direction::North,
            Self::Down => Direction::South,
        }
    }

    /// Reports whether leaving the arrow's cell in `direction` is allowed.
    ///
    /// Only the direction reversing against the arrow is forbidden.
    #[must_use]
    pub fn permits(self, direction: Direction) -> bool {
        direction != self.heading().opposite()
    }
}

/// Size class of a traffic signal painted on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalSize {
    /// `S`: slow signal toggling every 15 ticks.
    Large,
    /// `s`: fast signal toggling every 5 ticks.
    Small,
}

impl SignalSize {
    /// Number of ticks between two toggles.
    #[must_use]
    pub const fn interval(self) -> u32 {
        match self {
            Self::Large => 15,
            Self::Small => 5,
        }
    }
}

/// Light currently shown by a traffic signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    /// Initial state of every signal.
    Green,
    /// Alternate state.
    Red,
}

impl SignalState {
    /// State the signal shows after its next toggle.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Green => Self::Red,
            Self::Red => Self::Green,
        }
    }
}

/// Immutable classification of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapCell {
    /// Unrestricted traversable cell.
    Empty,
    /// Static obstacle.
    Obstacle,
    /// Cell agents may be sent to.
    Destination,
    /// Traversable cell carrying a direction constraint.
    Direction(Arrow),
    /// Traversable cell hosting a traffic signal.
    TrafficLight(SignalSize),
}

impl MapCell {
    /// Classifies a map glyph. Unknown glyphs denote empty cells.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Self {
        match glyph {
            'D' => Self::Destination,
            '#' => Self::Obstacle,
            'S' => Self::TrafficLight(SignalSize::Large),
            's' => Self::TrafficLight(SignalSize::Small),
            _ => match Arrow::from_glyph(glyph) {
                Some(arrow) => Self::Direction(arrow),
                None => Self::Empty,
            },
        }
    }
}

/// Unique identifier assigned to any agent placed in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Variants of agents that can occupy a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    /// Agent travelling toward a destination.
    Pathfinding,
    /// Periodic signal; never blocks other occupants.
    TrafficLight,
    /// Static blocker.
    Obstacle,
}

impl AgentKind {
    /// Reports whether the kind prevents other blocking kinds from sharing its cell.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        !matches!(self, Self::TrafficLight)
    }
}

/// Entity currently placed on a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occupant {
    /// Identifier of the placed agent.
    pub id: AgentId,
    /// Variant of the placed agent.
    pub kind: AgentKind,
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// The column is the `x` axis and the row is the `y` axis of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Neighbouring cell in `direction`, if it lies inside a `columns` x `rows` grid.
    #[must_use]
    pub fn step(self, direction: Direction, columns: u32, rows: u32) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(self.column), self.row.checked_sub(1)),
            Direction::East => (self.column.checked_add(1), Some(self.row)),
            Direction::South => (Some(self.column), self.row.checked_add(1)),
            Direction::West => (self.column.checked_sub(1), Some(self.row)),
        };
        let cell = CellCoord::new(column?, row?);
        (cell.column < columns && cell.row < rows).then_some(cell)
    }

    /// Direction leading from `self` to an orthogonally adjacent `to`.
    #[must_use]
    pub fn direction_to(self, to: CellCoord) -> Option<Direction> {
        let column_diff = self.column.abs_diff(to.column);
        let row_diff = self.row.abs_diff(to.row);
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column > self.column {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row > self.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Occupant kinds recorded for a single cell, used for grid inspection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellStatus {
    /// Inspected cell.
    pub cell: CellCoord,
    /// Kinds of the agents placed on the cell; empty when the cell is vacant.
    pub occupants: Vec<AgentKind>,
}

/// Immutable representation of a single pathfinding agent used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Grid cell currently occupied by the agent.
    pub cell: CellCoord,
    /// Cell the agent is travelling toward.
    pub destination: CellCoord,
    /// Remaining planned hops, head first.
    pub path: Vec<CellCoord>,
    /// Consecutive ticks the agent has been blocked.
    pub waited: u32,
}

/// Read-only snapshot describing all pathfinding agents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Looks up the snapshot of a specific agent.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a traffic signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Identifier of the signal agent.
    pub id: AgentId,
    /// Cell hosting the signal.
    pub cell: CellCoord,
    /// Size class that determines the toggle interval.
    pub size: SignalSize,
    /// Light currently shown.
    pub state: SignalState,
}

/// Events broadcast by the world while advancing the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Event {
    /// Indicates that the tick counter advanced.
    TimeAdvanced {
        /// Tick counter after the advance.
        tick: u64,
    },
    /// Confirms that a pathfinding agent entered the grid.
    AgentSpawned {
        /// Identifier assigned to the new agent.
        agent: AgentId,
        /// Cell the agent starts from.
        cell: CellCoord,
        /// Cell the agent travels toward.
        destination: CellCoord,
    },
    /// Reports a freshly computed plan for an idle agent.
    PathPlanned {
        /// Agent that planned.
        agent: AgentId,
        /// Number of hops in the plan; zero when the destination is unreachable.
        hops: usize,
    },
    /// Confirms that an agent moved between two adjacent cells.
    AgentAdvanced {
        /// Agent that moved.
        agent: AgentId,
        /// Cell occupied before moving.
        from: CellCoord,
        /// Cell occupied after moving.
        to: CellCoord,
    },
    /// Reports that an agent's next hop was blocked.
    AgentWaited {
        /// Agent that waited.
        agent: AgentId,
        /// Cell the agent stayed in.
        cell: CellCoord,
        /// Consecutive waits including this one.
        waited: u32,
    },
    /// Reports that a long wait forced an agent to plan again.
    PathRecomputed {
        /// Agent that planned again.
        agent: AgentId,
        /// Number of hops in the new plan.
        hops: usize,
    },
    /// Confirms that an agent reached its destination and was retired.
    AgentArrived {
        /// Retired agent.
        agent: AgentId,
        /// Destination cell the agent reached.
        cell: CellCoord,
    },
    /// Reports that a traffic signal changed its light.
    SignalToggled {
        /// Signal that toggled.
        signal: AgentId,
        /// Cell hosting the signal.
        cell: CellCoord,
        /// Light shown after the toggle.
        state: SignalState,
    },
    /// Reports that spawns could not be satisfied this tick and remain queued.
    SpawnDeferred {
        /// Spawns still waiting for a free corner.
        pending: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn display_formats_are_stable() {
        assert_eq!(CellCoord::new(3, 7).to_string(), "(3, 7)");
        assert_eq!(AgentId::new(12).to_string(), "agent-12");
    }

    #[test]
    fn step_respects_grid_edges() {
        let corner = CellCoord::new(0, 0);
        assert_eq!(corner.step(Direction::North, 3, 3), None);
        assert_eq!(corner.step(Direction::West, 3, 3), None);
        assert_eq!(
            corner.step(Direction::East, 3, 3),
            Some(CellCoord::new(1, 0))
        );

        let far = CellCoord::new(2, 2);
        assert_eq!(far.step(Direction::East, 3, 3), None);
        assert_eq!(far.step(Direction::South, 3, 3), None);
    }

    #[test]
    fn direction_to_neighbors() {
        let origin = CellCoord::new(3, 3);
        assert_eq!(
            origin.direction_to(CellCoord::new(3, 2)),
            Some(Direction::North)
        );
        assert_eq!(
            origin.direction_to(CellCoord::new(4, 3)),
            Some(Direction::East)
        );
        assert_eq!(
            origin.direction_to(CellCoord::new(3, 4)),
            Some(Direction::South)
        );
        assert_eq!(
            origin.direction_to(CellCoord::new(2, 3)),
            Some(Direction::West)
        );
        assert_eq!(origin.direction_to(origin), None);
        assert_eq!(origin.direction_to(CellCoord::new(4, 4)), None);
    }

    #[test]
    fn arrows_forbid_only_reversal() {
        assert!(!Arrow::Right.permits(Direction::West));
        assert!(Arrow::Right.permits(Direction::North));
        assert!(Arrow::Right.permits(Direction::South));
        assert!(Arrow::Right.permits(Direction::East));

        assert!(!Arrow::Left.permits(Direction::East));
        assert!(!Arrow::Up.permits(Direction::South));
        assert!(!Arrow::Down.permits(Direction::North));
    }

    #[test]
    fn glyphs_classify_into_map_cells() {
        assert_eq!(MapCell::from_glyph('D'), MapCell::Destination);
        assert_eq!(MapCell::from_glyph('#'), MapCell::Obstacle);
        assert_eq!(
            MapCell::from_glyph('S'),
            MapCell::TrafficLight(SignalSize::Large)
        );
        assert_eq!(
            MapCell::from_glyph('s'),
            MapCell::TrafficLight(SignalSize::Small)
        );
        assert_eq!(MapCell::from_glyph('v'), MapCell::Direction(Arrow::Down));
        assert_eq!(MapCell::from_glyph('.'), MapCell::Empty);
        assert_eq!(MapCell::from_glyph('V'), MapCell::Empty);
    }

    #[test]
    fn signal_intervals_match_size() {
        assert_eq!(SignalSize::Large.interval(), 15);
        assert_eq!(SignalSize::Small.interval(), 5);
        assert_eq!(SignalState::Green.toggled(), SignalState::Red);
    }

    #[test]
    fn agent_view_orders_and_finds_snapshots() {
        let snapshot = |id| AgentSnapshot {
            id: AgentId::new(id),
            cell: CellCoord::new(0, 0),
            destination: CellCoord::new(1, 1),
            path: Vec::new(),
            waited: 0,
        };
        let view = AgentView::from_snapshots(vec![snapshot(7), snapshot(2), snapshot(4)]);

        let ids: Vec<u64> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 4, 7]);
        assert!(view.get(AgentId::new(4)).is_some());
        assert!(view.get(AgentId::new(5)).is_none());
    }

    #[test]
    fn agent_snapshot_round_trips_through_bincode() {
        let snapshot = AgentSnapshot {
            id: AgentId::new(42),
            cell: CellCoord::new(3, 1),
            destination: CellCoord::new(5, 1),
            path: vec![CellCoord::new(4, 1), CellCoord::new(5, 1)],
            waited: 2,
        };

        let bytes = bincode::serialize(&snapshot).expect("serialize");
        let restored: AgentSnapshot = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, snapshot);
    }
}
