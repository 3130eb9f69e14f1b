#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the traffic grid.
//!
//! The [`World`] owns the occupancy grid, the classified map, every live agent
//! and the random source used for activation order and spawning. It only
//! advances when [`World::step`] is called; read-only access goes through the
//! [`query`] module.

mod agents;
mod grid;
mod map;

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use traffic_grid_core::{AgentId, AgentKind, CellCoord, Event};
use traffic_grid_system_pathfinding::Pathfinder;
use traffic_grid_system_spawning::{self as spawning, SelectionError, Spawning};

use crate::agents::{Agent, Navigation, Obstacle, PathfindingAgent, TrafficLight};

pub use grid::{GridError, GridWorld, MAX_GRID_CELLS};
pub use map::MapModel;

const DEFAULT_POPULATION: u32 = 4;
const DEFAULT_COLUMNS: u32 = 28;
const DEFAULT_ROWS: u32 = 28;
const DEFAULT_SEED: u64 = 0x5eed_7a4f_f1c0_0001;
const DEFAULT_SPAWN_INTERVAL: u64 = 5;
const DEFAULT_WAIT_LIMIT: u32 = 5;

/// Parameters controlling the construction and evolution of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    population: u32,
    columns: u32,
    rows: u32,
    seed: u64,
    spawn_interval: u64,
    wait_limit: u32,
    spawn_attempts: u32,
}

impl Config {
    /// Creates a configuration for a `columns` x `rows` grid populated by
    /// `population` agents, using defaults for every other parameter.
    #[must_use]
    pub fn new(population: u32, columns: u32, rows: u32) -> Self {
        Self {
            population,
            columns,
            rows,
            ..Self::default()
        }
    }

    /// Replaces the number of agents spawned during construction.
    #[must_use]
    pub const fn with_population(mut self, population: u32) -> Self {
        self.population = population;
        self
    }

    /// Replaces the grid dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, columns: u32, rows: u32) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Replaces the seed of the world's random source.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replaces the number of ticks between scheduled spawns. Zero disables them.
    #[must_use]
    pub const fn with_spawn_interval(mut self, spawn_interval: u64) -> Self {
        self.spawn_interval = spawn_interval;
        self
    }

    /// Replaces the number of consecutive waits tolerated before replanning.
    #[must_use]
    pub const fn with_wait_limit(mut self, wait_limit: u32) -> Self {
        self.wait_limit = wait_limit;
        self
    }

    /// Replaces the number of corner draws attempted per spawn.
    #[must_use]
    pub const fn with_spawn_attempts(mut self, spawn_attempts: u32) -> Self {
        self.spawn_attempts = spawn_attempts;
        self
    }

    /// Agents spawned during construction.
    #[must_use]
    pub const fn population(&self) -> u32 {
        self.population
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Seed of the world's random source.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Ticks between scheduled spawns.
    #[must_use]
    pub const fn spawn_interval(&self) -> u64 {
        self.spawn_interval
    }

    /// Consecutive waits tolerated before replanning.
    #[must_use]
    pub const fn wait_limit(&self) -> u32 {
        self.wait_limit
    }

    /// Corner draws attempted per spawn.
    #[must_use]
    pub const fn spawn_attempts(&self) -> u32 {
        self.spawn_attempts
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            seed: DEFAULT_SEED,
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            wait_limit: DEFAULT_WAIT_LIMIT,
            spawn_attempts: spawning::DEFAULT_SPAWN_ATTEMPTS,
        }
    }
}

/// Reasons a pathfinding agent could not be added to the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// The map offers no destination inside the grid.
    #[error("the map has no destination cells")]
    NoDestination,
    /// Every corner draw was rejected, either because the corner was
    /// occupied or because it coincided with the drawn destination. A map
    /// whose every destination is a corner of a grid too small to offer
    /// another corner can never spawn.
    #[error("no free spawn cell found after {attempts} attempts")]
    NoFreeSpawnCell {
        /// Number of draws performed.
        attempts: u32,
    },
    /// The requested start cell lies outside the grid.
    #[error("spawn cell {cell} lies outside the grid")]
    OutOfBounds {
        /// Rejected cell.
        cell: CellCoord,
    },
    /// The requested destination is not one of the map's destinations.
    #[error("{cell} is not a destination")]
    UnknownDestination {
        /// Rejected destination.
        cell: CellCoord,
    },
    /// The grid rejected the placement.
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl From<SelectionError> for SpawnError {
    fn from(error: SelectionError) -> Self {
        match error {
            SelectionError::NoDestination => Self::NoDestination,
            SelectionError::NoCorners => Self::NoFreeSpawnCell { attempts: 0 },
            SelectionError::NoFreeCorner { attempts } => Self::NoFreeSpawnCell { attempts },
        }
    }
}

/// Reasons a [`World`] could not be constructed.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InitError {
    /// No destination of the map lies inside the configured grid.
    #[error("the map has no destination inside a {columns}x{rows} grid")]
    InvalidMap {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// The configured grid has no cells.
    #[error("the grid must have at least one column and one row")]
    EmptyGrid,
    /// The configured grid holds more than [`MAX_GRID_CELLS`] cells.
    #[error("a {columns}x{rows} grid exceeds the cell limit")]
    GridTooLarge {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// The initial population could not be spawned.
    #[error("failed to spawn the initial population")]
    Spawn(#[source] SpawnError),
    /// A map feature could not be placed.
    #[error("failed to place a map feature")]
    Grid(#[from] GridError),
}

/// Represents the authoritative traffic grid simulation.
#[derive(Debug)]
pub struct World {
    config: Config,
    map: MapModel,
    grid: GridWorld,
    destinations: Vec<CellCoord>,
    agents: BTreeMap<AgentId, Agent>,
    pathfinder: Pathfinder,
    spawning: Spawning,
    rng: ChaCha8Rng,
    tick: u64,
    next_id: u64,
    pending_spawns: u32,
    completed: u64,
}

impl World {
    /// Builds a world from the map, placing its obstacles and traffic lights and
    /// spawning the configured population at the grid corners.
    pub fn new(config: Config, map: MapModel) -> Result<Self, InitError> {
        if config.columns == 0 || config.rows == 0 {
            return Err(InitError::EmptyGrid);
        }
        let cells = u64::from(config.columns).checked_mul(u64::from(config.rows));
        if cells.map_or(true, |cells| cells > MAX_GRID_CELLS) {
            return Err(InitError::GridTooLarge {
                columns: config.columns,
                rows: config.rows,
            });
        }

        let grid = GridWorld::new(config.columns, config.rows)?;
        let destinations: Vec<CellCoord> = map
            .destinations()
            .iter()
            .copied()
            .filter(|cell| {
                let inside = grid.in_bounds(*cell);
                if !inside {
                    warn!(%cell, "dropping destination outside the grid");
                }
                inside
            })
            .collect();
        if destinations.is_empty() {
            return Err(InitError::InvalidMap {
                columns: config.columns,
                rows: config.rows,
            });
        }

        let mut world = Self {
            config,
            grid,
            destinations,
            agents: BTreeMap::new(),
            pathfinder: Pathfinder::default(),
            spawning: Spawning::new(spawning::Config::new(config.spawn_attempts)),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tick: 0,
            next_id: 0,
            pending_spawns: 0,
            completed: 0,
            map,
        };
        world.place_features()?;

        let mut events = Vec::new();
        for _ in 0..config.population {
            let _ = world.spawn_agent(&mut events).map_err(InitError::Spawn)?;
        }

        info!(
            columns = config.columns,
            rows = config.rows,
            population = config.population,
            seed = config.seed,
            "world initialised"
        );
        Ok(world)
    }

    fn place_features(&mut self) -> Result<(), GridError> {
        let obstacles = self.map.obstacles().to_vec();
        for cell in obstacles {
            if !self.grid.in_bounds(cell) {
                warn!(%cell, "dropping obstacle outside the grid");
                continue;
            }
            let id = self.allocate_id();
            self.grid.place(id, AgentKind::Obstacle, cell)?;
            let _ = self.agents.insert(id, Agent::Obstacle(Obstacle));
        }

        let signals = self.map.signals().to_vec();
        for (cell, size) in signals {
            if !self.grid.in_bounds(cell) {
                warn!(%cell, "dropping traffic light outside the grid");
                continue;
            }
            let id = self.allocate_id();
            self.grid.place(id, AgentKind::TrafficLight, cell)?;
            let _ = self
                .agents
                .insert(id, Agent::TrafficLight(TrafficLight::new(id, size)));
        }
        Ok(())
    }

    /// Advances the simulation by a single tick.
    ///
    /// Every live agent is activated once in an order shuffled by the world's
    /// random source. Afterwards scheduled spawns are queued, agents standing
    /// on their destination are retired and replaced, and queued spawns that
    /// find no free corner are kept for later ticks.
    pub fn step(&mut self, out_events: &mut Vec<Event>) {
        let mut order: Vec<AgentId> = self.agents.keys().copied().collect();
        order.shuffle(&mut self.rng);
        for id in order {
            self.activate(id, out_events);
        }

        self.tick = self.tick.saturating_add(1);
        out_events.push(Event::TimeAdvanced { tick: self.tick });

        let interval = self.config.spawn_interval;
        if interval != 0 && self.tick % interval == 0 {
            self.pending_spawns = self.pending_spawns.saturating_add(1);
        }
        self.flush_pending_spawns(out_events);

        self.retire_arrivals(out_events);
        self.flush_pending_spawns(out_events);
    }

    fn activate(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };

        match agent {
            Agent::Pathfinding(agent) => {
                let mut navigation = Navigation {
                    grid: &mut self.grid,
                    map: &self.map,
                    pathfinder: &mut self.pathfinder,
                    wait_limit: self.config.wait_limit,
                };
                agent.step(&mut navigation, out_events);
            }
            Agent::TrafficLight(light) => {
                if let Some(cell) = self.grid.position(id) {
                    light.step(cell, out_events);
                }
            }
            Agent::Obstacle(obstacle) => obstacle.step(),
        }
    }

    fn retire_arrivals(&mut self, out_events: &mut Vec<Event>) {
        let arrived: Vec<(AgentId, CellCoord)> = self
            .agents
            .iter()
            .filter_map(|(id, agent)| match agent {
                Agent::Pathfinding(agent) => self
                    .grid
                    .position(*id)
                    .filter(|cell| *cell == agent.destination())
                    .map(|cell| (*id, cell)),
                Agent::TrafficLight(_) | Agent::Obstacle(_) => None,
            })
            .collect();

        for (id, cell) in arrived {
            let _ = self.agents.remove(&id);
            let _ = self.grid.remove(id);
            self.completed = self.completed.saturating_add(1);
            self.pending_spawns = self.pending_spawns.saturating_add(1);
            info!(agent = %id, %cell, tick = self.tick, "agent arrived");
            out_events.push(Event::AgentArrived { agent: id, cell });
        }
    }

    fn flush_pending_spawns(&mut self, out_events: &mut Vec<Event>) {
        while self.pending_spawns > 0 {
            match self.spawn_agent(out_events) {
                Ok(_) => self.pending_spawns -= 1,
                Err(error) => {
                    warn!(%error, pending = self.pending_spawns, "deferring spawn");
                    out_events.push(Event::SpawnDeferred {
                        pending: self.pending_spawns,
                    });
                    return;
                }
            }
        }
    }

    /// Spawns a pathfinding agent on a free grid corner with a random destination.
    pub fn spawn_agent(&mut self, out_events: &mut Vec<Event>) -> Result<AgentId, SpawnError> {
        if self.destinations.is_empty() {
            return Err(SpawnError::NoDestination);
        }

        let grid = &self.grid;
        let site = self.spawning.select(
            &mut self.rng,
            grid.columns(),
            grid.rows(),
            &self.destinations,
            |cell| grid.is_free(cell),
        )?;
        self.insert_pathfinder(site.cell, site.destination, out_events)
    }

    /// Spawns a pathfinding agent on `cell` heading for `destination`.
    pub fn spawn_agent_at(
        &mut self,
        cell: CellCoord,
        destination: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<AgentId, SpawnError> {
        if !self.grid.in_bounds(cell) {
            return Err(SpawnError::OutOfBounds { cell });
        }
        if !self.destinations.contains(&destination) {
            return Err(SpawnError::UnknownDestination { cell: destination });
        }
        self.insert_pathfinder(cell, destination, out_events)
    }

    fn insert_pathfinder(
        &mut self,
        cell: CellCoord,
        destination: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<AgentId, SpawnError> {
        let id = self.allocate_id();
        self.grid.place(id, AgentKind::Pathfinding, cell)?;
        let _ = self
            .agents
            .insert(id, Agent::Pathfinding(PathfindingAgent::new(id, destination)));

        debug!(agent = %id, %cell, %destination, "agent spawned");
        out_events.push(Event::AgentSpawned {
            agent: id,
            cell,
            destination,
        });
        Ok(id)
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Agent, Config, World};
    use traffic_grid_core::{
        AgentKind, AgentSnapshot, AgentView, CellCoord, CellStatus, Occupant, SignalSnapshot,
    };

    /// Captures the pathfinding agents ordered by identifier.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots: Vec<AgentSnapshot> = world
            .agents
            .iter()
            .filter_map(|(id, agent)| match agent {
                Agent::Pathfinding(agent) => {
                    world.grid.position(*id).map(|cell| agent.snapshot(cell))
                }
                Agent::TrafficLight(_) | Agent::Obstacle(_) => None,
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Captures every placed traffic light ordered by identifier.
    #[must_use]
    pub fn signal_view(world: &World) -> Vec<SignalSnapshot> {
        world
            .agents
            .iter()
            .filter_map(|(id, agent)| match agent {
                Agent::TrafficLight(light) => {
                    world.grid.position(*id).map(|cell| light.snapshot(cell))
                }
                Agent::Pathfinding(_) | Agent::Obstacle(_) => None,
            })
            .collect()
    }

    /// Agents placed on the cell, blocking occupant first.
    #[must_use]
    pub fn cell_contents(world: &World, cell: CellCoord) -> Vec<Occupant> {
        world.grid.contents(cell)
    }

    /// Every grid cell with the kinds of its occupants, in row-major order.
    #[must_use]
    pub fn grid_status(world: &World) -> Vec<CellStatus> {
        let (columns, rows) = (world.grid.columns(), world.grid.rows());
        (0..rows)
            .flat_map(|row| (0..columns).map(move |column| CellCoord::new(column, row)))
            .map(|cell| CellStatus {
                cell,
                occupants: world
                    .grid
                    .contents(cell)
                    .into_iter()
                    .map(|occupant| occupant.kind)
                    .collect(),
            })
            .collect()
    }

    /// Map rows exactly as supplied at construction.
    #[must_use]
    pub fn raw_map(world: &World) -> &[String] {
        world.map.raw_rows()
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Number of live pathfinding agents.
    #[must_use]
    pub fn population(world: &World) -> usize {
        world
            .agents
            .values()
            .filter(|agent| agent.kind() == AgentKind::Pathfinding)
            .count()
    }

    /// Number of agents retired at their destination so far.
    #[must_use]
    pub fn completed(world: &World) -> u64 {
        world.completed
    }

    /// Spawns queued but not yet placed.
    #[must_use]
    pub fn pending_spawns(world: &World) -> u32 {
        world.pending_spawns
    }

    /// Number of columns and rows of the grid.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.grid.columns(), world.grid.rows())
    }
}
