#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Service layer owning a single traffic grid simulation.
//!
//! [`SimulationService`] wraps one [`World`] behind an explicit
//! initialise/reset lifecycle so that transports never reach for global
//! state. [`Worker`] moves a service onto a dedicated thread and serialises
//! every request in arrival order.

mod worker;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use traffic_grid_core::{AgentId, AgentSnapshot, AgentView, CellCoord, CellStatus, Event, Occupant};
use traffic_grid_world::{query, Config, InitError, MapModel, SpawnError, World};

pub use worker::{Request, Response, Worker};

/// Parameters used to build, and later rebuild, the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequest {
    /// Agents spawned at construction.
    pub population: u32,
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Map rows, one string per row.
    pub map: Vec<String>,
    /// Seed of the simulation's random source; the world default when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl InitRequest {
    /// Creates a request for a `columns` x `rows` grid over the provided map rows.
    #[must_use]
    pub fn new<I, S>(population: u32, columns: u32, rows: u32, map: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            population,
            columns,
            rows,
            map: map.into_iter().map(Into::into).collect(),
            seed: None,
        }
    }

    /// Replaces the seed of the simulation's random source.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn config(&self) -> Config {
        let config = Config::new(self.population, self.columns, self.rows);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

/// Outcome of a single simulation step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Tick counter after the step.
    pub tick: u64,
    /// Live pathfinding agents ordered by identifier.
    pub agents: Vec<AgentSnapshot>,
    /// Number of live pathfinding agents.
    pub active_agents: usize,
    /// Agents retired at their destination since initialisation.
    pub completed: u64,
    /// Events emitted while stepping.
    pub events: Vec<Event>,
}

/// Reasons a service call may fail.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The call requires an initialised simulation.
    #[error("the simulation has not been initialised")]
    NotInitialized,
    /// The simulation could not be built.
    #[error("failed to initialise the simulation")]
    Init(#[from] InitError),
    /// An agent could not be spawned.
    #[error("failed to spawn an agent")]
    Spawn(#[from] SpawnError),
    /// The worker thread is no longer running.
    #[error("the simulation worker has stopped")]
    WorkerGone,
}

/// Owner of the single simulation exposed to external callers.
#[derive(Debug, Default)]
pub struct SimulationService {
    request: Option<InitRequest>,
    world: Option<World>,
}

impl SimulationService {
    /// Creates a service without a simulation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fresh simulation, replacing any previous one.
    ///
    /// The previous simulation is kept when construction fails.
    pub fn initialize(&mut self, request: InitRequest) -> Result<(), ServiceError> {
        let world = build(&request)?;
        info!(
            population = request.population,
            columns = request.columns,
            rows = request.rows,
            "simulation initialised"
        );
        self.world = Some(world);
        self.request = Some(request);
        Ok(())
    }

    /// Rebuilds the simulation from the most recent initialisation request.
    pub fn reset(&mut self) -> Result<(), ServiceError> {
        let request = self.request.as_ref().ok_or(ServiceError::NotInitialized)?;
        self.world = Some(build(request)?);
        info!("simulation reset");
        Ok(())
    }

    /// Reports whether a simulation is available.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) -> Result<StepReport, ServiceError> {
        let world = self.world.as_mut().ok_or(ServiceError::NotInitialized)?;
        let mut events = Vec::new();
        world.step(&mut events);

        let report = StepReport {
            tick: query::tick(world),
            agents: query::agent_view(world).into_vec(),
            active_agents: query::population(world),
            completed: query::completed(world),
            events,
        };
        debug!(
            tick = report.tick,
            active = report.active_agents,
            completed = report.completed,
            "simulation stepped"
        );
        Ok(report)
    }

    /// Live pathfinding agents ordered by identifier.
    pub fn agents(&self) -> Result<AgentView, ServiceError> {
        Ok(query::agent_view(self.world()?))
    }

    /// Spawns one agent on a free corner.
    pub fn spawn_agent(&mut self) -> Result<AgentId, ServiceError> {
        let world = self.world.as_mut().ok_or(ServiceError::NotInitialized)?;
        let mut events = Vec::new();
        let id = world.spawn_agent(&mut events)?;
        info!(agent = %id, "agent spawned on request");
        Ok(id)
    }

    /// Agents placed on the cell at column `x` and row `y`.
    pub fn cell_contents(&self, x: u32, y: u32) -> Result<Vec<Occupant>, ServiceError> {
        Ok(query::cell_contents(self.world()?, CellCoord::new(x, y)))
    }

    /// Every grid cell with the kinds of its occupants.
    pub fn grid_status(&self) -> Result<Vec<CellStatus>, ServiceError> {
        Ok(query::grid_status(self.world()?))
    }

    /// Map rows the simulation was built from.
    pub fn raw_map(&self) -> Result<Vec<String>, ServiceError> {
        Ok(query::raw_map(self.world()?).to_vec())
    }

    /// Dispatches a queued request to the matching operation.
    pub fn handle(&mut self, request: Request) -> Result<Response, ServiceError> {
        match request {
            Request::Initialize(init) => self.initialize(init).map(|()| Response::Initialized),
            Request::Reset => self.reset().map(|()| Response::Reset),
            Request::Step => self.step().map(Response::Stepped),
            Request::Agents => self.agents().map(Response::Agents),
            Request::SpawnAgent => self.spawn_agent().map(Response::Spawned),
            Request::CellContents { x, y } => self.cell_contents(x, y).map(Response::CellContents),
            Request::GridStatus => self.grid_status().map(Response::GridStatus),
            Request::RawMap => self.raw_map().map(Response::RawMap),
        }
    }

    fn world(&self) -> Result<&World, ServiceError> {
        self.world.as_ref().ok_or(ServiceError::NotInitialized)
    }
}

fn build(request: &InitRequest) -> Result<World, InitError> {
    let map = MapModel::from_rows(request.map.iter().map(String::as_str));
    World::new(request.config(), map)
}
