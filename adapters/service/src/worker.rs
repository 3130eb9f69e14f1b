//! Dedicated thread serialising access to a [`SimulationService`].

use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use tracing::debug;
use traffic_grid_core::{AgentId, AgentView, CellStatus, Occupant};

use crate::{InitRequest, ServiceError, SimulationService, StepReport};

/// Operations accepted by the worker queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Builds a fresh simulation.
    Initialize(InitRequest),
    /// Rebuilds the simulation from the last initialisation request.
    Reset,
    /// Advances the simulation by one tick.
    Step,
    /// Lists the live pathfinding agents.
    Agents,
    /// Spawns one agent on a free corner.
    SpawnAgent,
    /// Lists the agents placed on a cell.
    CellContents {
        /// Column of the cell.
        x: u32,
        /// Row of the cell.
        y: u32,
    },
    /// Lists every cell with its occupant kinds.
    GridStatus,
    /// Returns the map rows.
    RawMap,
}

/// Successful replies produced by the worker queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// The simulation was built.
    Initialized,
    /// The simulation was rebuilt.
    Reset,
    /// The simulation advanced by one tick.
    Stepped(StepReport),
    /// Live pathfinding agents.
    Agents(AgentView),
    /// Identifier of the spawned agent.
    Spawned(AgentId),
    /// Occupants of the requested cell.
    CellContents(Vec<Occupant>),
    /// Occupant kinds of every cell.
    GridStatus(Vec<CellStatus>),
    /// Map rows.
    RawMap(Vec<String>),
}

struct Envelope {
    request: Request,
    reply: mpsc::Sender<Result<Response, ServiceError>>,
}

/// Handle to a thread that owns a [`SimulationService`] and processes
/// requests strictly in arrival order.
///
/// Dropping the handle closes the queue; the thread exits once the
/// requests already queued have been answered.
#[derive(Debug)]
pub struct Worker {
    requests: mpsc::Sender<Envelope>,
    handle: JoinHandle<SimulationService>,
}

impl Worker {
    /// Moves the service onto a new worker thread.
    #[must_use]
    pub fn spawn(mut service: SimulationService) -> Self {
        let (requests, queue) = mpsc::channel::<Envelope>();
        let handle = thread::spawn(move || {
            for Envelope { request, reply } in queue {
                debug!(?request, "processing request");
                let _ = reply.send(service.handle(request));
            }
            service
        });
        Self { requests, handle }
    }

    /// Queues a request and blocks until the worker answers it.
    pub fn call(&self, request: Request) -> Result<Response, ServiceError> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(Envelope { request, reply })
            .map_err(|_| ServiceError::WorkerGone)?;
        response.recv().map_err(|_| ServiceError::WorkerGone)?
    }

    /// Closes the queue and returns the service once every queued request
    /// has been processed.
    pub fn shutdown(self) -> Result<SimulationService, ServiceError> {
        let Self { requests, handle } = self;
        drop(requests);
        handle.join().map_err(|_| ServiceError::WorkerGone)
    }
}
