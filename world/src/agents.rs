//! Closed set of agent variants and their per-tick behaviour.

use std::collections::VecDeque;

use tracing::{debug, warn};
use traffic_grid_core::{
    AgentId, AgentKind, AgentSnapshot, CellCoord, Event, SignalSize, SignalSnapshot, SignalState,
};
use traffic_grid_system_pathfinding::Pathfinder;

use crate::{grid::GridWorld, map::MapModel};

/// Every agent the world activates once per tick.
#[derive(Clone, Debug)]
pub(crate) enum Agent {
    Pathfinding(PathfindingAgent),
    TrafficLight(TrafficLight),
    Obstacle(Obstacle),
}

impl Agent {
    pub(crate) fn kind(&self) -> AgentKind {
        match self {
            Self::Pathfinding(_) => AgentKind::Pathfinding,
            Self::TrafficLight(_) => AgentKind::TrafficLight,
            Self::Obstacle(_) => AgentKind::Obstacle,
        }
    }
}

/// Shared state a pathfinding agent consults while acting.
pub(crate) struct Navigation<'a> {
    pub(crate) grid: &'a mut GridWorld,
    pub(crate) map: &'a MapModel,
    pub(crate) pathfinder: &'a mut Pathfinder,
    pub(crate) wait_limit: u32,
}

impl Navigation<'_> {
    fn plan(&mut self, from: CellCoord, destination: CellCoord) -> VecDeque<CellCoord> {
        let map = self.map;
        let grid = &*self.grid;
        self.pathfinder
            .compute_path(
                from,
                destination,
                grid.columns(),
                grid.rows(),
                |cell| map.classify(cell),
                |cell| grid.has_obstacle(cell),
            )
            .into_iter()
            .skip(1)
            .collect()
    }
}

/// Agent travelling toward its destination one cell per tick.
#[derive(Clone, Debug)]
pub(crate) struct PathfindingAgent {
    id: AgentId,
    destination: CellCoord,
    path: VecDeque<CellCoord>,
    waited: u32,
}

impl PathfindingAgent {
    pub(crate) fn new(id: AgentId, destination: CellCoord) -> Self {
        Self {
            id,
            destination,
            path: VecDeque::new(),
            waited: 0,
        }
    }

    pub(crate) fn destination(&self) -> CellCoord {
        self.destination
    }

    /// Plans when idle, then either waits behind a blocked hop or advances.
    ///
    /// Arrival is left to the world's end-of-tick sweep.
    pub(crate) fn step(&mut self, navigation: &mut Navigation<'_>, out_events: &mut Vec<Event>) {
        let Some(cell) = navigation.grid.position(self.id) else {
            return;
        };

        if self.path.is_empty() {
            self.path = navigation.plan(cell, self.destination);
            debug!(agent = %self.id, hops = self.path.len(), "planned path");
            out_events.push(Event::PathPlanned {
                agent: self.id,
                hops: self.path.len(),
            });
        }

        let Some(next) = self.path.front().copied() else {
            return;
        };

        if navigation.grid.blocks(next, self.id) {
            self.waited = self.waited.saturating_add(1);
            out_events.push(Event::AgentWaited {
                agent: self.id,
                cell,
                waited: self.waited,
            });

            if self.waited > navigation.wait_limit {
                self.path = navigation.plan(cell, self.destination);
                self.waited = 0;
                debug!(agent = %self.id, hops = self.path.len(), "recomputed path after waiting");
                out_events.push(Event::PathRecomputed {
                    agent: self.id,
                    hops: self.path.len(),
                });
            }
            return;
        }

        match navigation.grid.move_to(self.id, next) {
            Ok(from) => {
                self.waited = 0;
                let _ = self.path.pop_front();
                out_events.push(Event::AgentAdvanced {
                    agent: self.id,
                    from,
                    to: next,
                });
            }
            Err(error) => {
                warn!(agent = %self.id, %error, "discarding unusable path");
                self.path.clear();
            }
        }
    }

    pub(crate) fn snapshot(&self, cell: CellCoord) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            cell,
            destination: self.destination,
            path: self.path.iter().copied().collect(),
            waited: self.waited,
        }
    }
}

/// Signal toggling between green and red at a fixed interval.
#[derive(Clone, Debug)]
pub(crate) struct TrafficLight {
    id: AgentId,
    size: SignalSize,
    state: SignalState,
    elapsed: u32,
}

impl TrafficLight {
    pub(crate) fn new(id: AgentId, size: SignalSize) -> Self {
        Self {
            id,
            size,
            state: SignalState::Green,
            elapsed: 0,
        }
    }

    pub(crate) fn step(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed < self.size.interval() {
            return;
        }

        self.state = self.state.toggled();
        self.elapsed = 0;
        out_events.push(Event::SignalToggled {
            signal: self.id,
            cell,
            state: self.state,
        });
    }

    pub(crate) fn snapshot(&self, cell: CellCoord) -> SignalSnapshot {
        SignalSnapshot {
            id: self.id,
            cell,
            size: self.size,
            state: self.state,
        }
    }
}

/// Static blocker; its position is held by the grid.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Obstacle;

impl Obstacle {
    pub(crate) fn step(&self) {}
}
