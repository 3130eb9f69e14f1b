use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use traffic_grid_core::{AgentSnapshot, Event, SignalSnapshot};
use traffic_grid_world::{query, Config, MapModel, World};

const TICKS: u64 = 120;

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(0x5eed);
    let second = replay(0x5eed);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.tick, TICKS);
}

#[test]
fn replay_records_every_lifecycle_stage() {
    let outcome = replay(42);

    assert!(outcome
        .events
        .iter()
        .any(|event| matches!(event, Event::PathPlanned { .. })));
    assert!(outcome
        .events
        .iter()
        .any(|event| matches!(event, Event::AgentAdvanced { .. })));
    assert!(outcome
        .events
        .iter()
        .any(|event| matches!(event, Event::SignalToggled { .. })));
    assert_eq!(
        outcome
            .events
            .iter()
            .filter(|event| matches!(event, Event::TimeAdvanced { .. }))
            .count() as u64,
        TICKS
    );
}

fn replay(seed: u64) -> ReplayOutcome {
    let config = Config::new(4, 12, 10).with_seed(seed);
    let mut world = World::new(config, scripted_map()).expect("valid world");
    let mut events = Vec::new();

    for _ in 0..TICKS {
        world.step(&mut events);
    }

    ReplayOutcome {
        agents: query::agent_view(&world).into_vec(),
        signals: query::signal_view(&world),
        events,
        tick: query::tick(&world),
        completed: query::completed(&world),
    }
}

fn scripted_map() -> MapModel {
    MapModel::from_rows([
        "....>>>>....",
        "..#.....#...",
        "..#..S..#...",
        "....D.......",
        ".....##.....",
        "v....##....^",
        "v..s.......^",
        "......D.....",
        "..#.....#...",
        "....<<<<....",
    ])
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    agents: Vec<AgentSnapshot>,
    signals: Vec<SignalSnapshot>,
    events: Vec<Event>,
    tick: u64,
    completed: u64,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
