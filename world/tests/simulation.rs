use std::collections::HashSet;

use traffic_grid_core::{AgentId, CellCoord, Event, SignalState};
use traffic_grid_world::{query, Config, InitError, MapModel, SpawnError, World};

fn open_map(columns: usize, rows: usize, destinations: &[(usize, usize)]) -> MapModel {
    let mut grid = vec![vec!['.'; columns]; rows];
    for &(column, row) in destinations {
        grid[row][column] = 'D';
    }
    MapModel::from_rows(grid.into_iter().map(|row| row.into_iter().collect::<String>()))
}

fn run(world: &mut World, ticks: u64) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        world.step(&mut events);
    }
    events
}

#[test]
fn blocked_agent_recomputes_after_six_waits() {
    let map = MapModel::from_rows(["....D", "####.", "D#..."]);
    let mut world = World::new(Config::new(0, 5, 3).with_spawn_interval(0), map)
        .expect("valid world");
    let mut events = Vec::new();
    let walker = world
        .spawn_agent_at(CellCoord::new(0, 0), CellCoord::new(4, 0), &mut events)
        .expect("free cell");
    let stuck = world
        .spawn_agent_at(CellCoord::new(1, 0), CellCoord::new(0, 2), &mut events)
        .expect("free cell");

    let events = run(&mut world, 5);
    let view = query::agent_view(&world);
    assert_eq!(view.get(walker).map(|agent| agent.waited), Some(5));
    assert_eq!(
        view.get(stuck).map(|agent| agent.path.len()),
        Some(0),
        "enclosed destination yields no plan"
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::PathRecomputed { .. })));

    let events = run(&mut world, 1);
    assert!(events.contains(&Event::AgentWaited {
        agent: walker,
        cell: CellCoord::new(0, 0),
        waited: 6,
    }));
    assert!(events.contains(&Event::PathRecomputed {
        agent: walker,
        hops: 4,
    }));

    let view = query::agent_view(&world);
    let snapshot = view.get(walker).expect("walker is still live");
    assert_eq!(snapshot.waited, 0, "counter resets after replanning");
    assert_eq!(snapshot.cell, CellCoord::new(0, 0));
    assert_eq!(snapshot.path.first(), Some(&CellCoord::new(1, 0)));
}

#[test]
fn arrived_agents_are_retired_and_replaced() {
    let map = open_map(28, 28, &[(5, 0), (20, 27)]);
    let config = Config::new(0, 28, 28).with_spawn_interval(0).with_seed(7);
    let mut world = World::new(config, map).expect("valid world");
    let mut events = Vec::new();
    let first = world
        .spawn_agent_at(CellCoord::new(0, 0), CellCoord::new(5, 0), &mut events)
        .expect("free corner");
    let second = world
        .spawn_agent_at(CellCoord::new(27, 27), CellCoord::new(20, 27), &mut events)
        .expect("free corner");

    let mut retired: HashSet<AgentId> = HashSet::new();
    for _ in 0..150 {
        let mut events = Vec::new();
        world.step(&mut events);

        for event in &events {
            match event {
                Event::AgentArrived { agent, .. } => {
                    assert!(retired.insert(*agent), "{agent} retired twice");
                }
                Event::AgentSpawned { agent, .. } => {
                    assert!(!retired.contains(agent), "{agent} reused after retirement");
                }
                _ => {}
            }
        }

        let live = query::agent_view(&world);
        assert!(live.iter().all(|agent| !retired.contains(&agent.id)));
        assert_eq!(
            query::population(&world) + query::pending_spawns(&world) as usize,
            2,
            "every arrival is matched by a replacement"
        );
    }

    assert!(retired.contains(&first), "short trip along the top row completes");
    assert!(retired.contains(&second), "short trip along the bottom row completes");
    assert_eq!(query::completed(&world), retired.len() as u64);
}

#[test]
fn scheduled_spawns_grow_the_population() {
    let map = open_map(28, 28, &[(10, 10), (20, 5), (5, 20)]);
    let mut world = World::new(Config::new(4, 28, 28).with_seed(11), map).expect("valid world");

    for tick in 1..=40u64 {
        let _ = run(&mut world, 1);
        assert_eq!(query::tick(&world), tick);
        assert_eq!(
            query::population(&world) + query::pending_spawns(&world) as usize,
            4 + (tick / 5) as usize
        );
    }
}

#[test]
fn small_light_cycles_every_five_ticks() {
    let mut world = World::new(Config::new(0, 3, 1), MapModel::from_text("sD.")).expect("valid world");

    let mut states = Vec::new();
    for _ in 0..15 {
        let signals = query::signal_view(&world);
        assert_eq!(signals.len(), 1);
        states.push(signals[0].state);
        let _ = run(&mut world, 1);
    }

    let expected: Vec<SignalState> = (0..15)
        .map(|tick| {
            if (5..10).contains(&tick) {
                SignalState::Red
            } else {
                SignalState::Green
            }
        })
        .collect();
    assert_eq!(states, expected);
}

#[test]
fn red_lights_never_block_movement() {
    let map = MapModel::from_text("Ds..");
    let mut world = World::new(Config::new(0, 4, 1).with_spawn_interval(0), map)
        .expect("valid world");
    let _ = run(&mut world, 5);
    assert_eq!(query::signal_view(&world)[0].state, SignalState::Red);

    let mut events = Vec::new();
    let agent = world
        .spawn_agent_at(CellCoord::new(3, 0), CellCoord::new(0, 0), &mut events)
        .expect("free cell");
    let events = run(&mut world, 3);

    assert!(events.contains(&Event::AgentAdvanced {
        agent,
        from: CellCoord::new(2, 0),
        to: CellCoord::new(1, 0),
    }));
    assert!(events.contains(&Event::AgentArrived {
        agent,
        cell: CellCoord::new(0, 0),
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::AgentWaited { .. })));
    assert_eq!(query::signal_view(&world)[0].state, SignalState::Red);
}

#[test]
fn corner_to_corner_trip_on_reference_grid() {
    let map = open_map(28, 28, &[(27, 27)]);
    let mut world = World::new(Config::new(0, 28, 28).with_spawn_interval(0), map)
        .expect("valid world");
    let mut events = Vec::new();
    let traveller = world
        .spawn_agent_at(CellCoord::new(0, 0), CellCoord::new(27, 27), &mut events)
        .expect("free corner");

    let mut arrived_at = None;
    for _ in 0..54 {
        let events = run(&mut world, 1);
        if events.contains(&Event::AgentArrived {
            agent: traveller,
            cell: CellCoord::new(27, 27),
        }) {
            arrived_at = Some(query::tick(&world));
            break;
        }
    }

    assert_eq!(arrived_at, Some(54), "shortest trip takes 54 moves");
    assert_eq!(query::completed(&world), 1);
    assert_eq!(query::population(&world), 1, "a replacement enters the grid");

    let view = query::agent_view(&world);
    let replacement = view.iter().next().expect("replacement agent");
    assert_ne!(replacement.id, traveller);
    assert_ne!(replacement.cell, CellCoord::new(27, 27));
    assert_eq!(replacement.destination, CellCoord::new(27, 27));
}

#[test]
fn construction_requires_a_destination() {
    let result = World::new(Config::new(1, 3, 3), open_map(3, 3, &[]));

    assert_eq!(
        result.err(),
        Some(InitError::InvalidMap {
            columns: 3,
            rows: 3
        })
    );
}

#[test]
fn spawning_fails_once_corners_are_exhausted() {
    let mut world = World::new(Config::new(1, 2, 1), MapModel::from_text("D.")).expect("valid world");
    let mut events = Vec::new();

    assert_eq!(
        world.spawn_agent(&mut events),
        Err(SpawnError::NoFreeSpawnCell { attempts: 64 })
    );
    assert!(events.is_empty());
    assert_eq!(query::population(&world), 1);
}

#[test]
fn raw_map_is_returned_verbatim() {
    let rows = ["v<<D", "v##^", ">>>^"];
    let world = World::new(Config::new(0, 4, 3), MapModel::from_rows(rows)).expect("valid world");

    assert_eq!(query::raw_map(&world), &rows.map(String::from));
    assert_eq!(query::dimensions(&world), (4, 3));
}
