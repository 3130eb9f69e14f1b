use traffic_grid_core::{AgentKind, CellCoord};
use traffic_grid_service::{
    InitRequest, Request, Response, ServiceError, SimulationService, Worker,
};

fn reference_request() -> InitRequest {
    InitRequest::new(
        3,
        6,
        5,
        ["......", ".#..D.", "..s...", ".D..#.", "......"],
    )
    .with_seed(99)
}

#[test]
fn worker_rejects_calls_before_initialisation() {
    let worker = Worker::spawn(SimulationService::new());

    assert_eq!(worker.call(Request::Step), Err(ServiceError::NotInitialized));
    assert_eq!(worker.call(Request::Agents), Err(ServiceError::NotInitialized));

    let service = worker.shutdown().expect("worker exits cleanly");
    assert!(!service.is_initialized());
}

#[test]
fn worker_processes_requests_in_arrival_order() {
    let worker = Worker::spawn(SimulationService::new());

    assert_eq!(
        worker.call(Request::Initialize(reference_request())),
        Ok(Response::Initialized)
    );
    for expected_tick in 1..=4 {
        match worker.call(Request::Step) {
            Ok(Response::Stepped(report)) => {
                assert_eq!(report.tick, expected_tick);
                assert_eq!(report.active_agents, report.agents.len());
            }
            other => panic!("unexpected step reply: {other:?}"),
        }
    }

    match worker.call(Request::CellContents { x: 1, y: 1 }) {
        Ok(Response::CellContents(occupants)) => {
            assert_eq!(occupants.len(), 1);
            assert_eq!(occupants[0].kind, AgentKind::Obstacle);
        }
        other => panic!("unexpected contents reply: {other:?}"),
    }

    match worker.call(Request::RawMap) {
        Ok(Response::RawMap(rows)) => assert_eq!(rows, reference_request().map),
        other => panic!("unexpected map reply: {other:?}"),
    }

    assert_eq!(worker.call(Request::Reset), Ok(Response::Reset));
    let service = worker.shutdown().expect("worker exits cleanly");
    let view = service.agents().expect("initialised");
    assert_eq!(view.len(), 3, "reset restores the initial population");
}

#[test]
fn identical_services_replay_identically() {
    let mut first = SimulationService::new();
    let mut second = SimulationService::new();
    first.initialize(reference_request()).expect("valid request");
    second.initialize(reference_request()).expect("valid request");

    for _ in 0..25 {
        assert_eq!(
            first.step().expect("initialised"),
            second.step().expect("initialised")
        );
    }
}

#[test]
fn grid_status_covers_every_cell() {
    let mut service = SimulationService::new();
    service.initialize(reference_request()).expect("valid request");

    let status = service.grid_status().expect("initialised");
    assert_eq!(status.len(), 30);
    assert_eq!(status[0].cell, CellCoord::new(0, 0));
    assert_eq!(status[29].cell, CellCoord::new(5, 4));

    let light = status
        .iter()
        .find(|entry| entry.cell == CellCoord::new(2, 2))
        .expect("cell inside the grid");
    assert_eq!(light.occupants, vec![AgentKind::TrafficLight]);
}

#[test]
fn step_report_serialises_for_transports() {
    let mut service = SimulationService::new();
    service.initialize(reference_request()).expect("valid request");
    let report = service.step().expect("initialised");

    let json = serde_json::to_value(&report).expect("report serialises");
    assert_eq!(json["tick"], 1);
    assert_eq!(json["active_agents"], 3);
    assert!(json["agents"].is_array());
    assert!(json["events"].is_array());
}

#[test]
fn spawn_reports_exhausted_corners() {
    let mut service = SimulationService::new();
    service
        .initialize(InitRequest::new(1, 2, 1, ["D."]))
        .expect("valid request");

    assert!(matches!(
        service.spawn_agent(),
        Err(ServiceError::Spawn(_))
    ));
}

#[test]
fn oversized_grid_is_refused_without_allocating() {
    let worker = Worker::spawn(SimulationService::new());

    let request = InitRequest::new(1, 1_000_000, 1_000_000, ["D"]);
    assert!(matches!(
        worker.call(Request::Initialize(request)),
        Err(ServiceError::Init(_))
    ));
    assert_eq!(worker.call(Request::Step), Err(ServiceError::NotInitialized));

    let service = worker.shutdown().expect("worker survives the rejected request");
    assert!(!service.is_initialized());
}
