mod support;

use guarded_traversal::adapters::inbound::FileRunJournal;
use guarded_traversal::adapters::outbound::{LogLevel, MemoryLogger};
use guarded_traversal::common::RunJournal;
use guarded_traversal::domains::coordination::{CoordinatorSettings, RunCoordinator, TickOutcome};
use guarded_traversal::domains::obstacle_tracking::{Coordinate, ObstacleId};
use guarded_traversal::domains::requirements::{DistanceReference, Requirement};
use guarded_traversal::domains::traversal::{AreaDefinition, Checkpoint, RunState};
use std::sync::Arc;
use std::time::Duration;
use support::*;
use tempfile::tempdir;

struct Fixture {
    world: Arc<ScriptedWorld>,
    logger: Arc<MemoryLogger>,
    coordinator: RunCoordinator,
}

fn fixture(areas: Vec<AreaDefinition>, cooldown_ms: u64, max_consecutive_failures: u32) -> Fixture {
    let world = world_for(&areas[0]);
    for area in &areas[1..] {
        world.script_action(&area.stages.enter, ActionScript::TeleportTo(area.start));
        world.script_action(&area.stages.act, ActionScript::TeleportTo(outside()));
    }
    let logger = MemoryLogger::new();
    let settings = CoordinatorSettings {
        selection: areas.iter().map(|a| a.id.clone()).collect(),
        cooldown_ms,
        max_consecutive_failures,
    };
    let coordinator = RunCoordinator::new(navigator(&world), areas, settings, logger.clone());
    Fixture {
        world,
        logger,
        coordinator,
    }
}

fn advanced(area_id: &str, state: RunState) -> TickOutcome {
    TickOutcome::Advanced {
        area_id: area_id.to_string(),
        state,
    }
}

/// The second checkpoint waits for obstacle 1 to be 100 tiles away, which it never is.
fn blocked_checkpoints() -> Vec<Checkpoint> {
    let mut checkpoints = open_checkpoints();
    checkpoints[1] = checkpoints[1].clone().with_requirement(Requirement::min_distance(
        ObstacleId(1),
        DistanceReference::Agent,
        100.0,
    ));
    checkpoints
}

fn complete_run(coordinator: &mut RunCoordinator, area_id: &str) {
    for _ in 0..4 {
        coordinator.tick();
    }
    assert_eq!(coordinator.tick(), advanced(area_id, RunState::Completed));
}

#[test]
fn test_maintenance_takes_priority_and_is_not_a_failure() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    f.coordinator.tick();
    f.coordinator.tick();
    assert_eq!(f.coordinator.active_run().map(|r| r.state()), Some(RunState::Navigating));

    f.world.set_capacity_exhausted(true);
    assert_eq!(f.coordinator.tick(), TickOutcome::Maintenance { succeeded: true });

    assert_eq!(f.world.maintenance_calls(), 1);
    assert_eq!(f.coordinator.active_run().map(|r| r.state()), Some(RunState::Idle));
    let stats = f.coordinator.statistics().area("marsh").unwrap();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.consecutive_failures, 0);

    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
}

#[test]
fn test_failed_run_is_reset_in_the_same_tick() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    f.world.script_action("marsh:enter", ActionScript::Refuse);

    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Failed));

    assert_eq!(f.coordinator.active_run().map(|r| r.state()), Some(RunState::Idle));
    assert_eq!(f.coordinator.active_run().map(|r| r.path().cursor()), Some(0));
    assert_eq!(f.coordinator.statistics().area("marsh").unwrap().failed, 1);
    assert!(f.logger.contains(LogLevel::Error, "Run in marsh failed"));

    // Same area is retried on the next tick.
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
}

#[test]
fn test_completed_area_waits_out_its_cooldown() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 60_000, 5);
    complete_run(&mut f.coordinator, "marsh");

    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);
    f.world.clock.advance(Duration::from_millis(59_999));
    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);

    f.world.clock.advance(Duration::from_millis(1));
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
    assert_eq!(f.coordinator.statistics().area("marsh").unwrap().completed, 1);
}

#[test]
fn test_selection_rotates_between_areas() {
    let mut f = fixture(
        vec![area("marsh", open_checkpoints()), area("ridge", open_checkpoints())],
        60_000,
        5,
    );
    complete_run(&mut f.coordinator, "marsh");
    complete_run(&mut f.coordinator, "ridge");
    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);
    assert_eq!(f.coordinator.statistics().total_completed(), 2);
}

#[test]
fn test_repeated_failures_bench_the_area_until_resume() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 2);
    f.world.script_action("marsh:enter", ActionScript::Refuse);

    for _ in 0..4 {
        f.coordinator.tick();
    }
    assert!(f.coordinator.is_benched("marsh"));
    assert!(f.logger.contains(LogLevel::Warn, "Benching marsh"));
    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);

    f.world.script_action("marsh:enter", ActionScript::TeleportTo(area("marsh", vec![]).start));
    f.coordinator.resume();
    assert!(!f.coordinator.is_benched("marsh"));
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Navigating));
}

#[test]
fn test_stop_and_resume_commands() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    let sender = f.coordinator.command_sender();

    f.coordinator.tick();
    f.coordinator.tick();
    sender.stop().unwrap();

    assert_eq!(f.coordinator.tick(), TickOutcome::Halted);
    assert!(f.coordinator.is_halted());
    assert_eq!(f.coordinator.active_run().map(|r| r.state()), Some(RunState::Idle));
    let stats = f.coordinator.statistics().area("marsh").unwrap();
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(f.coordinator.tick(), TickOutcome::Halted);

    sender.resume().unwrap();
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
}

#[test]
fn test_select_areas_command_switches_area() {
    let mut f = fixture(
        vec![area("marsh", open_checkpoints()), area("ridge", open_checkpoints())],
        0,
        5,
    );
    f.coordinator
        .command_sender()
        .select_areas(vec!["ridge".to_string()])
        .unwrap();

    assert_eq!(f.coordinator.tick(), advanced("ridge", RunState::Entering));
    assert_eq!(f.coordinator.selection().to_vec(), vec!["ridge".to_string()]);
}

#[test]
fn test_unknown_selected_area_is_never_started() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    f.coordinator.select_areas(vec!["swamp".to_string()]);

    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);
    assert!(f.logger.contains(LogLevel::Warn, "swamp"));
}

#[test]
fn test_external_pause_starts_nothing() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    f.world.set_run_inactive(true);

    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);
    assert!(f.coordinator.active_run().is_none());
}

#[test]
fn test_panicking_supervisor_is_recovered() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    f.coordinator.tick();
    f.world.set_supervisor_panics(true);

    let outcome = f.coordinator.tick();
    assert!(matches!(outcome, TickOutcome::Recovered { ref reason } if reason.contains("supervisor unreachable")));
    assert_eq!(f.coordinator.active_run().map(|r| r.state()), Some(RunState::Idle));

    f.world.set_supervisor_panics(false);
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
}

#[test]
fn test_events_are_journaled_per_run() {
    let dir = tempdir().unwrap();
    let journal = Arc::new(FileRunJournal::new(dir.path().join("journal")));
    let f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    let mut coordinator = f.coordinator.with_journal(journal.clone());

    complete_run(&mut coordinator, "marsh");

    let runs = journal.list_aggregates().unwrap();
    assert_eq!(runs.len(), 1);
    let events = journal.load(&runs[0]).unwrap();
    assert_eq!(events.len(), 10);
    assert_eq!(events[0].event_type, "RunStarted");
    assert!(events.iter().all(|e| e.aggregate_type == "AreaRun"));
}

#[test]
fn test_queued_stop_cancels_wait_in_progress() {
    let mut f = fixture(vec![area("marsh", blocked_checkpoints())], 0, 5);
    f.world.place_obstacle(1, Coordinate::new(12.0, 5.0));
    f.coordinator.tick();
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Navigating));

    let started = f.world.elapsed();
    f.world
        .queue_stop_at(started + Duration::from_millis(500), f.coordinator.command_sender());

    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Idle));
    // settings() polls every 100 ms against a 5 s requirement timeout
    assert_eq!(f.world.elapsed() - started, Duration::from_millis(600));

    let stats = f.coordinator.statistics().area("marsh").unwrap();
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.consecutive_failures, 0);
    assert!(f.logger.contains(LogLevel::Info, "run cancelled during navigating"));
    assert!(!f.logger.contains(LogLevel::Error, "Run in marsh failed"));

    assert_eq!(f.coordinator.tick(), TickOutcome::Halted);
    assert!(f.coordinator.is_halted());
}

#[test]
fn test_area_exit_while_navigating_fails_without_acting() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Entering));
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Navigating));

    f.world.force_outside(true);
    assert_eq!(f.coordinator.tick(), advanced("marsh", RunState::Failed));

    let run = f.coordinator.active_run().unwrap();
    assert_eq!(run.state(), RunState::Idle);
    assert_eq!(run.path().cursor(), 0);
    assert_eq!(run.last_error().map(|e| e.kind()), Some("AreaExitFailsafe"));
    assert_eq!(f.world.performed(), vec!["marsh:enter"]);
    assert!(f.world.moves().is_empty());
    assert_eq!(f.coordinator.statistics().area("marsh").unwrap().failed, 1);
}

#[test]
fn test_pause_holds_off_maintenance() {
    let mut f = fixture(vec![area("marsh", open_checkpoints())], 0, 5);
    f.world.set_run_inactive(true);
    f.world.set_capacity_exhausted(true);

    assert_eq!(f.coordinator.tick(), TickOutcome::Idle);
    assert_eq!(f.world.maintenance_calls(), 0);

    f.world.set_run_inactive(false);
    assert_eq!(f.coordinator.tick(), TickOutcome::Maintenance { succeeded: true });
    assert_eq!(f.world.maintenance_calls(), 1);
}
