// tests/task_state_machine.rs
mod common;
use crate::common::init_tracing;

use taskdag::dag::{RunningDelta, TaskStatus};
use taskdag::exec::TaskOutcome;
use taskdag_test_utils::builders::{FakeGraphBuilder, diamond};
use taskdag_test_utils::fake_backend::FakeBackend;

#[test]
fn new_tasks_start_waiting_and_pending() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.ok("A");
    let (graph, _tracker) = b.build();

    assert_eq!(graph.status(a), TaskStatus::Waiting);
    assert!(graph.task(a).is_pending());
    assert_eq!(graph.running_count(), 0);
}

#[test]
fn try_schedule_waits_for_every_upstream_task() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(2);
    let a = b.ok("A");
    let c = b.ok("C");
    let d = b.ok("D");
    b.edge(a, d).edge(c, d);
    let (mut graph, _tracker) = b.build();

    assert!(graph.try_schedule(a));
    assert!(!graph.try_schedule(d));
    assert_eq!(graph.status(d), TaskStatus::Waiting);

    graph.succeed(a);
    assert_eq!(graph.status(d), TaskStatus::Waiting, "C has not succeeded yet");

    assert!(graph.try_schedule(c));
    graph.succeed(c);
    assert_eq!(graph.status(d), TaskStatus::Scheduled);
}

#[test]
fn try_schedule_only_acts_on_waiting_tasks() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.ok("A");
    let (mut graph, _tracker) = b.build();

    assert!(graph.try_schedule(a));
    assert!(!graph.try_schedule(a), "already scheduled");
    assert_eq!(graph.status(a), TaskStatus::Scheduled);

    graph.succeed(a);
    assert!(!graph.try_schedule(a));
    assert_eq!(graph.status(a), TaskStatus::Succeeded);
}

#[test]
fn try_schedule_fails_task_with_failed_upstream() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.ok("A");
    let d = b.ok("D");
    let (mut graph, _tracker) = b.build();

    assert_eq!(graph.fail(a), vec![a]);

    // Edge declared after the failure: D only learns about it on scheduling.
    graph.declare_dependency(a, d).unwrap();
    assert!(!graph.try_schedule(d));
    assert_eq!(graph.status(d), TaskStatus::Failed);
}

#[test]
fn fail_cascade_reports_newly_failed_in_order() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.ok("A");
    let c = b.ok("C");
    let d = b.ok("D");
    b.edge(a, c).edge(c, d);
    let (mut graph, _tracker) = b.build();

    assert_eq!(graph.fail(a), vec![a, c, d]);
}

#[test]
fn update_status_respects_runnable_flag() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.ok("A");
    let (mut graph, tracker) = b.build();

    graph.prime();
    assert_eq!(graph.status(a), TaskStatus::Scheduled);

    assert_eq!(graph.update_status(a, false), RunningDelta::Unchanged);
    assert_eq!(graph.status(a), TaskStatus::Scheduled);
    assert!(tracker.started().is_empty());

    assert_eq!(graph.update_status(a, true), RunningDelta::Started);
    assert_eq!(graph.status(a), TaskStatus::Running);
    assert_eq!(graph.running_count(), 1);
    assert_eq!(tracker.started(), vec!["A".to_string()]);
}

#[test]
fn running_task_finishes_after_backend_completes() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let tracker = b.tracker();
    let a = b.add("A", FakeBackend::new("A", &tracker).after_polls(2));
    let d = b.ok("D");
    b.edge(a, d);
    let (mut graph, _tracker) = b.build();

    graph.prime();
    assert_eq!(graph.update_status(a, true), RunningDelta::Started);

    // Running tasks are polled regardless of the runnable flag.
    assert_eq!(graph.update_status(a, false), RunningDelta::Unchanged);
    assert_eq!(graph.update_status(a, false), RunningDelta::Finished);
    assert_eq!(RunningDelta::Finished.as_isize(), -1);

    assert_eq!(graph.status(a), TaskStatus::Succeeded);
    assert_eq!(graph.running_count(), 0);
    assert_eq!(graph.status(d), TaskStatus::Scheduled);
}

#[test]
fn failed_outcome_cascades_downstream() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.failing("A", 7);
    let d = b.ok("D");
    b.edge(a, d);
    let (mut graph, _tracker) = b.build();

    graph.prime();
    graph.update_status(a, true);
    assert_eq!(graph.update_status(a, true), RunningDelta::Finished);

    assert_eq!(graph.status(a), TaskStatus::Failed);
    assert_eq!(graph.status(d), TaskStatus::Failed);
    assert_eq!(graph.running_count(), 0);
}

#[test]
fn start_error_fails_task_without_running() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let tracker = b.tracker();
    let a = b.add("A", FakeBackend::new("A", &tracker).failing_to_start());
    let d = b.ok("D");
    b.edge(a, d);
    let (mut graph, tracker) = b.build();

    graph.prime();
    assert_eq!(graph.update_status(a, true), RunningDelta::Unchanged);

    assert_eq!(graph.status(a), TaskStatus::Failed);
    assert_eq!(graph.status(d), TaskStatus::Failed);
    assert_eq!(graph.running_count(), 0);
    assert!(tracker.started().is_empty());
}

#[test]
fn fail_is_idempotent_across_converging_paths() {
    init_tracing();

    let (mut graph, _tracker) = diamond([TaskOutcome::Success; 4], 1);
    let a = graph.id_of("A").unwrap();

    let newly = graph.fail(a);
    let mut names: Vec<&str> = newly.iter().map(|id| graph.task(*id).name()).collect();
    names.sort();
    assert_eq!(names, vec!["A", "B", "C", "D"], "D failed exactly once");

    assert!(graph.fail(a).is_empty());
    let d = graph.id_of("D").unwrap();
    assert!(graph.fail(d).is_empty());
}

#[test]
fn fail_leaves_succeeded_tasks_alone() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let a = b.ok("A");
    let (mut graph, _tracker) = b.build();

    graph.prime();
    graph.succeed(a);
    assert!(graph.fail(a).is_empty());
    assert_eq!(graph.status(a), TaskStatus::Succeeded);
}

#[test]
fn failing_a_running_task_releases_its_slot() {
    init_tracing();

    let mut b = FakeGraphBuilder::new(1);
    let tracker = b.tracker();
    let a = b.add("A", FakeBackend::new("A", &tracker).after_polls(100));
    let (mut graph, _tracker) = b.build();

    graph.prime();
    graph.update_status(a, true);
    assert_eq!(graph.running_count(), 1);

    assert_eq!(graph.fail(a), vec![a]);
    assert_eq!(graph.status(a), TaskStatus::Failed);
    assert_eq!(graph.running_count(), 0);
    assert!(!graph.has_pending());
}

#[test]
#[should_panic]
fn state_operations_panic_on_foreign_task_id() {
    let mut big = FakeGraphBuilder::new(1);
    big.ok("x");
    let foreign = big.ok("y");

    let mut small = FakeGraphBuilder::new(1);
    small.ok("A");
    let (mut graph, _tracker) = small.build();

    graph.try_schedule(foreign);
}
