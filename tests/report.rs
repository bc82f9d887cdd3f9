// tests/report.rs
mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use taskdag::cli::{CliArgs, ReportFormat};
use taskdag::dag::TaskStatus;
use taskdag::exec::{TaskKind, TaskOutcome};
use taskdag::report::{render_dot, render_text};
use taskdag::{apply_overrides, render_report};
use taskdag_test_utils::builders::{diamond, fast_options};

type TestResult = Result<(), Box<dyn Error>>;

const OK: TaskOutcome = TaskOutcome::Success;

#[test]
fn snapshot_lists_tasks_with_named_edges() {
    init_tracing();

    let (graph, _tracker) = diamond([OK; 4], 2);
    let snapshot = graph.snapshot();

    assert_eq!(snapshot.max_parallel_workers, 2);
    assert_eq!(snapshot.running, 0);
    assert_eq!(snapshot.tasks.len(), 4);
    assert_eq!(snapshot.count(TaskStatus::Waiting), 4);

    let d = snapshot.task("D").expect("D in snapshot");
    assert_eq!(d.upstream, vec!["B", "C"]);
    assert!(d.downstream.is_empty());
    assert_eq!(d.kind, TaskKind::InProcess);
    assert_eq!(d.command, "fake:D");

    let a = snapshot.task("A").expect("A in snapshot");
    assert_eq!(a.downstream, vec!["B", "C"]);
}

#[test]
fn snapshot_serializes_to_json() -> TestResult {
    let (mut graph, _tracker) = diamond([OK, OK, TaskOutcome::Failed(1), OK], 2);
    graph.prime();
    graph.tick();

    let json: serde_json::Value = serde_json::from_str(&graph.snapshot().to_json()?)?;

    assert_eq!(json["max_parallel_workers"], 2);
    assert_eq!(json["running"], 1);
    assert_eq!(json["tasks"][0]["name"], "A");
    assert_eq!(json["tasks"][0]["status"], "running");
    assert_eq!(json["tasks"][0]["kind"], "in_process");
    assert_eq!(json["tasks"][3]["upstream"], serde_json::json!(["B", "C"]));

    Ok(())
}

#[test]
fn text_report_has_one_line_per_task() {
    let (graph, _tracker) = diamond([OK; 4], 1);
    let text = render_text(&graph.snapshot());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("waiting"));
    assert!(lines[0].contains("A (in_process)"));
    assert!(!lines[0].contains("after"));
    assert!(lines[3].ends_with("after B, C"));
}

#[test]
fn dot_report_colours_nodes_by_status() {
    let (mut graph, _tracker) = diamond([OK, OK, TaskOutcome::Failed(1), OK], 2);
    graph.prime();
    for _ in 0..3 {
        graph.tick();
    }

    let dot = render_dot(&graph.snapshot());

    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains(r#"label = "A" style = filled fillcolor = palegreen"#));
    assert!(dot.contains(r#"label = "C" style = filled fillcolor = salmon"#));
    assert!(dot.contains(r#"label = "D" style = filled fillcolor = salmon"#));
    assert_eq!(dot.matches("->").count(), 4);
}

#[test]
fn status_colours_are_distinct() {
    let colours = [
        TaskStatus::Waiting,
        TaskStatus::Scheduled,
        TaskStatus::Running,
        TaskStatus::Succeeded,
        TaskStatus::Failed,
    ]
    .map(TaskStatus::color);

    for (i, a) in colours.iter().enumerate() {
        for b in &colours[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn render_report_dispatches_on_format() -> TestResult {
    let (graph, _tracker) = diamond([OK; 4], 1);
    let snapshot = graph.snapshot();

    assert!(render_report(&snapshot, ReportFormat::Text)?.starts_with("waiting"));
    assert!(render_report(&snapshot, ReportFormat::Json)?.starts_with('{'));
    assert!(render_report(&snapshot, ReportFormat::Dot)?.starts_with("digraph"));

    Ok(())
}

#[test]
fn cli_overrides_replace_file_options() -> TestResult {
    let args = CliArgs::try_parse_from(["taskdag", "--max-parallel", "4", "--tick-ms", "20"])?;
    let options = apply_overrides(fast_options(1), &args);
    assert_eq!(options.max_parallel_workers, 4);
    assert_eq!(options.tick_interval, Duration::from_millis(20));

    let args = CliArgs::try_parse_from(["taskdag", "--report", "dot", "--dry-run"])?;
    assert_eq!(args.config, "Taskdag.toml");
    assert_eq!(args.report, ReportFormat::Dot);
    assert!(args.dry_run);
    assert_eq!(apply_overrides(fast_options(1), &args), fast_options(1));

    Ok(())
}
