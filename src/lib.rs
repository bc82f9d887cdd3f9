// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, ReportFormat};
use crate::config::{build_graph, load_and_validate};
use crate::dag::{Graph, GraphOptions, RunSummary};
use crate::report::{GraphSnapshot, render_dot, render_text};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the graph, then either prints it
/// (`--dry-run`) or runs it to completion and prints the final report.
/// Task failures are not errors here; they are reported in the returned
/// summary.
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    let options = apply_overrides(cfg.graph_options(), &args);
    let mut graph = build_graph(&cfg, options)
        .with_context(|| format!("invalid task graph in {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&graph);
        return Ok(RunSummary::default());
    }

    let summary = graph.run().await;

    println!("{}", render_report(&graph.snapshot(), args.report)?);
    if args.show_logs {
        print_logs(&graph);
    }

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "taskdag finished"
    );
    Ok(summary)
}

/// Apply `--max-parallel` / `--tick-ms` on top of the options from the file.
pub fn apply_overrides(mut options: GraphOptions, args: &CliArgs) -> GraphOptions {
    if let Some(n) = args.max_parallel {
        options.max_parallel_workers = n;
    }
    if let Some(ms) = args.tick_ms {
        options.tick_interval = Duration::from_millis(ms);
    }
    options
}

/// Render a snapshot in the requested report format.
pub fn render_report(snapshot: &GraphSnapshot, format: ReportFormat) -> Result<String> {
    let out = match format {
        ReportFormat::Text => render_text(snapshot),
        ReportFormat::Json => snapshot.to_json().context("failed to serialize snapshot")?,
        ReportFormat::Dot => render_dot(snapshot),
    };
    Ok(out.trim_end().to_string())
}

/// Dry-run output: options, then every task with its command and upstream.
fn print_dry_run(graph: &Graph) {
    let options = graph.options();
    println!("taskdag dry-run");
    println!("  config.max_parallel_workers = {}", options.max_parallel_workers);
    println!("  config.tick_interval_ms = {}", options.tick_interval.as_millis());
    println!();

    let snapshot = graph.snapshot();
    println!("tasks ({}):", snapshot.tasks.len());
    for task in &snapshot.tasks {
        println!("  - {} ({})", task.name, task.kind);
        println!("      cmd: {}", task.command);
        if !task.upstream.is_empty() {
            println!("      after: {:?}", task.upstream);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_logs(graph: &Graph) {
    for task in graph.tasks() {
        let logs = task.logs();
        if logs.is_empty() {
            continue;
        }
        println!();
        println!("==> {} <==", task.name());
        print!("{logs}");
        if !logs.ends_with('\n') {
            println!();
        }
    }
}
