// src/dag/scheduler_step.rs

//! Result types for ticks and whole runs.

use crate::dag::task::TaskStatus;
use crate::dag::Graph;

/// Structured result of a single scheduler tick.
///
/// Useful for tests that drive the graph tick by tick and assert on what
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks whose backend was started during this tick.
    pub started: Vec<String>,
    /// Tasks whose backend reported completion during this tick.
    pub finished: Vec<String>,
    /// Tasks that became `Failed` during this tick, including cascades.
    pub newly_failed: Vec<String>,
    /// Number of running tasks after the tick.
    pub running: usize,
}

/// Final state of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Number of ticks the run took.
    pub ticks: u64,
}

impl RunSummary {
    pub(crate) fn collect(graph: &Graph, ticks: u64) -> Self {
        let mut summary = RunSummary {
            ticks,
            ..Default::default()
        };
        for task in graph.tasks() {
            match task.status() {
                TaskStatus::Succeeded => summary.succeeded.push(task.name().to_string()),
                TaskStatus::Failed => summary.failed.push(task.name().to_string()),
                _ => {}
            }
        }
        summary
    }

    /// `true` when no task failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
