// src/report/snapshot.rs

use serde::Serialize;

use crate::dag::TaskStatus;
use crate::exec::TaskKind;

/// Point-in-time view of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub name: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub command: String,
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
}

/// Point-in-time view of a whole graph, tasks in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub max_parallel_workers: usize,
    pub running: usize,
    pub tasks: Vec<TaskSnapshot>,
}

impl GraphSnapshot {
    pub fn task(&self, name: &str) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Number of tasks with the given status.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
