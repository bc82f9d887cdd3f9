// src/dag/task.rs

//! Task metadata and status.

use std::fmt;

use serde::Serialize;

use crate::exec::{
    Backend, ContainerBackend, Image, InProcessBackend, LogSink, ShellBackend, TaskKind,
};

/// Handle to a task inside the [`Graph`](crate::dag::Graph) that created it.
///
/// Ids are indices in insertion order and are only meaningful for the graph
/// they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Task status.
///
/// Moves forward along `Waiting -> Scheduled -> Running -> Succeeded|Failed`.
/// `Waiting`, `Scheduled` and `Running` may also jump straight to `Failed`
/// when an upstream task fails. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for upstream tasks (or for the run to start).
    Waiting,
    /// Every upstream task succeeded; waiting for an admission slot.
    Scheduled,
    /// Backend started and not yet complete.
    Running,
    Succeeded,
    /// The task's backend failed, or an upstream task failed.
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        }
    }

    /// Graphviz fill colour used when rendering this status.
    pub fn color(self) -> &'static str {
        match self {
            TaskStatus::Waiting => "lightgrey",
            TaskStatus::Scheduled => "lightblue",
            TaskStatus::Running => "gold",
            TaskStatus::Succeeded => "palegreen",
            TaskStatus::Failed => "salmon",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named unit of work plus its dependency edges.
///
/// Edges are only created through
/// [`Graph::declare_dependency`](crate::dag::Graph::declare_dependency), which
/// keeps `upstream` and `downstream` mutual and acyclic.
pub struct Task {
    pub(crate) name: String,
    pub(crate) status: TaskStatus,
    pub(crate) upstream: Vec<TaskId>,
    pub(crate) downstream: Vec<TaskId>,
    pub(crate) backend: Box<dyn Backend>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &self.backend.kind())
            .field("status", &self.status)
            .field("upstream", &self.upstream)
            .field("downstream", &self.downstream)
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new(name: impl Into<String>, backend: impl Backend + 'static) -> Self {
        Self::from_boxed(name, Box::new(backend))
    }

    pub fn from_boxed(name: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Waiting,
            upstream: Vec::new(),
            downstream: Vec::new(),
            backend,
        }
    }

    pub fn shell<I, S>(name: impl Into<String>, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ShellBackend::new(argv))
    }

    pub fn container(name: impl Into<String>, image: Image, command: impl Into<String>) -> Self {
        Self::new(name, ContainerBackend::new(image, command))
    }

    pub fn in_process<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(LogSink) -> anyhow::Result<()> + Send + 'static,
    {
        Self::new(name, InProcessBackend::new(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn kind(&self) -> TaskKind {
        self.backend.kind()
    }

    /// Description of the work (command line, image, ...).
    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Neither succeeded nor failed yet.
    pub fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Direct dependencies, in declaration order.
    pub fn upstream(&self) -> &[TaskId] {
        &self.upstream
    }

    /// Direct dependents, in declaration order.
    pub fn downstream(&self) -> &[TaskId] {
        &self.downstream
    }

    /// Output captured by the backend so far.
    pub fn logs(&self) -> String {
        self.backend.logs()
    }

    /// Block until the backend finished. Does not change the status; the
    /// next `update_status` picks the outcome up.
    pub async fn wait(&mut self) {
        self.backend.wait().await;
    }
}
