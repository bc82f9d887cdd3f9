// src/dag/graph.rs

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::{debug, info};

use crate::dag::chain::{Chain, TaskSet};
use crate::dag::scheduler_step::{RunSummary, TickReport};
use crate::dag::state_manager::{RunningDelta, StateManager};
use crate::dag::task::{Task, TaskId, TaskStatus};
use crate::errors::{DagError, Result};
use crate::exec::{Backend, TaskParams, backend_for_kind};
use crate::report::{GraphSnapshot, TaskSnapshot};

/// Options fixed at graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    /// Maximum number of tasks running at the same time (>= 1).
    pub max_parallel_workers: usize,
    /// Period of the scheduling loop.
    pub tick_interval: Duration,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_parallel_workers: 1,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl GraphOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_workers == 0 {
            return Err(DagError::InvalidOptions(
                "max_parallel_workers must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(DagError::InvalidOptions(
                "tick_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A DAG of tasks plus the admission-gated scheduling loop that runs it.
///
/// Tasks are kept in insertion order; that order is the order in which each
/// tick visits them, so among tasks that are scheduled at the same time the
/// earlier-added ones get admission slots first.
///
/// Every mutating operation takes `&mut self`: the future driving
/// [`Graph::run`] is the only writer of task status and of the running count.
#[derive(Debug)]
pub struct Graph {
    tasks: Vec<Task>,
    index: HashMap<String, TaskId>,
    options: GraphOptions,
    running: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Graph with one worker and a one-second tick.
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
            options: GraphOptions::default(),
            running: 0,
        }
    }

    pub fn with_options(options: GraphOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::new()
        })
    }

    pub fn with_max_parallel_workers(max_parallel_workers: usize) -> Result<Self> {
        Self::with_options(GraphOptions {
            max_parallel_workers,
            ..GraphOptions::default()
        })
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    // ---- construction ----------------------------------------------------

    /// Register a task under its name.
    pub fn add_task(&mut self, task: Task) -> Result<TaskId> {
        if self.index.contains_key(&task.name) {
            return Err(DagError::DuplicateName(task.name));
        }

        let id = TaskId(self.tasks.len());
        debug!(task = %task.name, kind = %task.kind(), "task added");
        self.index.insert(task.name.clone(), id);
        self.tasks.push(task);
        Ok(id)
    }

    pub fn new_task(
        &mut self,
        name: impl Into<String>,
        backend: impl Backend + 'static,
    ) -> Result<TaskId> {
        self.add_task(Task::new(name, backend))
    }

    /// Create a task from a textual kind (`"container"`, `"shell"`,
    /// `"in_process"`) and its parameters.
    pub fn new_task_of_kind(
        &mut self,
        name: impl Into<String>,
        kind: &str,
        params: TaskParams,
    ) -> Result<TaskId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DagError::DuplicateName(name));
        }
        let backend = backend_for_kind(&name, kind, params)?;
        self.add_task(Task::from_boxed(name, backend))
    }

    /// Make `downstream` depend on `upstream`.
    ///
    /// Re-declaring an existing edge is a no-op. An edge that would close a
    /// cycle is rejected with [`DagError::Cycle`] before anything changes.
    pub fn declare_dependency(&mut self, upstream: TaskId, downstream: TaskId) -> Result<()> {
        self.check_id(upstream)?;
        self.check_id(downstream)?;

        if self.tasks[upstream.0].downstream.contains(&downstream) {
            return Ok(());
        }

        if upstream == downstream || self.reaches(downstream, upstream) {
            return Err(DagError::Cycle {
                upstream: self.tasks[upstream.0].name.clone(),
                downstream: self.tasks[downstream.0].name.clone(),
            });
        }

        self.tasks[upstream.0].downstream.push(downstream);
        self.tasks[downstream.0].upstream.push(upstream);
        debug!(
            upstream = %self.tasks[upstream.0].name,
            downstream = %self.tasks[downstream.0].name,
            "dependency declared"
        );
        Ok(())
    }

    /// Make every task in `downstream` depend on every task in `upstream`.
    ///
    /// Edges are declared pair by pair; on error, the pairs declared before
    /// the failing one stay in place.
    pub fn declare_dependencies(
        &mut self,
        upstream: impl Into<TaskSet>,
        downstream: impl Into<TaskSet>,
    ) -> Result<()> {
        let upstream = upstream.into();
        let downstream = downstream.into();
        for &up in upstream.ids() {
            for &down in downstream.ids() {
                self.declare_dependency(up, down)?;
            }
        }
        Ok(())
    }

    /// Start a fluent declaration: `graph.chain(a).then([b, c])?.then(d)?`.
    pub fn chain(&mut self, start: impl Into<TaskSet>) -> Chain<'_> {
        Chain::new(self, start.into())
    }

    /// Whether `target` can be reached from `from` along downstream edges.
    fn reaches(&self, from: TaskId, target: TaskId) -> bool {
        let mut seen = vec![false; self.tasks.len()];
        let mut queue = VecDeque::from([from]);
        seen[from.0] = true;

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            for &next in &self.tasks[current.0].downstream {
                if !seen[next.0] {
                    seen[next.0] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }

    fn check_id(&self, id: TaskId) -> Result<()> {
        if id.0 < self.tasks.len() {
            Ok(())
        } else {
            Err(DagError::TaskNotFound(format!("#{}", id.0)))
        }
    }

    // ---- lookup ----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Id of the task named `name`.
    pub fn id_of(&self, name: &str) -> Result<TaskId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DagError::TaskNotFound(name.to_string()))
    }

    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|id| &self.tasks[id.0])
    }

    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.tasks[id.0].status
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + use<> {
        (0..self.tasks.len()).map(TaskId)
    }

    /// Number of tasks currently `Running`.
    pub fn running_count(&self) -> usize {
        self.running
    }

    /// Whether any task is neither succeeded nor failed.
    pub fn has_pending(&self) -> bool {
        self.tasks.iter().any(Task::is_pending)
    }

    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn logs(&self, id: TaskId) -> String {
        self.tasks[id.0].logs()
    }

    /// Block until the task's backend finished (manual and test use only;
    /// never called by [`Graph::run`]).
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub async fn wait(&mut self, id: TaskId) {
        self.tasks[id.0].wait().await;
    }

    // ---- state machine ---------------------------------------------------

    fn manager(&mut self) -> StateManager<'_> {
        StateManager::new(&mut self.tasks, &mut self.running)
    }

    /// See [`StateManager::try_schedule`].
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn try_schedule(&mut self, id: TaskId) -> bool {
        self.manager().try_schedule(id)
    }

    /// See [`StateManager::update_status`].
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn update_status(&mut self, id: TaskId, runnable: bool) -> RunningDelta {
        self.manager().update_status(id, runnable)
    }

    /// See [`StateManager::succeed`].
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn succeed(&mut self, id: TaskId) {
        self.manager().succeed(id);
    }

    /// See [`StateManager::fail`].
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this graph.
    pub fn fail(&mut self, id: TaskId) -> Vec<TaskId> {
        self.manager().fail(id)
    }

    // ---- scheduling loop -------------------------------------------------

    /// Try to schedule every task; resolves tasks without upstream
    /// dependencies immediately.
    pub fn prime(&mut self) {
        for id in self.ids() {
            self.try_schedule(id);
        }
    }

    /// One pass of the scheduling loop: update every task in insertion order,
    /// admitting a scheduled task only while fewer than
    /// `max_parallel_workers` tasks are running.
    pub fn tick(&mut self) -> TickReport {
        let before: Vec<TaskStatus> = self.tasks.iter().map(|t| t.status).collect();
        let mut report = TickReport::default();

        for id in self.ids() {
            let runnable = self.running < self.options.max_parallel_workers;
            match self.update_status(id, runnable) {
                RunningDelta::Started => report.started.push(self.tasks[id.0].name.clone()),
                RunningDelta::Finished => report.finished.push(self.tasks[id.0].name.clone()),
                RunningDelta::Unchanged => {}
            }
        }

        report.newly_failed = self
            .tasks
            .iter()
            .zip(before)
            .filter(|(task, was)| task.status == TaskStatus::Failed && *was != TaskStatus::Failed)
            .map(|(task, _)| task.name.clone())
            .collect();
        report.running = self.running;
        report
    }

    /// Run the graph until every task is terminal.
    ///
    /// Never fails: task failures are reported through task status and the
    /// returned summary. A backend that never completes keeps this future
    /// pending forever.
    pub async fn run(&mut self) -> RunSummary {
        info!(
            tasks = self.tasks.len(),
            max_parallel_workers = self.options.max_parallel_workers,
            tick_ms = self.options.tick_interval.as_millis() as u64,
            "starting DAG run"
        );

        self.prime();

        let mut ticks = 0u64;
        while self.has_pending() {
            tokio::time::sleep(self.options.tick_interval).await;
            ticks += 1;

            let report = self.tick();
            if !report.started.is_empty() || !report.finished.is_empty() {
                debug!(
                    tick = ticks,
                    started = ?report.started,
                    finished = ?report.finished,
                    newly_failed = ?report.newly_failed,
                    running = report.running,
                    "tick"
                );
            }
        }

        let summary = RunSummary::collect(self, ticks);
        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            ticks,
            "DAG run finished"
        );
        summary
    }

    // ---- reporting -------------------------------------------------------

    /// Read-only view of every task's name, kind, status and edges.
    pub fn snapshot(&self) -> GraphSnapshot {
        let names = |ids: &[TaskId]| -> Vec<String> {
            ids.iter().map(|id| self.tasks[id.0].name.clone()).collect()
        };

        GraphSnapshot {
            max_parallel_workers: self.options.max_parallel_workers,
            running: self.running,
            tasks: self
                .tasks
                .iter()
                .map(|task| TaskSnapshot {
                    name: task.name.clone(),
                    kind: task.kind(),
                    status: task.status,
                    command: task.describe(),
                    upstream: names(&task.upstream),
                    downstream: names(&task.downstream),
                })
                .collect(),
        }
    }
}
