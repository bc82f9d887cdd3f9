// src/dag/state_manager.rs

//! Status transitions and their cascades.

use tracing::{debug, error, info, warn};

use crate::dag::task::{Task, TaskId, TaskStatus};
use crate::exec::TaskOutcome;

/// Change in the number of running tasks caused by one `update_status` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningDelta {
    /// The task was started (`+1`).
    Started,
    /// The task finished (`-1`).
    Finished,
    /// Nothing relevant happened (`0`).
    Unchanged,
}

impl RunningDelta {
    pub fn as_isize(self) -> isize {
        match self {
            RunningDelta::Started => 1,
            RunningDelta::Finished => -1,
            RunningDelta::Unchanged => 0,
        }
    }
}

/// Applies status transitions to the task arena.
///
/// `running` is updated at the single point where a status enters or leaves
/// `Running`, so it always equals the number of running tasks, including
/// when a running task is forced to `Failed`.
pub struct StateManager<'a> {
    tasks: &'a mut [Task],
    running: &'a mut usize,
}

impl<'a> StateManager<'a> {
    pub fn new(tasks: &'a mut [Task], running: &'a mut usize) -> Self {
        Self { tasks, running }
    }

    /// Move a `Waiting` task to `Scheduled` if every upstream task succeeded.
    ///
    /// A failed upstream task fails this task (and its downstream). Returns
    /// `true` only if the task is now `Scheduled`.
    pub fn try_schedule(&mut self, id: TaskId) -> bool {
        let task = &self.tasks[id.0];
        if task.status != TaskStatus::Waiting {
            debug!(task = %task.name, status = %task.status, "try_schedule on non-waiting task; ignoring");
            return false;
        }

        let mut failed_upstream = None;
        let mut all_succeeded = true;
        for dep in &task.upstream {
            match self.tasks[dep.0].status {
                TaskStatus::Failed => {
                    failed_upstream = Some(*dep);
                    break;
                }
                TaskStatus::Succeeded => {}
                _ => all_succeeded = false,
            }
        }

        if let Some(dep) = failed_upstream {
            warn!(
                task = %self.tasks[id.0].name,
                upstream = %self.tasks[dep.0].name,
                "upstream task failed; failing task"
            );
            self.fail(id);
            return false;
        }

        if !all_succeeded {
            return false;
        }

        self.set_status(id, TaskStatus::Scheduled);
        debug!(task = %self.tasks[id.0].name, "dependencies satisfied; scheduled");
        true
    }

    /// Advance a task by one tick.
    ///
    /// - `Scheduled` and `runnable`: start the backend, `Started`.
    /// - `Running`: poll the backend; on completion succeed or fail the task,
    ///   `Finished`.
    /// - anything else: `Unchanged`.
    ///
    /// A backend that fails to start fails the task without it ever having
    /// been `Running`.
    pub fn update_status(&mut self, id: TaskId, runnable: bool) -> RunningDelta {
        match self.tasks[id.0].status {
            TaskStatus::Scheduled if runnable => self.start(id),
            TaskStatus::Running => self.poll(id),
            _ => RunningDelta::Unchanged,
        }
    }

    /// Mark a task `Succeeded` and try to schedule its downstream tasks.
    ///
    /// No-op on a task that is already terminal.
    pub fn succeed(&mut self, id: TaskId) {
        let task = &self.tasks[id.0];
        if task.status.is_terminal() {
            debug!(task = %task.name, status = %task.status, "succeed on terminal task; ignoring");
            return;
        }

        self.set_status(id, TaskStatus::Succeeded);

        let downstream = self.tasks[id.0].downstream.clone();
        for dep in downstream {
            self.try_schedule(dep);
        }
    }

    /// Mark a task and, transitively, everything downstream of it `Failed`.
    ///
    /// Already-failed tasks stop the walk, so every task is failed at most
    /// once even when failure paths converge. Succeeded tasks are left alone.
    /// Returns the tasks newly failed by this call, in cascade order.
    pub fn fail(&mut self, id: TaskId) -> Vec<TaskId> {
        let mut newly_failed = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let task = &self.tasks[current.0];
            if task.status.is_terminal() {
                continue;
            }

            if task.status == TaskStatus::Running && current != id {
                warn!(task = %task.name, "failing a running task; its backend keeps running");
            } else if current != id {
                debug!(task = %task.name, "marking task failed due to upstream failure");
            }

            self.set_status(current, TaskStatus::Failed);
            newly_failed.push(current);
            stack.extend(self.tasks[current.0].downstream.iter().rev().copied());
        }

        newly_failed
    }

    fn start(&mut self, id: TaskId) -> RunningDelta {
        let task = &mut self.tasks[id.0];
        match task.backend.start() {
            Ok(()) => {
                info!(task = %task.name, kind = %task.backend.kind(), cmd = %task.backend.describe(), "task started");
                self.set_status(id, TaskStatus::Running);
                RunningDelta::Started
            }
            Err(err) => {
                error!(task = %task.name, error = %format!("{err:#}"), "failed to start task");
                self.fail(id);
                RunningDelta::Unchanged
            }
        }
    }

    fn poll(&mut self, id: TaskId) -> RunningDelta {
        let task = &mut self.tasks[id.0];
        if !task.backend.poll_completion() {
            return RunningDelta::Unchanged;
        }

        match task.backend.outcome().unwrap_or(TaskOutcome::Failed(-1)) {
            TaskOutcome::Success => {
                info!(task = %task.name, "task succeeded");
                self.succeed(id);
            }
            TaskOutcome::Failed(code) => {
                warn!(task = %task.name, exit_code = code, "task failed; failing downstream tasks");
                self.fail(id);
            }
        }
        RunningDelta::Finished
    }

    fn set_status(&mut self, id: TaskId, status: TaskStatus) {
        let task = &mut self.tasks[id.0];
        if task.status == TaskStatus::Running {
            *self.running = self.running.saturating_sub(1);
        }
        if status == TaskStatus::Running {
            *self.running += 1;
        }
        task.status = status;
    }
}
