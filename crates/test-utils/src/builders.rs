#![allow(dead_code)]

use std::time::Duration;

use taskdag::dag::{Graph, GraphOptions, Task, TaskId};
use taskdag::exec::TaskOutcome;

use crate::fake_backend::{FakeBackend, Tracker};

/// Graph options with a short tick so async runs finish quickly.
pub fn fast_options(max_parallel_workers: usize) -> GraphOptions {
    GraphOptions {
        max_parallel_workers,
        tick_interval: Duration::from_millis(2),
    }
}

/// Builder for graphs of [`FakeBackend`] tasks sharing one [`Tracker`].
pub struct FakeGraphBuilder {
    graph: Graph,
    tracker: Tracker,
}

impl FakeGraphBuilder {
    pub fn new(max_parallel_workers: usize) -> Self {
        Self {
            graph: Graph::with_options(fast_options(max_parallel_workers))
                .expect("valid graph options"),
            tracker: Tracker::new(),
        }
    }

    /// Add a task that succeeds on its first poll.
    pub fn ok(&mut self, name: &str) -> TaskId {
        let backend = FakeBackend::new(name, &self.tracker);
        self.add(name, backend)
    }

    /// Add a task that fails with `code` on its first poll.
    pub fn failing(&mut self, name: &str, code: i32) -> TaskId {
        let backend = FakeBackend::new(name, &self.tracker).failing(code);
        self.add(name, backend)
    }

    /// Add a task with a fully customised backend.
    pub fn add(&mut self, name: &str, backend: FakeBackend) -> TaskId {
        self.graph
            .add_task(Task::new(name, backend))
            .expect("unique task name")
    }

    pub fn edge(&mut self, upstream: TaskId, downstream: TaskId) -> &mut Self {
        self.graph
            .declare_dependency(upstream, downstream)
            .expect("acyclic edge");
        self
    }

    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }

    pub fn build(self) -> (Graph, Tracker) {
        (self.graph, self.tracker)
    }
}

/// Diamond `A -> {B, C} -> D` with the given outcome for each task.
pub fn diamond(outcomes: [TaskOutcome; 4], max_parallel_workers: usize) -> (Graph, Tracker) {
    let mut b = FakeGraphBuilder::new(max_parallel_workers);
    let tracker = b.tracker();
    let ids: Vec<TaskId> = ["A", "B", "C", "D"]
        .iter()
        .zip(outcomes)
        .map(|(name, outcome)| b.add(name, FakeBackend::new(name, &tracker).with_outcome(outcome)))
        .collect();

    b.edge(ids[0], ids[1])
        .edge(ids[0], ids[2])
        .edge(ids[1], ids[3])
        .edge(ids[2], ids[3]);
    b.build()
}
