// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`task`] holds the task type and its status.
//! - [`graph`] owns the tasks, validates edges and runs the scheduling loop.
//! - [`state_manager`] applies status transitions and failure cascades.
//! - [`chain`] provides fluent dependency declaration.
//! - [`scheduler_step`] defines the tick and run result types.

pub mod chain;
pub mod graph;
pub mod scheduler_step;
pub mod state_manager;
pub mod task;

pub use chain::{Chain, TaskSet};
pub use graph::{Graph, GraphOptions};
pub use scheduler_step::{RunSummary, TickReport};
pub use state_manager::{RunningDelta, StateManager};
pub use task::{Task, TaskId, TaskStatus};
