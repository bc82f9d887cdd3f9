// src/dag/chain.rs

//! Fluent dependency declaration.
//!
//! ```no_run
//! # use taskdag::dag::Graph;
//! # use taskdag::dag::Task;
//! # fn main() -> taskdag::errors::Result<()> {
//! let mut graph = Graph::new();
//! let a = graph.add_task(Task::shell("a", ["true"]))?;
//! let b = graph.add_task(Task::shell("b", ["true"]))?;
//! let c = graph.add_task(Task::shell("c", ["true"]))?;
//! let d = graph.add_task(Task::shell("d", ["true"]))?;
//!
//! // a before b and c, both before d
//! graph.chain(a).then([b, c])?.then(d)?;
//! # Ok(())
//! # }
//! ```

use crate::dag::task::TaskId;
use crate::dag::Graph;
use crate::errors::Result;

/// One task or a list of tasks on either side of a dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSet(Vec<TaskId>);

impl TaskSet {
    pub fn ids(&self) -> &[TaskId] {
        &self.0
    }
}

impl From<TaskId> for TaskSet {
    fn from(id: TaskId) -> Self {
        TaskSet(vec![id])
    }
}

impl From<Vec<TaskId>> for TaskSet {
    fn from(ids: Vec<TaskId>) -> Self {
        TaskSet(ids)
    }
}

impl From<&[TaskId]> for TaskSet {
    fn from(ids: &[TaskId]) -> Self {
        TaskSet(ids.to_vec())
    }
}

impl<const N: usize> From<[TaskId; N]> for TaskSet {
    fn from(ids: [TaskId; N]) -> Self {
        TaskSet(ids.to_vec())
    }
}

/// Cursor returned by [`Graph::chain`].
///
/// Each [`Chain::then`] makes every task of its argument depend on every
/// task currently held, then holds the argument.
pub struct Chain<'g> {
    graph: &'g mut Graph,
    current: TaskSet,
}

impl<'g> Chain<'g> {
    pub(crate) fn new(graph: &'g mut Graph, start: TaskSet) -> Self {
        Self {
            graph,
            current: start,
        }
    }

    pub fn then(self, next: impl Into<TaskSet>) -> Result<Chain<'g>> {
        let next = next.into();
        self.graph
            .declare_dependencies(self.current, next.clone())?;
        Ok(Chain {
            graph: self.graph,
            current: next,
        })
    }

    /// Tasks currently held by the cursor.
    pub fn tasks(&self) -> &[TaskId] {
        self.current.ids()
    }
}
