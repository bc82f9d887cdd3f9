// src/exec/mod.rs

//! Execution backends.
//!
//! A [`Task`](crate::dag::Task) never runs anything itself; it delegates to a
//! [`Backend`] that knows how to start work, poll it without blocking, and
//! report captured output.
//!
//! - [`backend`] defines the `Backend` contract and kind-based construction.
//! - [`shell`] runs a local command with `tokio::process::Command`.
//! - [`container`] runs a command in a fresh container through the docker CLI.
//! - [`in_process`] runs a Rust closure on the blocking thread pool.
//! - [`process`] holds the child-process plumbing shared by shell and container.
//! - [`log_sink`] is the per-task output buffer.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::DagError;

pub mod backend;
pub mod container;
pub mod in_process;
pub mod log_sink;
pub mod process;
pub mod shell;

pub use backend::{Backend, TaskParams, backend_for_kind};
pub use container::{ContainerBackend, Image, VolumeMode, VolumeMount};
pub use in_process::{Callable, InProcessBackend};
pub use log_sink::LogSink;
pub use shell::ShellBackend;

/// Outcome of a finished backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Nonzero exit code, or `-1` when no code is available (spawn error,
    /// signal, panic, returned `Err`).
    Failed(i32),
}

impl TaskOutcome {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            TaskOutcome::Success
        } else {
            TaskOutcome::Failed(code)
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// The backend variants a task can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Container,
    Shell,
    InProcess,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Container => "container",
            TaskKind::Shell => "shell",
            TaskKind::InProcess => "in_process",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = DagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "container" | "docker" => Ok(TaskKind::Container),
            "shell" => Ok(TaskKind::Shell),
            "in_process" | "inprocess" | "in-process" => Ok(TaskKind::InProcess),
            other => Err(DagError::UnknownTaskKind(other.to_string())),
        }
    }
}
