// src/exec/backend.rs

//! Pluggable backend abstraction.
//!
//! The scheduler talks to a `Backend` instead of to processes or threads
//! directly. Production code uses [`ShellBackend`], [`ContainerBackend`] and
//! [`InProcessBackend`]; tests provide their own implementation that
//! completes after a scripted number of polls.

use std::future::Future;
use std::pin::Pin;

use crate::errors::{DagError, Result};

use super::{
    Callable, ContainerBackend, Image, InProcessBackend, ShellBackend, TaskKind, TaskOutcome,
};

/// Lifecycle contract every execution backend fulfils.
///
/// The scheduling loop only ever calls `start`, `poll_completion` and
/// `outcome`, and never blocks on any of them. `wait` exists for manual and
/// test flows that want to block until the work is done.
pub trait Backend: Send {
    /// Which variant this backend is (used for reporting only).
    fn kind(&self) -> TaskKind;

    /// Short human-readable description of the work, e.g. the command line.
    fn describe(&self) -> String;

    /// Begin execution. Must return as soon as the work is initiated.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Non-blocking completion check.
    ///
    /// Once this returns `true`, [`Backend::outcome`] returns `Some`.
    fn poll_completion(&mut self) -> bool;

    /// Outcome of the finished work, `None` while still running.
    fn outcome(&self) -> Option<TaskOutcome>;

    /// Resolve once execution has finished.
    ///
    /// Resolves immediately if the backend was never started.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Output captured so far; empty before `start`.
    fn logs(&self) -> String;
}

/// Kind-specific parameters for [`backend_for_kind`].
///
/// Which fields are required depends on the kind:
/// - `shell`: `argv`, or `command` (run through the platform shell)
/// - `container`: `image`, plus `command` (run through `sh -c` inside the
///   container) or `argv` (exec form)
/// - `in_process`: `callable`
#[derive(Default)]
pub struct TaskParams {
    pub image: Option<Image>,
    pub command: Option<String>,
    pub argv: Option<Vec<String>>,
    pub callable: Option<Callable>,
}

impl TaskParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(mut self, image: Image) -> Self {
        self.image = Some(image);
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    pub fn callable<F>(mut self, f: F) -> Self
    where
        F: FnOnce(super::LogSink) -> anyhow::Result<()> + Send + 'static,
    {
        self.callable = Some(Box::new(f));
        self
    }
}

/// Build the backend for a textual kind (`"container"`, `"shell"`,
/// `"in_process"`).
///
/// Returns [`DagError::UnknownTaskKind`] for an unrecognised kind and
/// [`DagError::MissingParameter`] when the kind's parameters are absent.
pub fn backend_for_kind(task: &str, kind: &str, params: TaskParams) -> Result<Box<dyn Backend>> {
    let kind: TaskKind = kind.parse()?;
    let missing = |param: &'static str| DagError::MissingParameter {
        task: task.to_string(),
        kind: kind.to_string(),
        param,
    };

    let backend: Box<dyn Backend> = match kind {
        TaskKind::Shell => match (params.argv, params.command) {
            (Some(argv), _) if !argv.is_empty() => Box::new(ShellBackend::new(argv)),
            (_, Some(line)) => Box::new(ShellBackend::from_command_line(line)),
            _ => return Err(missing("command")),
        },
        TaskKind::Container => {
            let image = params.image.ok_or_else(|| missing("image"))?;
            match (params.command, params.argv) {
                (Some(line), _) => Box::new(ContainerBackend::new(image, line)),
                (None, Some(argv)) if !argv.is_empty() => {
                    Box::new(ContainerBackend::exec(image, argv))
                }
                _ => return Err(missing("command")),
            }
        }
        TaskKind::InProcess => {
            let callable = params.callable.ok_or_else(|| missing("callable"))?;
            Box::new(InProcessBackend::from_boxed(callable))
        }
    };

    Ok(backend)
}
