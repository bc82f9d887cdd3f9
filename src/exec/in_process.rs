// src/exec/in_process.rs

//! In-process backend: runs a Rust closure on Tokio's blocking pool.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use anyhow::Context;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::warn;

use super::{Backend, LogSink, TaskKind, TaskOutcome};

/// Work run by an [`InProcessBackend`].
///
/// The callable receives the task's own [`LogSink`]; anything written to it
/// shows up in the task logs. Returning `Err` (or panicking) fails the task.
pub type Callable = Box<dyn FnOnce(LogSink) -> anyhow::Result<()> + Send + 'static>;

pub struct InProcessBackend {
    callable: Option<Callable>,
    sink: LogSink,
    started: bool,
    done_rx: Option<oneshot::Receiver<TaskOutcome>>,
    outcome: Option<TaskOutcome>,
}

impl fmt::Debug for InProcessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessBackend")
            .field("started", &self.started)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl InProcessBackend {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(LogSink) -> anyhow::Result<()> + Send + 'static,
    {
        Self::from_boxed(Box::new(f))
    }

    pub fn from_boxed(callable: Callable) -> Self {
        Self {
            callable: Some(callable),
            sink: LogSink::new(),
            started: false,
            done_rx: None,
            outcome: None,
        }
    }

    fn record(&mut self, received: Option<TaskOutcome>) {
        // A dropped sender means the callable panicked.
        self.outcome = Some(received.unwrap_or(TaskOutcome::Failed(-1)));
        self.done_rx = None;
    }
}

impl Backend for InProcessBackend {
    fn kind(&self) -> TaskKind {
        TaskKind::InProcess
    }

    fn describe(&self) -> String {
        "<in-process callable>".to_string()
    }

    fn start(&mut self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("in-process tasks must be started inside a Tokio runtime")?;
        let callable = self
            .callable
            .take()
            .context("in-process callable already started")?;
        let (done_tx, done_rx) = oneshot::channel();
        let sink = self.sink.clone();

        runtime.spawn_blocking(move || {
            let outcome = match callable(sink) {
                Ok(()) => TaskOutcome::Success,
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "in-process callable returned an error");
                    TaskOutcome::Failed(-1)
                }
            };
            let _ = done_tx.send(outcome);
        });

        self.started = true;
        self.done_rx = Some(done_rx);
        Ok(())
    }

    fn poll_completion(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        let Some(done_rx) = self.done_rx.as_mut() else {
            return false;
        };
        match done_rx.try_recv() {
            Ok(outcome) => self.record(Some(outcome)),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => self.record(None),
        }
        true
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(done_rx) = self.done_rx.take() {
                let received = done_rx.await.ok();
                self.record(received);
            }
        })
    }

    fn logs(&self) -> String {
        self.sink.contents()
    }
}
