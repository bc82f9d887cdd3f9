// src/exec/process.rs

//! Child-process plumbing shared by the shell and container backends.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{LogSink, TaskOutcome};

/// How long output readers may lag behind process exit before the outcome is
/// reported anyway. A background grandchild that inherited the pipes keeps
/// them open past this point; its output is still appended afterwards.
pub const OUTPUT_DRAIN_WINDOW: Duration = Duration::from_millis(250);

/// A spawned child whose stdout and stderr are being copied into a
/// [`LogSink`].
///
/// The process counts as finished once it has exited and either both output
/// readers hit EOF or [`OUTPUT_DRAIN_WINDOW`] has passed since the exit.
#[derive(Debug)]
pub struct CapturedProcess {
    label: String,
    child: Child,
    readers: Vec<JoinHandle<()>>,
    exit_code: Option<i32>,
    exited_at: Option<Instant>,
}

impl CapturedProcess {
    /// Spawn `cmd` with piped output. Requires a Tokio runtime.
    pub fn spawn(label: &str, mut cmd: Command, sink: &LogSink) -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .context("processes must be spawned inside a Tokio runtime")?;

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process `{label}`"))?;

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(copy_lines(label, "stdout", stdout, sink.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(copy_lines(label, "stderr", stderr, sink.clone()));
        }

        debug!(process = %label, pid = child.id(), "process spawned");

        Ok(Self {
            label: label.to_string(),
            child,
            readers,
            exit_code: None,
            exited_at: None,
        })
    }

    /// Non-blocking: `Some(outcome)` once the process exited and its output
    /// has been drained, or the drain window ran out.
    pub fn try_finish(&mut self) -> Option<TaskOutcome> {
        if self.exit_code.is_none() {
            let code = match self.child.try_wait() {
                Ok(Some(status)) => status.code().unwrap_or(-1),
                Ok(None) => return None,
                Err(e) => {
                    warn!(process = %self.label, error = %e, "failed to poll child process");
                    -1
                }
            };
            self.exit_code = Some(code);
            self.exited_at = Some(Instant::now());
        }

        let drained = self.readers.iter().all(JoinHandle::is_finished);
        let window_over = self
            .exited_at
            .is_some_and(|at| at.elapsed() >= OUTPUT_DRAIN_WINDOW);
        if !drained && !window_over {
            return None;
        }
        if !drained {
            debug!(process = %self.label, "output still open after exit; not waiting for it");
        }
        self.exit_code.map(TaskOutcome::from_exit_code)
    }

    /// Block until the process exited and its output is drained, waiting at
    /// most [`OUTPUT_DRAIN_WINDOW`] for the output after the exit.
    pub async fn wait(&mut self) -> TaskOutcome {
        if self.exit_code.is_none() {
            let code = match self.child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    warn!(process = %self.label, error = %e, "failed to wait for child process");
                    -1
                }
            };
            self.exit_code = Some(code);
            self.exited_at = Some(Instant::now());
        }

        let deadline = self.exited_at.unwrap_or_else(Instant::now) + OUTPUT_DRAIN_WINDOW;
        for reader in self.readers.iter_mut().filter(|r| !r.is_finished()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, reader).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(process = %self.label, error = %e, "output reader ended abnormally");
                }
                Err(_) => {
                    debug!(process = %self.label, "output still open after exit; not waiting for it");
                    break;
                }
            }
        }

        TaskOutcome::from_exit_code(self.exit_code.unwrap_or(-1))
    }
}

/// Copy `stream` line by line into `sink` until EOF.
///
/// Lines are read as bytes; invalid UTF-8 is replaced rather than ending the
/// copy, which would close the pipe under the child.
fn copy_lines<R>(label: &str, stream: &'static str, reader: R, sink: LogSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let label = label.to_string();
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => sink.append(&String::from_utf8_lossy(&line)),
                Err(e) => {
                    warn!(process = %label, stream, error = %e, "stopped reading process output");
                    break;
                }
            }
        }
    })
}
