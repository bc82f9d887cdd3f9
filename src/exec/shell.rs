// src/exec/shell.rs

//! Local command backend.

use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, bail};
use tokio::process::Command;

use super::process::CapturedProcess;
use super::{Backend, LogSink, TaskKind, TaskOutcome};

/// Runs a local command; exit code 0 means success.
///
/// stdout and stderr are both captured into the task log.
#[derive(Debug)]
pub struct ShellBackend {
    argv: Vec<String>,
    sink: LogSink,
    process: Option<CapturedProcess>,
    outcome: Option<TaskOutcome>,
}

impl ShellBackend {
    /// Run `argv[0]` with the remaining elements as arguments.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            sink: LogSink::new(),
            process: None,
            outcome: None,
        }
    }

    /// Run a whole command line through the platform shell
    /// (`sh -c` or `cmd /C`).
    pub fn from_command_line(line: impl Into<String>) -> Self {
        let line = line.into();
        if cfg!(windows) {
            Self::new(["cmd".to_string(), "/C".to_string(), line])
        } else {
            Self::new(["sh".to_string(), "-c".to_string(), line])
        }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl Backend for ShellBackend {
    fn kind(&self) -> TaskKind {
        TaskKind::Shell
    }

    fn describe(&self) -> String {
        self.argv.join(" ")
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if self.process.is_some() {
            bail!("shell command already started");
        }
        let (program, args) = self
            .argv
            .split_first()
            .context("shell task has an empty command")?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        self.process = Some(CapturedProcess::spawn(program, cmd, &self.sink)?);
        Ok(())
    }

    fn poll_completion(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.process.as_mut().and_then(CapturedProcess::try_finish) {
            Some(outcome) => {
                self.outcome = Some(outcome);
                true
            }
            None => false,
        }
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.outcome.is_some() {
                return;
            }
            if let Some(process) = self.process.as_mut() {
                self.outcome = Some(process.wait().await);
            }
        })
    }

    fn logs(&self) -> String {
        self.sink.contents()
    }
}
