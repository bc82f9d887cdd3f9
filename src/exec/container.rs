// src/exec/container.rs

//! Container backend.
//!
//! Each task gets a fresh, auto-removed container started through the docker
//! CLI (`docker run --rm ...`). The CLI stays attached, so the container's
//! exit code becomes the process exit code and its output lands in the task
//! log exactly like a shell task.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::bail;
use serde::Deserialize;
use tokio::process::Command;

use super::process::CapturedProcess;
use super::{Backend, LogSink, TaskKind, TaskOutcome};

/// Access mode of a bind-mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum VolumeMode {
    #[serde(rename = "ro")]
    ReadOnly,
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
}

impl VolumeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            VolumeMode::ReadOnly => "ro",
            VolumeMode::ReadWrite => "rw",
        }
    }
}

/// A host directory bound into every container created from an [`Image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host: PathBuf,
    pub container: String,
    pub mode: VolumeMode,
}

impl VolumeMount {
    /// `host:container:mode`, the argument to `docker run -v`.
    pub fn to_arg(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host.display(),
            self.container,
            self.mode.as_str()
        )
    }
}

/// Container image reference plus the volumes to mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    name: String,
    tag: String,
    volumes: Vec<VolumeMount>,
}

impl Image {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            volumes: Vec::new(),
        }
    }

    /// Parse `name[:tag]`; the tag defaults to `latest`.
    ///
    /// A colon that belongs to a registry port (`host:5000/app`) is not
    /// mistaken for the tag separator.
    pub fn parse(reference: &str) -> Self {
        let last_slash = reference.rfind('/').map_or(0, |i| i + 1);
        match reference[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                Self::new(&reference[..split], &reference[split + 1..])
            }
            None => Self::new(reference, "latest"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn volumes(&self) -> &[VolumeMount] {
        &self.volumes
    }

    /// `name:tag`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// Bind `host_path` (made absolute) to `container_path`.
    ///
    /// Mounting the same host path again replaces the earlier mount.
    pub fn add_volume(
        &mut self,
        host_path: impl AsRef<Path>,
        container_path: impl Into<String>,
        mode: VolumeMode,
    ) -> std::io::Result<()> {
        let host = std::path::absolute(host_path.as_ref())?;
        let mount = VolumeMount {
            host,
            container: container_path.into(),
            mode,
        };

        match self.volumes.iter_mut().find(|v| v.host == mount.host) {
            Some(existing) => *existing = mount,
            None => self.volumes.push(mount),
        }
        Ok(())
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

#[derive(Debug, Clone)]
enum ContainerCommand {
    /// Run through `sh -c` inside the container.
    Shell(String),
    /// Passed to the container as-is.
    Exec(Vec<String>),
}

/// Runs a command in a new container; exit code 0 means success.
#[derive(Debug)]
pub struct ContainerBackend {
    image: Image,
    command: ContainerCommand,
    runtime: String,
    sink: LogSink,
    process: Option<CapturedProcess>,
    outcome: Option<TaskOutcome>,
}

impl ContainerBackend {
    /// Run `command` through `sh -c` in a container of `image`.
    pub fn new(image: Image, command: impl Into<String>) -> Self {
        Self::with_command(image, ContainerCommand::Shell(command.into()))
    }

    /// Run `argv` directly as the container command.
    pub fn exec<I, S>(image: Image, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv = argv.into_iter().map(Into::into).collect();
        Self::with_command(image, ContainerCommand::Exec(argv))
    }

    fn with_command(image: Image, command: ContainerCommand) -> Self {
        Self {
            image,
            command,
            runtime: "docker".to_string(),
            sink: LogSink::new(),
            process: None,
            outcome: None,
        }
    }

    /// Use a docker-compatible CLI other than `docker` (e.g. `podman`).
    pub fn with_runtime(mut self, program: impl Into<String>) -> Self {
        self.runtime = program.into();
        self
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Arguments passed to the container CLI.
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        for volume in &self.image.volumes {
            args.push("-v".to_string());
            args.push(volume.to_arg());
        }
        args.push(self.image.reference());
        match &self.command {
            ContainerCommand::Shell(line) => {
                args.extend(["sh".to_string(), "-c".to_string(), line.clone()]);
            }
            ContainerCommand::Exec(argv) => args.extend(argv.iter().cloned()),
        }
        args
    }
}

impl Backend for ContainerBackend {
    fn kind(&self) -> TaskKind {
        TaskKind::Container
    }

    fn describe(&self) -> String {
        let command = match &self.command {
            ContainerCommand::Shell(line) => line.clone(),
            ContainerCommand::Exec(argv) => argv.join(" "),
        };
        format!("[{}] {}", self.image, command)
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if self.process.is_some() {
            bail!("container already started");
        }

        let mut cmd = Command::new(&self.runtime);
        cmd.args(self.run_args());

        self.process = Some(CapturedProcess::spawn(&self.runtime, cmd, &self.sink)?);
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
