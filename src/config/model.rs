// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::GraphOptions;
use crate::exec::VolumeMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// max_parallel_workers = 2
/// tick_interval_ms = 500
///
/// [[task]]
/// name = "build"
/// kind = "shell"
/// command = ["cargo", "build"]
///
/// [[task]]
/// name = "test"
/// kind = "container"
/// image = "rust:1.85"
/// command = "cargo test"
/// volumes = [{ host = ".", container = "/src", mode = "ro" }]
/// after = ["build"]
/// ```
///
/// Tasks are kept in file order, which becomes the graph's insertion order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global scheduling config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[[task]]`.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// A validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: Vec<TaskConfig>) -> Self {
        Self { config, task }
    }

    /// Graph options described by `[config]`.
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            max_parallel_workers: self.config.max_parallel_workers,
            tick_interval: Duration::from_millis(self.config.tick_interval_ms),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of tasks running at the same time.
    #[serde(default = "default_max_parallel_workers")]
    pub max_parallel_workers: usize,

    /// Scheduling loop period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_max_parallel_workers() -> usize {
    1
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_parallel_workers: default_max_parallel_workers(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// A command given either as one shell line or as an argv list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Unique task name.
    pub name: String,

    /// `"shell"` or `"container"`.
    pub kind: String,

    /// Command to run. A string goes through a shell; a list is executed
    /// as-is.
    #[serde(default)]
    pub command: Option<CommandSpec>,

    /// Container image (`name[:tag]`); required for `kind = "container"`.
    #[serde(default)]
    pub image: Option<String>,

    /// Bind mounts for container tasks.
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,
}

/// `{ host = "...", container = "...", mode = "ro" }`.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeConfig {
    pub host: PathBuf,
    pub container: String,
    #[serde(default)]
    pub mode: VolumeMode,
}
