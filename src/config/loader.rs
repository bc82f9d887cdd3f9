// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{CommandSpec, ConfigFile, RawConfigFile, TaskConfig};
use crate::dag::{Graph, GraphOptions};
use crate::errors::Result;
use crate::exec::{Image, TaskParams};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Checks for at least one task, sane `[config]` values, unique names, known
/// kinds with their required parameters, and `after` references that name
/// other tasks. Cycles are rejected later, by [`build_graph`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config path: `Taskdag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskdag.toml")
}

/// Build a [`Graph`] from a validated config.
///
/// Tasks are added in file order, then every `after` edge is declared, so a
/// dependency cycle surfaces as [`DagError::Cycle`](crate::errors::DagError::Cycle).
pub fn build_graph(cfg: &ConfigFile, options: GraphOptions) -> Result<Graph> {
    let mut graph = Graph::with_options(options)?;

    for task in &cfg.task {
        let params = task_params(task)?;
        graph.new_task_of_kind(task.name.clone(), &task.kind, params)?;
    }

    for task in &cfg.task {
        let downstream = graph.id_of(&task.name)?;
        for dep in &task.after {
            let upstream = graph.id_of(dep)?;
            graph.declare_dependency(upstream, downstream)?;
        }
    }

    debug!(tasks = graph.len(), "graph built from config");
    Ok(graph)
}

fn task_params(task: &TaskConfig) -> Result<TaskParams> {
    let mut params = TaskParams::new();

    match &task.command {
        Some(CommandSpec::Line(line)) => params = params.command(line.clone()),
        Some(CommandSpec::Argv(argv)) => params = params.argv(argv.iter().cloned()),
        None => {}
    }

    if let Some(reference) = &task.image {
        let mut image = Image::parse(reference);
        for volume in &task.volumes {
            image.add_volume(&volume.host, volume.container.clone(), volume.mode)?;
        }
        params = params.image(image);
    }

    Ok(params)
}
