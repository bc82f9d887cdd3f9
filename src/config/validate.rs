// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DagError, Result};
use crate::exec::TaskKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_names(cfg)?;
    validate_task_kinds(cfg)?;
    validate_task_dependencies(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DagError::ConfigError(
            "config must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_parallel_workers == 0 {
        return Err(DagError::ConfigError(
            "[config].max_parallel_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.tick_interval_ms == 0 {
        return Err(DagError::ConfigError(
            "[config].tick_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for task in &cfg.task {
        if task.name.trim().is_empty() {
            return Err(DagError::ConfigError(
                "every [[task]] needs a non-empty `name`".to_string(),
            ));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(DagError::DuplicateName(task.name.clone()));
        }
    }
    Ok(())
}

fn validate_task_kinds(cfg: &RawConfigFile) -> Result<()> {
    for task in &cfg.task {
        match task.kind.parse::<TaskKind>()? {
            TaskKind::InProcess => {
                return Err(DagError::ConfigError(format!(
                    "task '{}': in_process tasks can only be created from code",
                    task.name
                )));
            }
            TaskKind::Container if task.image.is_none() => {
                return Err(DagError::MissingParameter {
                    task: task.name.clone(),
                    kind: TaskKind::Container.to_string(),
                    param: "image",
                });
            }
            kind if task.command.is_none() => {
                return Err(DagError::MissingParameter {
                    task: task.name.clone(),
                    kind: kind.to_string(),
                    param: "command",
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let names: HashSet<&str> = cfg.task.iter().map(|t| t.name.as_str()).collect();

    for task in &cfg.task {
        for dep in &task.after {
            if !names.contains(dep.as_str()) {
                return Err(DagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    task.name, dep
                )));
            }
            if dep == &task.name {
                return Err(DagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    task.name
                )));
            }
        }
    }
    Ok(())
}
