// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only construction-time faults are errors. A task whose backend reports a
//! failure is not an error: it is a task in the `Failed` state.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagError {
    #[error("Unknown task kind: '{0}' (expected \"container\", \"shell\" or \"in_process\")")]
    UnknownTaskKind(String),

    #[error("Duplicate task name: '{0}'")]
    DuplicateName(String),

    #[error("Cycle detected: '{downstream}' cannot depend on '{upstream}'")]
    Cycle { upstream: String, downstream: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task '{task}' of kind {kind} is missing required parameter `{param}`")]
    MissingParameter {
        task: String,
        kind: String,
        param: &'static str,
    },

    #[error("Invalid graph options: {0}")]
    InvalidOptions(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagError>;
