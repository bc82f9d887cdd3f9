// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and turn it into a graph (`loader.rs`).
//! - Validate basic invariants like names and references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{build_graph, default_config_path, load_and_validate, load_from_path};
pub use model::{CommandSpec, ConfigFile, ConfigSection, RawConfigFile, TaskConfig, VolumeConfig};
