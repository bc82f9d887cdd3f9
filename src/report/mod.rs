// src/report/mod.rs

//! Read-only projections of graph state: snapshots, text and DOT rendering.

pub mod render;
pub mod snapshot;

pub use render::{render_dot, render_text};
pub use snapshot::{GraphSnapshot, TaskSnapshot};
