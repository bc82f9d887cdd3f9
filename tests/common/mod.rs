#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub use taskdag_test_utils::{init_tracing, with_timeout};

/// Write `contents` to a fresh temporary `.toml` file.
pub fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}
