// src/exec/log_sink.rs

//! Per-task output buffer.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable, thread-safe text buffer that collects a task's output.
///
/// Every backend owns one sink. Process backends feed child stdout/stderr
/// into it; the in-process backend hands a clone to the callable, which
/// writes to it with `write!`/`writeln!` instead of printing.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    buf: Arc<Mutex<String>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, text: &str) {
        self.lock().push_str(text);
    }

    /// Everything captured so far.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        // A writer that panicked mid-append leaves valid UTF-8 behind.
        self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl io::Write for LogSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.append(&String::from_utf8_lossy(bytes));
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for LogSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}
