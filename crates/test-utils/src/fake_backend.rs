use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::bail;
use taskdag::exec::{Backend, TaskKind, TaskOutcome};

#[derive(Debug, Default)]
struct TrackerState {
    active: usize,
    peak: usize,
    started: Vec<String>,
    finished: Vec<String>,
}

/// Shared recorder for a set of fake backends.
///
/// Tracks how many fakes are active (started, not yet reported complete),
/// the peak of that number, and the order in which fakes started and
/// finished.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.inner.lock().unwrap().active
    }

    pub fn peak(&self) -> usize {
        self.inner.lock().unwrap().peak
    }

    pub fn started(&self) -> Vec<String> {
        self.inner.lock().unwrap().started.clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.inner.lock().unwrap().finished.clone()
    }

    fn on_start(&self, label: &str) {
        let mut state = self.inner.lock().unwrap();
        state.active += 1;
        state.peak = state.peak.max(state.active);
        state.started.push(label.to_string());
    }

    fn on_finish(&self, label: &str) {
        let mut state = self.inner.lock().unwrap();
        state.active -= 1;
        state.finished.push(label.to_string());
    }
}

/// A scripted backend:
/// - reports completion on the `polls`-th `poll_completion` after start
/// - finishes with a chosen outcome
/// - can be told to fail in `start`
pub struct FakeBackend {
    label: String,
    polls_needed: usize,
    polls: usize,
    result: TaskOutcome,
    fail_start: bool,
    started: bool,
    outcome: Option<TaskOutcome>,
    tracker: Tracker,
}

impl FakeBackend {
    /// Succeeds on the first poll after start.
    pub fn new(label: &str, tracker: &Tracker) -> Self {
        Self {
            label: label.to_string(),
            polls_needed: 1,
            polls: 0,
            result: TaskOutcome::Success,
            fail_start: false,
            started: false,
            outcome: None,
            tracker: tracker.clone(),
        }
    }

    pub fn after_polls(mut self, polls: usize) -> Self {
        self.polls_needed = polls.max(1);
        self
    }

    pub fn with_outcome(mut self, outcome: TaskOutcome) -> Self {
        self.result = outcome;
        self
    }

    pub fn failing(self, code: i32) -> Self {
        self.with_outcome(TaskOutcome::Failed(code))
    }

    pub fn failing_to_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn finish(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(self.result);
            self.tracker.on_finish(&self.label);
        }
    }
}

impl Backend for FakeBackend {
    fn kind(&self) -> TaskKind {
        TaskKind::InProcess
    }

    fn describe(&self) -> String {
        format!("fake:{}", self.label)
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if self.fail_start {
            bail!("fake backend '{}' refused to start", self.label);
        }
        if self.started {
            bail!("fake backend '{}' already started", self.label);
        }
        self.started = true;
        self.tracker.on_start(&self.label);
        Ok(())
    }

    fn poll_completion(&mut self) -> bool {
        if !self.started {
            return false;
        }
        if self.outcome.is_some() {
            return true;
        }
        self.polls += 1;
        if self.polls >= self.polls_needed {
            self.finish();
            return true;
        }
        false
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.started {
                self.finish();
            }
        })
    }

    fn logs(&self) -> String {
        if self.started {
            format!("{} started\n", self.label)
        } else {
            String::new()
        }
    }
}
