//! Progress output for lifecycle transitions.

use super::phase::PhaseEvent;
use std::sync::{Arc, Mutex};

/// Append-only sink for phase events.
pub trait ProgressReporter {
    /// Record one event
    fn report(&self, event: &PhaseEvent);
}

/// Writes each event as an `info` log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, event: &PhaseEvent) {
        log::info!("{}", event);
    }
}

/// Keeps rendered lines in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines recorded so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Lines joined the way a log file shows them, one per line
    pub fn output(&self) -> String {
        self.lines()
            .iter()
            .map(|line| format!("{}\n", line))
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: &PhaseEvent) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.to_string());
    }
}
