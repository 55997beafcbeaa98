use chrono::{NaiveDateTime, TimeDelta};

/// Pausable stopwatch driven by event timestamps rather than the wall clock,
/// so replaying history yields the same durations as live tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwatch {
    accumulated: TimeDelta,
    running_since: Option<NaiveDateTime>,
}

impl Stopwatch {
    pub fn start(&mut self, at: NaiveDateTime) {
        if self.running_since.is_none() {
            self.running_since = Some(at);
        }
    }

    pub fn stop(&mut self, at: NaiveDateTime) {
        if let Some(since) = self.running_since.take() {
            // Out-of-order timestamps never subtract time
            self.accumulated += (at - since).max(TimeDelta::zero());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Accumulated time, including the running segment up to `at`
    pub fn elapsed(&self, at: NaiveDateTime) -> TimeDelta {
        match self.running_since {
            Some(since) => self.accumulated + (at - since).max(TimeDelta::zero()),
            None => self.accumulated,
        }
    }

    /// Accumulated time of stopped segments only
    pub fn total(&self) -> TimeDelta {
        self.accumulated
    }
}
