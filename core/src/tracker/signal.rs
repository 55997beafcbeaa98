use chrono::NaiveDateTime;
use std::time::Duration;
use waystone_types::{ActivityRecord, ActivityType};

/// Signals emitted by the ActivityTracker for front ends.
/// These are the things worth showing, at a higher level than log lines.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerSignal {
    // Activity lifecycle
    ActivityStarted {
        area: String,
        kind: ActivityType,
        started_at: NaiveDateTime,
        /// Sub-map opened from within the current map
        nested: bool,
    },
    /// Record newly persisted
    ActivityFinished(ActivityRecord),
    /// Run dropped without a record (incomplete labyrinth)
    ActivityDiscarded {
        area: String,
        kind: ActivityType,
        started_at: NaiveDateTime,
    },
    PauseChanged {
        area: String,
        paused: bool,
    },
    TagsChanged {
        area: String,
        tags: Vec<String>,
    },

    // Counters
    StatChanged {
        name: String,
        value: i64,
    },

    /// Existing log content consumed; later signals are live.
    Ready {
        catch_up: Duration,
        lines: u64,
    },

    /// Persisted state loaded at session start
    Restored {
        history: Vec<ActivityRecord>,
        counters: Vec<(String, i64)>,
    },
}
