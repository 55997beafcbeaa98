//! Tracked play sessions.

mod run;
mod stopwatch;

pub use run::ActiveRun;
pub use stopwatch::Stopwatch;
pub use waystone_types::{ActivityRecord, ActivityType};

use chrono::{NaiveDateTime, TimeDelta};

/// Area levels from this value up are maps; tier = level - 67.
const FIRST_MAP_LEVEL: u32 = 68;
const MAP_TIER_OFFSET: u32 = 67;
const MAX_MAP_TIER: u32 = 16;

/// Map tier for an area level, 0 below the first map level.
pub fn map_tier(area_level: u32) -> u32 {
    if area_level >= FIRST_MAP_LEVEL {
        (area_level - MAP_TIER_OFFSET).min(MAX_MAP_TIER)
    } else {
        0
    }
}

/// One tracked play session. Mutated by the tracker until finished,
/// then projected into an [`ActivityRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub area: String,
    pub kind: ActivityType,
    pub area_level: u32,
    pub started_at: NaiveDateTime,
    pub last_ended_at: Option<NaiveDateTime>,
    pub instance_endpoint: String,

    // --- Timing ---
    stopwatch: Stopwatch,
    pause_started: Option<NaiveDateTime>,
    paused: TimeDelta,
    pub manually_paused: bool,

    // --- Counters ---
    pub death_counter: u32,
    pub portals_used: u32,
    pub trial_round_count: u32,

    // --- Outcome ---
    tags: Vec<String>,
    pub success: bool,
    pub trialmaster_success: bool,
    pub trialmaster_full_finished: bool,
}

impl Activity {
    pub fn new(
        area: impl Into<String>,
        kind: ActivityType,
        area_level: u32,
        started_at: NaiveDateTime,
        instance_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            area: area.into(),
            kind,
            area_level,
            started_at,
            last_ended_at: None,
            instance_endpoint: instance_endpoint.into(),
            stopwatch: Stopwatch::default(),
            pause_started: None,
            paused: TimeDelta::zero(),
            manually_paused: false,
            death_counter: 0,
            portals_used: 0,
            trial_round_count: 0,
            tags: Vec::new(),
            success: false,
            trialmaster_success: false,
            trialmaster_full_finished: false,
        }
    }

    /// Unix seconds of the start; half of the record identity.
    pub fn timestamp(&self) -> i64 {
        self.started_at.and_utc().timestamp()
    }

    pub fn map_tier(&self) -> u32 {
        map_tier(self.area_level)
    }

    // --- Stopwatch ---

    pub fn start_stopwatch(&mut self, at: NaiveDateTime) {
        self.stopwatch.start(at);
    }

    pub fn stop_stopwatch(&mut self, at: NaiveDateTime) {
        self.stopwatch.stop(at);
    }

    pub fn stopwatch_running(&self) -> bool {
        self.stopwatch.is_running()
    }

    pub fn stopwatch_elapsed(&self, at: NaiveDateTime) -> TimeDelta {
        self.stopwatch.elapsed(at)
    }

    /// Chat `pause`: freezes the stopwatch until `resume`.
    pub fn pause(&mut self, at: NaiveDateTime) {
        if !self.manually_paused {
            self.stopwatch.stop(at);
            self.manually_paused = true;
        }
    }

    pub fn resume(&mut self, at: NaiveDateTime) {
        if self.manually_paused {
            self.manually_paused = false;
            self.stopwatch.start(at);
        }
    }

    // --- Camp/hideout pauses ---

    pub fn start_pause(&mut self, at: NaiveDateTime) {
        if self.pause_started.is_none() {
            self.pause_started = Some(at);
        }
    }

    pub fn end_pause(&mut self, at: NaiveDateTime) {
        if let Some(since) = self.pause_started.take() {
            self.paused += (at - since).max(TimeDelta::zero());
        }
    }

    pub fn is_pause_open(&self) -> bool {
        self.pause_started.is_some()
    }

    pub fn paused(&self) -> TimeDelta {
        self.paused
    }

    /// Closes any open pause and stops the stopwatch.
    pub fn stop_all(&mut self, at: NaiveDateTime) {
        self.end_pause(at);
        self.stopwatch.stop(at);
    }

    /// Stopwatch total minus paused total, never negative
    pub fn elapsed(&self) -> TimeDelta {
        (self.stopwatch.total() - self.paused).max(TimeDelta::zero())
    }

    // --- Tags ---

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns false if the tag was already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        before != self.tags.len()
    }

    pub fn to_record(&self, is_zana: bool) -> ActivityRecord {
        ActivityRecord {
            timestamp: self.timestamp(),
            kind: self.kind,
            area: self.area.clone(),
            area_level: self.area_level,
            duration_secs: self.elapsed().num_seconds(),
            death_counter: self.death_counter,
            round_count: self.trial_round_count,
            is_zana,
            tags: self.tags.clone(),
            success: self.success,
        }
    }
}
