//! Shared configuration and record types for Waystone
//!
//! This crate contains the serializable types shared between the tracking
//! engine (waystone-core) and its front ends (waystone-cli).

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Activity Types
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of tracked play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    Map,
    Heist,
    Labyrinth,
    Simulacrum,
    BlightedMap,
    Delve,
    Temple,
}

impl ActivityType {
    /// Storage identifier (lowercase, stable across versions)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Map => "map",
            ActivityType::Heist => "heist",
            ActivityType::Labyrinth => "labyrinth",
            ActivityType::Simulacrum => "simulacrum",
            ActivityType::BlightedMap => "blighted_map",
            ActivityType::Delve => "delve",
            ActivityType::Temple => "temple",
        }
    }

    /// Parse a storage identifier. Unknown values fall back to `Map`.
    pub fn from_storage(s: &str) -> Self {
        match s {
            "heist" => ActivityType::Heist,
            "labyrinth" => ActivityType::Labyrinth,
            "simulacrum" => ActivityType::Simulacrum,
            "blighted_map" => ActivityType::BlightedMap,
            "delve" => ActivityType::Delve,
            "temple" => ActivityType::Temple,
            _ => ActivityType::Map,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted projection of a finished activity.
///
/// Identity is `(timestamp, area)`; the only field edited after creation is `tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Unix seconds of the activity start
    pub timestamp: i64,
    pub kind: ActivityType,
    pub area: String,
    pub area_level: u32,
    pub duration_secs: i64,
    pub death_counter: u32,
    /// Ultimatum rounds or labyrinth trials, depending on `kind`
    pub round_count: u32,
    /// True for a sub-map opened from within another map
    pub is_zana: bool,
    pub tags: Vec<String>,
    pub success: bool,
}

impl ActivityRecord {
    pub fn key(&self) -> (i64, &str) {
        (self.timestamp, self.area.as_str())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Config
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for log quirks that upstream client versions may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// The Shaper's death dialogue is written this many times per kill.
    #[serde(default = "default_shaper_kill_lines")]
    pub shaper_kill_lines: u32,

    /// Drop labyrinth runs that neither completed nor ended in a death
    /// (usually a disconnect or crash mid-run).
    #[serde(default = "default_true")]
    pub discard_incomplete_labs: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            shaper_kill_lines: default_shaper_kill_lines(),
            discard_incomplete_labs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the game's Client.txt
    #[serde(default)]
    pub log_file: String,

    /// Override for the database and checkpoint directory
    #[serde(default)]
    pub data_directory: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_checkpoint_interval_secs")]
    pub checkpoint_interval_secs: u64,

    #[serde(default = "default_replay_cache_capacity")]
    pub replay_cache_capacity: usize,

    #[serde(default)]
    pub tracker: TrackerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_log_file(String::new())
    }
}

impl AppConfig {
    pub fn with_log_file(log_file: String) -> Self {
        Self {
            log_file,
            data_directory: None,
            poll_interval_ms: default_poll_interval_ms(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
            replay_cache_capacity: default_replay_cache_capacity(),
            tracker: TrackerSettings::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_shaper_kill_lines() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_checkpoint_interval_secs() -> u64 {
    60
}

fn default_replay_cache_capacity() -> usize {
    65_536
}
