use super::StatsAggregate;
use crate::activity::{ActiveRun, Activity, ActivityRecord};
use crate::client_log::EventKind;
use hashbrown::HashSet;

/// Whether events are being replayed from existing log content or arrive live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    #[default]
    CatchUp,
    Live,
}

/// Pure storage for tracking state.
/// Routing logic lives in ActivityTracker.
#[derive(Debug, Clone, Default)]
pub struct TrackingState {
    // Activity state
    pub current: Option<ActiveRun>,
    pub current_area: String,
    pub instance_endpoint: String,
    /// Level announced by `Generating level`, consumed by the next activity start
    pub next_area_level: u32,
    pub last_simulacrum_endpoint: String,

    // Boss fight bookkeeping
    pub elder_fight_active: bool,
    pub shaper_kill_lines_seen: u32,
    /// Only conqueror start/kill events update this
    pub last_conqueror_event: Option<EventKind>,

    // Roster and idempotence
    pub known_players: HashSet<String>,
    pub persisted_keys: HashSet<(i64, String)>,
    /// Finished records the store rejected, retried on the next finish
    pub unsaved_records: Vec<ActivityRecord>,

    /// Fingerprint of the last handled event
    pub bookmark: u64,
    pub mode: TrackingMode,
    pub stats: StatsAggregate,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        self.mode == TrackingMode::Live
    }

    pub fn main_activity(&self) -> Option<&Activity> {
        self.current.as_ref().map(|run| &run.main)
    }

    pub fn main_activity_mut(&mut self) -> Option<&mut Activity> {
        self.current.as_mut().map(|run| &mut run.main)
    }

    pub fn innermost(&self) -> Option<&Activity> {
        self.current.as_ref().map(ActiveRun::innermost)
    }

    pub fn innermost_mut(&mut self) -> Option<&mut Activity> {
        self.current.as_mut().map(ActiveRun::innermost_mut)
    }

    pub fn is_persisted(&self, timestamp: i64, area: &str) -> bool {
        self.persisted_keys.contains(&(timestamp, area.to_string()))
    }

    pub fn is_known_player(&self, name: &str) -> bool {
        self.known_players.contains(name)
    }

    /// Whether any known party member's name appears in `line`.
    pub fn mentions_known_player(&self, line: &str) -> bool {
        self.known_players.iter().any(|p| line.contains(p.as_str()))
    }

    /// Take the next-area level, resetting it to zero.
    pub fn take_next_area_level(&mut self) -> u32 {
        std::mem::take(&mut self.next_area_level)
    }

    /// Drop the in-progress activity and forget nesting.
    pub fn reset_activity(&mut self) {
        self.current = None;
    }
}
