use super::error::Failures;
use super::lifecycle::{finish_activity, flush_unsaved};
use super::{TrackerError, TrackerSignal, area_change, chat, encounters};
use crate::client_log::{EventKind, TrackingEvent, instance_endpoint, next_area_level};
use crate::state::TrackingState;
use crate::storage::TrackerStore;
use chrono::NaiveDateTime;
use waystone_types::TrackerSettings;

/// Consumes classified events in order, maintains the current activity and
/// emits signals. This is the activity state machine.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    settings: TrackerSettings,
}

impl ActivityTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Apply one event to `state`, writing through `store`.
    pub fn process_event(
        &self,
        event: &TrackingEvent,
        state: &mut TrackingState,
        store: &mut dyn TrackerStore,
    ) -> Result<Vec<TrackerSignal>, TrackerError> {
        let settings = &self.settings;
        // Set first: stat increments are stamped with it, even when handling fails
        state.bookmark = event.fingerprint;

        match event.kind {
            // ═══════════════════════════════════════════════════════════════════
            // PHASE 1: Connection context (no activity changes)
            // ═══════════════════════════════════════════════════════════════════
            EventKind::InstanceConnected => {
                match instance_endpoint(&event.raw_line) {
                    Ok(endpoint) => state.instance_endpoint = endpoint,
                    Err(e) => tracing::debug!(line = event.line_number, error = %e, "No endpoint"),
                }
                Ok(Vec::new())
            }
            EventKind::NextAreaLevel => {
                match next_area_level(&event.raw_line) {
                    Ok(level) => state.next_area_level = level,
                    Err(e) => tracing::debug!(line = event.line_number, error = %e, "No area level"),
                }
                Ok(Vec::new())
            }
            EventKind::PartyMemberJoined => encounters::handle_party_member(event, state, store),

            // ═══════════════════════════════════════════════════════════════════
            // PHASE 2: Activity lifecycle
            // ═══════════════════════════════════════════════════════════════════
            EventKind::AreaEntered => {
                area_change::handle_area_change(event, state, store, settings)
            }
            EventKind::ClientStarted | EventKind::AbnormalDisconnect => {
                let mut signals = Vec::new();
                let mut failures = Failures::default();
                if state.current.is_some() {
                    tracing::info!(
                        line = event.line_number,
                        kind = ?event.kind,
                        "Client restart or disconnect, finishing activity"
                    );
                    let at = event.timestamp;
                    failures.note(finish_activity(state, store, settings, None, at, &mut signals));
                }
                failures.finish_with(signals)
            }
            EventKind::PlayerDied => encounters::handle_player_died(event, state, store, settings),
            EventKind::LabFinished => encounters::handle_lab_finished(event, state, store, settings),
            EventKind::ChatCommand => chat::handle_chat_command(event, state, store, settings),

            // ═══════════════════════════════════════════════════════════════════
            // PHASE 3: Counters and tags
            // ═══════════════════════════════════════════════════════════════════
            EventKind::TrialMasterVictory
            | EventKind::TrialMasterTookReward
            | EventKind::TrialMasterRoundStarted => {
                encounters::handle_trialmaster(event, state, store)
            }
            EventKind::LevelUp => encounters::handle_level_up(event, state, store),
            EventKind::Encounter(encounter) => Ok(encounters::handle_encounter(encounter, state)),
            EventKind::Expedition(npc) => encounters::handle_expedition(npc, event, state, store),
            EventKind::HeistSpeech(npc) => Ok(encounters::handle_heist_speech(npc, state)),
            EventKind::LabStartInfo => Ok(Vec::new()),
            _ => encounters::handle_boss(event, state, store, settings),
        }
    }

    /// Finish whatever is in progress, e.g. on shutdown.
    pub fn finish_current(
        &self,
        state: &mut TrackingState,
        store: &mut dyn TrackerStore,
        at: NaiveDateTime,
    ) -> Result<Vec<TrackerSignal>, TrackerError> {
        let mut signals = Vec::new();
        let finished = if state.current.is_some() {
            finish_activity(state, store, &self.settings, None, at, &mut signals)
        } else {
            flush_unsaved(state, store, &mut signals)
        };
        let mut failures = Failures::default();
        failures.note(finished);
        failures.finish_with(signals)
    }
}
