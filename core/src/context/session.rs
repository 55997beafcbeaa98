use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use hashbrown::HashMap;

use super::config::{AppConfig, AppConfigExt};
use super::error::PipelineError;
use crate::client_log::TrackingEvent;
use crate::state::{StatsAggregate, TrackingMode, TrackingState};
use crate::storage::checkpoint::{read_checkpoint, write_checkpoint};
use crate::storage::{CheckpointError, SqliteStore, StatCheckpoint, StoreError, TrackerStore};
use crate::tracker::{ActivityTracker, SignalHandler, TrackerSignal};
use waystone_types::{ActivityRecord, TrackerSettings};

/// A tracking session: the state machine, its state and its store.
///
/// Exactly one task owns the session at a time. The parsing worker owns it
/// during catch-up, then hands it to the handling worker.
pub struct TrackingSession {
    tracker: ActivityTracker,
    state: TrackingState,
    store: Box<dyn TrackerStore>,
    checkpoint_path: Option<PathBuf>,
    signal_handlers: Vec<Box<dyn SignalHandler + Send>>,
}

impl TrackingSession {
    pub fn new(
        settings: TrackerSettings,
        store: Box<dyn TrackerStore>,
        checkpoint_path: Option<PathBuf>,
    ) -> Self {
        Self {
            tracker: ActivityTracker::new(settings),
            state: TrackingState::new(),
            store,
            checkpoint_path,
            signal_handlers: Vec::new(),
        }
    }

    /// Open the SQLite store and checkpoint under the configured data directory.
    pub fn open(config: &AppConfig) -> Result<Self, PipelineError> {
        let store = SqliteStore::open(&config.database_path()?)?;
        Ok(Self::new(
            config.tracker.clone(),
            Box::new(store),
            Some(config.checkpoint_path()?),
        ))
    }

    /// Register a signal handler to receive tracker signals
    pub fn add_signal_handler(&mut self, handler: Box<dyn SignalHandler + Send>) {
        self.signal_handlers.push(handler);
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn bookmark(&self) -> u64 {
        self.state.bookmark
    }

    /// Load history, roster and counters from the previous run.
    ///
    /// Counters are always the store's increment sums. The replay bookmark
    /// comes from the checkpoint when it agrees with those sums; otherwise
    /// from the event stamped on the newest increment, so lines already
    /// counted are not counted again.
    pub fn restore(&mut self) -> Result<(), PipelineError> {
        let history = self.store.load_all_activity_records()?;
        self.state.persisted_keys = history
            .iter()
            .map(|r| (r.timestamp, r.area.clone()))
            .collect();
        self.state.known_players = self.store.load_known_players()?.into_iter().collect();

        let checkpoint = match self.checkpoint_path.as_deref() {
            Some(path) => read_checkpoint(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable stat checkpoint");
                None
            }),
            None => None,
        };
        let counters = self.store.load_stat_counters()?;
        self.state.bookmark = match checkpoint {
            Some(checkpoint) if same_counters(&checkpoint.counters, &counters) => checkpoint.bookmark,
            stale => {
                if stale.is_some() {
                    tracing::warn!("Stat checkpoint is behind the store, resuming after the last counted event");
                }
                self.store.last_stat_event()?.unwrap_or(0)
            }
        };
        self.state.stats = StatsAggregate::from_counters(counters);

        tracing::info!(
            activities = history.len(),
            players = self.state.known_players.len(),
            counters = self.state.stats.counters().len(),
            bookmark = self.state.bookmark,
            "Session restored"
        );

        let signal = TrackerSignal::Restored {
            history,
            counters: self.state.stats.sorted(),
        };
        self.dispatch_signals(&[signal]);
        Ok(())
    }

    /// Process a single event and dispatch its signals. Failures are logged.
    pub fn process_event(&mut self, event: &TrackingEvent) {
        match self
            .tracker
            .process_event(event, &mut self.state, self.store.as_mut())
        {
            Ok(signals) => self.dispatch_signals(&signals),
            Err(e) => {
                tracing::error!(
                    line = event.line_number,
                    kind = ?event.kind,
                    error = %e,
                    "Failed to handle event"
                );
                self.dispatch_signals(e.signals());
            }
        }
    }

    pub fn process_events(&mut self, events: &[TrackingEvent]) {
        for event in events {
            self.process_event(event);
        }
    }

    fn dispatch_signals(&mut self, signals: &[TrackerSignal]) {
        if signals.is_empty() {
            return;
        }
        for handler in &mut self.signal_handlers {
            handler.handle_signals(signals);
        }
    }

    /// End of catch-up: whatever was in progress when the client was last
    /// read is dropped, and chat commands apply from here on.
    pub fn mark_ready(&mut self, catch_up: Duration, lines: u64) {
        if let Some(activity) = self.state.main_activity() {
            tracing::debug!(area = %activity.area, "Dropping activity in progress at end of catch-up");
        }
        self.state.reset_activity();
        self.state.mode = TrackingMode::Live;

        tracing::info!(
            elapsed_ms = catch_up.as_millis() as u64,
            lines,
            "Catch-up finished, tracking live"
        );
        self.dispatch_signals(&[TrackerSignal::Ready { catch_up, lines }]);
    }

    pub fn write_checkpoint(&self) -> Result<(), CheckpointError> {
        let Some(path) = self.checkpoint_path.as_deref() else {
            return Ok(());
        };
        let checkpoint = StatCheckpoint {
            bookmark: self.state.bookmark,
            counters: self.state.stats.counters().clone(),
        };
        write_checkpoint(path, &checkpoint)?;
        tracing::debug!(path = %path.display(), bookmark = checkpoint.bookmark, "Checkpoint written");
        Ok(())
    }

    /// Force-finish the current activity at `at` and write the checkpoint.
    pub fn finalize_session(&mut self, at: NaiveDateTime) {
        match self
            .tracker
            .finish_current(&mut self.state, self.store.as_mut(), at)
        {
            Ok(signals) => self.dispatch_signals(&signals),
            Err(e) => {
                tracing::error!(error = %e, "Failed to finish activity on shutdown");
                self.dispatch_signals(e.signals());
            }
        }
        if let Err(e) = self.write_checkpoint() {
            tracing::error!(error = %e, "Failed to write checkpoint on shutdown");
        }
    }

    /// Wipe all counters, in the store, in memory and in the checkpoint.
    pub fn reset_stats(&mut self) -> Result<(), PipelineError> {
        self.store.clear_stats()?;
        self.state.stats.clear();
        self.write_checkpoint()?;
        tracing::info!("Statistics reset");
        Ok(())
    }

    pub fn history(&self) -> Result<Vec<ActivityRecord>, StoreError> {
        self.store.load_all_activity_records()
    }
}

/// Whether two counter sets agree, ignoring zero entries.
fn same_counters(a: &HashMap<String, i64>, b: &HashMap<String, i64>) -> bool {
    let nonzero = |m: &HashMap<String, i64>| m.values().filter(|v| **v != 0).count();
    nonzero(a) == nonzero(b)
        && a.iter()
            .filter(|(_, v)| **v != 0)
            .all(|(k, v)| b.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_log::{EventClassifier, fingerprint};
    use crate::game_data::stats;
    use crate::storage::{ActivityStore, MemoryStore, RosterStore, StatsStore};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<TrackerSignal>>>);

    impl SignalHandler for Recorder {
        fn handle_signal(&mut self, signal: &TrackerSignal) {
            self.0.lock().unwrap().push(signal.clone());
        }
    }

    fn event(text: &str) -> TrackingEvent {
        let line = format!("2024/03/02 19:00:00 1 a [INFO Client 1] {text}");
        EventClassifier::new()
            .classify(1, fingerprint(&line), &line)
            .unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let record = ActivityRecord {
            timestamp: 1_700_000_000,
            kind: waystone_types::ActivityType::Map,
            area: "Arcade".to_string(),
            area_level: 80,
            duration_secs: 300,
            death_counter: 0,
            round_count: 0,
            is_zana: false,
            tags: Vec::new(),
            success: false,
        };
        store.append_activity_record(&record).unwrap();
        store.increment_stat(stats::TOTAL_MAPS_DONE, 1_700_000_000, 77, 4).unwrap();
        store.add_known_player("Zeraphine").unwrap();
        store
    }

    #[test]
    fn restore_without_checkpoint_sums_store() {
        let recorder = Recorder::default();
        let mut session = TrackingSession::new(TrackerSettings::default(), Box::new(seeded_store()), None);
        session.add_signal_handler(Box::new(recorder.clone()));
        session.restore().unwrap();

        let state = session.state();
        assert!(state.is_persisted(1_700_000_000, "Arcade"));
        assert!(state.is_known_player("Zeraphine"));
        assert_eq!(state.stats.get(stats::TOTAL_MAPS_DONE), 4);
        // Resumes after the last event that was counted
        assert_eq!(state.bookmark, 77);

        let signals = recorder.0.lock().unwrap();
        assert!(matches!(
            &signals[0],
            TrackerSignal::Restored { history, .. } if history.len() == 1
        ));
    }

    fn restore_with_checkpoint(counter: i64) -> TrackingSession {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.cache");
        let mut checkpoint = StatCheckpoint {
            bookmark: 42,
            ..StatCheckpoint::default()
        };
        checkpoint.counters.insert(stats::TOTAL_MAPS_DONE.to_string(), counter);
        write_checkpoint(&path, &checkpoint).unwrap();

        let mut session =
            TrackingSession::new(TrackerSettings::default(), Box::new(seeded_store()), Some(path));
        session.restore().unwrap();
        session
    }

    #[test]
    fn restore_uses_checkpoint_in_sync_with_store() {
        let session = restore_with_checkpoint(4);
        assert_eq!(session.bookmark(), 42);
        assert_eq!(session.state().stats.get(stats::TOTAL_MAPS_DONE), 4);
    }

    #[test]
    fn stale_checkpoint_yields_to_store() {
        let session = restore_with_checkpoint(3);
        assert_eq!(session.bookmark(), 77);
        assert_eq!(session.state().stats.get(stats::TOTAL_MAPS_DONE), 4);
    }

    #[test]
    fn crash_after_checkpoint_does_not_double_count() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("waystone.db");
        let cache = dir.path().join("stats.cache");
        let open = || {
            let store = SqliteStore::open(&db).unwrap();
            TrackingSession::new(TrackerSettings::default(), Box::new(store), Some(cache.clone()))
        };

        let town = event(": You have entered Lioneye's Watch.");
        {
            let mut session = open();
            session.restore().unwrap();
            session.process_event(&event(": You have entered Arcade."));
            session.write_checkpoint().unwrap();
            // Killed before the next checkpoint
            session.process_event(&town);
        }

        let mut session = open();
        session.restore().unwrap();
        assert_eq!(session.bookmark(), town.fingerprint);
        assert_eq!(session.state().stats.get(stats::AREA_CHANGES), 2);
        assert_eq!(session.state().stats.get(stats::TOTAL_MAPS_DONE), 1);

        let store = SqliteStore::open(&db).unwrap();
        assert_eq!(store.load_stat_counters().unwrap().get(stats::AREA_CHANGES), Some(&2));
    }

    #[test]
    fn ready_drops_activity_and_goes_live() {
        let recorder = Recorder::default();
        let mut session = TrackingSession::new(TrackerSettings::default(), Box::new(MemoryStore::new()), None);
        session.add_signal_handler(Box::new(recorder.clone()));

        session.process_event(&event(": You have entered Arcade."));
        assert!(session.state().current.is_some());

        session.mark_ready(Duration::from_millis(5), 10);
        assert!(session.state().current.is_none());
        assert!(session.state().is_live());
        assert!(
            recorder
                .0
                .lock()
                .unwrap()
                .iter()
                .any(|s| matches!(s, TrackerSignal::Ready { lines: 10, .. }))
        );
    }

    #[test]
    fn finalize_persists_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.cache");
        let mut session = TrackingSession::new(
            TrackerSettings::default(),
            Box::new(MemoryStore::new()),
            Some(path.clone()),
        );
        session.process_event(&event(": You have entered Arcade."));
        let at = session.state().main_activity().unwrap().started_at + chrono::TimeDelta::seconds(30);
        session.finalize_session(at);

        let history = session.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].duration_secs, 30);

        let checkpoint = read_checkpoint(&path).unwrap().unwrap();
        assert_eq!(checkpoint.bookmark, session.bookmark());
        assert_eq!(checkpoint.counters.get(stats::TOTAL_MAPS_DONE), Some(&1));
    }

    #[test]
    fn reset_stats_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.cache");
        let mut session = TrackingSession::new(
            TrackerSettings::default(),
            Box::new(seeded_store()),
            Some(path.clone()),
        );
        session.restore().unwrap();
        session.reset_stats().unwrap();

        assert_eq!(session.state().stats.get(stats::TOTAL_MAPS_DONE), 0);
        let checkpoint = read_checkpoint(&path).unwrap().unwrap();
        assert!(checkpoint.counters.is_empty());
        // History survives a stats reset
        assert_eq!(session.history().unwrap().len(), 1);
    }
}
