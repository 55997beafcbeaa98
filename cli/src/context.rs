use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::{Mutex, RwLock};
use waystone_core::{ActivityRecord, ActivityType, AppConfig, SignalHandler, TrackerSignal, TrackingPipeline};

/// Activity shown by `status`
#[derive(Debug, Clone)]
pub struct CurrentActivity {
    pub area: String,
    pub kind: ActivityType,
    pub started_at: NaiveDateTime,
    pub paused: bool,
    pub tags: Vec<String>,
    /// Area of the sub-map while one is open
    pub nested: Option<String>,
}

/// What the REPL knows about the tracker, fed by signals.
#[derive(Debug, Default)]
pub struct TrackerView {
    pub current: Option<CurrentActivity>,
    /// Newest first
    pub history: Vec<ActivityRecord>,
    pub counters: BTreeMap<String, i64>,
    pub catch_up: Option<Duration>,
}

impl TrackerView {
    fn apply(&mut self, signal: &TrackerSignal) {
        match signal {
            TrackerSignal::ActivityStarted {
                area,
                kind,
                started_at,
                nested,
            } => {
                if *nested {
                    if let Some(current) = self.current.as_mut() {
                        current.nested = Some(area.clone());
                    }
                } else {
                    self.current = Some(CurrentActivity {
                        area: area.clone(),
                        kind: *kind,
                        started_at: *started_at,
                        paused: false,
                        tags: Vec::new(),
                        nested: None,
                    });
                }
            }
            TrackerSignal::ActivityFinished(record) => {
                if !record.is_zana
                    && self.current.as_ref().is_some_and(|c| c.area == record.area)
                {
                    self.current = None;
                }
                self.history.insert(0, record.clone());
            }
            TrackerSignal::ActivityDiscarded { area, .. } => {
                if self.current.as_ref().is_some_and(|c| &c.area == area) {
                    self.current = None;
                }
            }
            TrackerSignal::PauseChanged { area, paused } => {
                if let Some(current) = self.current.as_mut()
                    && &current.area == area
                {
                    current.paused = *paused;
                }
            }
            TrackerSignal::TagsChanged { area, tags } => {
                if let Some(current) = self.current.as_mut()
                    && &current.area == area
                {
                    current.tags = tags.clone();
                }
            }
            TrackerSignal::StatChanged { name, value } => {
                self.counters.insert(name.clone(), *value);
            }
            TrackerSignal::Ready { catch_up, .. } => {
                self.current = None;
                self.catch_up = Some(*catch_up);
            }
            TrackerSignal::Restored { history, counters } => {
                self.history = history.clone();
                self.counters = counters.iter().cloned().collect();
            }
        }
    }
}

/// Signal handler registered on the tracking session.
pub struct ViewUpdater(Arc<StdMutex<TrackerView>>);

impl SignalHandler for ViewUpdater {
    fn handle_signal(&mut self, signal: &TrackerSignal) {
        match self.0.lock() {
            Ok(mut view) => view.apply(signal),
            Err(_) => tracing::warn!("Tracker view lock poisoned, dropping signal"),
        }
    }
}

/// Holds all shared state for the CLI application.
#[derive(Clone)]
pub struct CliContext {
    pub config: Arc<RwLock<AppConfig>>,
    /// Running workers, `None` while not tracking
    pub pipeline: Arc<Mutex<Option<TrackingPipeline>>>,
    view: Arc<StdMutex<TrackerView>>,
}

impl CliContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            pipeline: Arc::new(Mutex::new(None)),
            view: Arc::new(StdMutex::new(TrackerView::default())),
        }
    }

    /// A fresh handler for a new session. Resets the view.
    pub fn view_updater(&self) -> ViewUpdater {
        if let Ok(mut view) = self.view.lock() {
            *view = TrackerView::default();
        }
        ViewUpdater(Arc::clone(&self.view))
    }

    /// Run `f` against the current view.
    pub fn with_view<R>(&self, f: impl FnOnce(&TrackerView) -> R) -> Result<R, String> {
        self.view
            .lock()
            .map(|view| f(&view))
            .map_err(|_| "tracker view unavailable".to_string())
    }

    pub fn clear_counters(&self) {
        if let Ok(mut view) = self.view.lock() {
            view.counters.clear();
        }
    }

    pub async fn is_tracking(&self) -> bool {
        self.pipeline
            .lock()
            .await
            .as_ref()
            .is_some_and(TrackingPipeline::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap()
    }

    fn record(area: &str, is_zana: bool) -> ActivityRecord {
        ActivityRecord {
            timestamp: at().and_utc().timestamp(),
            kind: ActivityType::Map,
            area: area.to_string(),
            area_level: 80,
            duration_secs: 60,
            death_counter: 0,
            round_count: 0,
            is_zana,
            tags: Vec::new(),
            success: false,
        }
    }

    fn started(area: &str, nested: bool) -> TrackerSignal {
        TrackerSignal::ActivityStarted {
            area: area.to_string(),
            kind: ActivityType::Map,
            started_at: at(),
            nested,
        }
    }

    #[test]
    fn view_follows_lifecycle() {
        let mut view = TrackerView::default();
        view.apply(&started("Arcade", false));
        view.apply(&started("Maze", true));
        assert_eq!(view.current.as_ref().unwrap().nested.as_deref(), Some("Maze"));

        view.apply(&TrackerSignal::ActivityFinished(record("Maze", true)));
        view.apply(&TrackerSignal::ActivityFinished(record("Arcade", false)));
        assert!(view.current.is_none());
        assert_eq!(view.history[0].area, "Arcade");
        assert_eq!(view.history.len(), 2);
    }

    #[test]
    fn view_tracks_counters() {
        let mut view = TrackerView::default();
        view.apply(&TrackerSignal::Restored {
            history: vec![record("Strand", false)],
            counters: vec![("TotalMapsDone".to_string(), 4)],
        });
        view.apply(&TrackerSignal::StatChanged {
            name: "TotalMapsDone".to_string(),
            value: 5,
        });
        assert_eq!(view.counters.get("TotalMapsDone"), Some(&5));
        assert_eq!(view.history.len(), 1);
    }
}
