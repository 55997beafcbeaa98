//! Activity start/finish and stat bookkeeping shared by all event handlers.

use super::error::Failures;
use super::{TrackerError, TrackerSignal};
use crate::activity::{ActiveRun, Activity, ActivityRecord, ActivityType, map_tier};
use crate::game_data::stats;
use crate::state::TrackingState;
use crate::storage::TrackerStore;
use chrono::NaiveDateTime;
use waystone_types::TrackerSettings;

/// Area and type of the activity that begins in the same transition.
pub(super) struct Successor {
    pub area: String,
    pub kind: ActivityType,
}

pub(super) fn unix(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp()
}

/// Add one to a counter and report the new value. The increment is stamped
/// with the event being handled.
pub(super) fn bump(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    name: &str,
    timestamp: i64,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    let event = state.bookmark;
    let value = state.stats.increment(store, name, timestamp, event, 1)?;
    signals.push(TrackerSignal::StatChanged {
        name: name.to_string(),
        value,
    });
    Ok(())
}

/// Start a new current activity with the deferred level and current endpoint.
pub(super) fn start_activity(
    state: &mut TrackingState,
    area: &str,
    kind: ActivityType,
    at: NaiveDateTime,
    signals: &mut Vec<TrackerSignal>,
) {
    let level = state.take_next_area_level();
    let mut activity = Activity::new(area, kind, level, at, state.instance_endpoint.clone());
    activity.start_stopwatch(at);

    tracing::debug!(area, %kind, level, "Activity started");
    signals.push(TrackerSignal::ActivityStarted {
        area: area.to_string(),
        kind,
        started_at: at,
        nested: false,
    });
    state.current = Some(ActiveRun::new(activity));
}

/// Close out the current activity (and its sub-map), persist and count it,
/// then start `successor` if given.
///
/// The transition always completes. Records the store rejects are kept in
/// `state.unsaved_records` and retried by the next finish.
pub(super) fn finish_activity(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
    successor: Option<Successor>,
    at: NaiveDateTime,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    let mut failures = Failures::default();
    failures.note(flush_unsaved(state, store, signals));

    if let Some(mut run) = state.current.take() {
        run.main.stop_all(at);
        if let Some(nested) = run.nested_mut() {
            nested.stop_all(at);
        }
        let (mut main, nested) = run.into_parts();

        if keep_labyrinth_run(&mut main, settings) {
            failures.note(save_record(state, store, main.to_record(false), signals));
        } else {
            tracing::info!(
                area = %main.area,
                started = %main.started_at,
                "Discarding labyrinth run without success or death (disconnect or crash mid-run?)"
            );
            signals.push(TrackerSignal::ActivityDiscarded {
                area: main.area.clone(),
                kind: main.kind,
                started_at: main.started_at,
            });
        }

        if let Some(nested) = nested {
            failures.note(save_record(state, store, nested.to_record(true), signals));
        }
    }

    if let Some(next) = successor {
        start_activity(state, &next.area, next.kind, at, signals);
    }
    failures.finish(())
}

/// Retry records the store rejected earlier, oldest first.
pub(super) fn flush_unsaved(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    if state.unsaved_records.is_empty() {
        return Ok(());
    }
    let pending = std::mem::take(&mut state.unsaved_records);
    tracing::info!(records = pending.len(), "Retrying unsaved activities");
    let mut failures = Failures::default();
    for record in pending {
        failures.note(save_record(state, store, record, signals));
    }
    failures.finish(())
}

/// Persist and count one finished record. A rejected write parks the record
/// for retry; counting happens only once it is stored.
fn save_record(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    record: ActivityRecord,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    match commit_record(state, store, &record, signals) {
        Ok(true) => count_finished(state, store, &record, signals),
        Ok(false) => Ok(()),
        Err(e) => {
            tracing::warn!(area = %record.area, error = %e, "Activity not saved, will retry");
            state.unsaved_records.push(record);
            Err(e)
        }
    }
}

/// Labyrinth validity filter; other kinds always pass.
fn keep_labyrinth_run(activity: &mut Activity, settings: &TrackerSettings) -> bool {
    if activity.kind != ActivityType::Labyrinth {
        return true;
    }
    // Old lab runs lack the plaza transition that names them
    if activity.area == "Unknown" {
        activity.success = activity.death_counter == 0;
    }
    !settings.discard_incomplete_labs || activity.success || activity.death_counter > 0
}

/// Persist once per `(timestamp, area)`. Returns whether the record is new.
fn commit_record(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    record: &ActivityRecord,
    signals: &mut Vec<TrackerSignal>,
) -> Result<bool, TrackerError> {
    let key = (record.timestamp, record.area.clone());
    if state.persisted_keys.contains(&key) {
        tracing::debug!(area = %record.area, timestamp = record.timestamp, "Activity already recorded");
        return Ok(false);
    }

    let inserted = store.append_activity_record(record)?;
    state.persisted_keys.insert(key);
    if !inserted {
        return Ok(false);
    }

    tracing::info!(
        area = %record.area,
        kind = %record.kind,
        duration_secs = record.duration_secs,
        deaths = record.death_counter,
        zana = record.is_zana,
        "Activity finished"
    );
    signals.push(TrackerSignal::ActivityFinished(record.clone()));
    Ok(true)
}

fn count_finished(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    record: &ActivityRecord,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    let ts = record.timestamp;
    let names = match record.kind {
        ActivityType::Heist => vec![
            stats::TOTAL_HEISTS_DONE.to_string(),
            stats::heists_finished(&record.area),
        ],
        ActivityType::Map => vec![
            stats::TOTAL_MAPS_DONE.to_string(),
            stats::maps_finished(&record.area),
            stats::map_tier_finished(map_tier(record.area_level)),
        ],
        ActivityType::Simulacrum => vec![stats::simulacrum_finished(&record.area)],
        ActivityType::Temple => vec![stats::TEMPLES_DONE.to_string()],
        ActivityType::Labyrinth | ActivityType::Delve | ActivityType::BlightedMap => Vec::new(),
    };

    let mut failures = Failures::default();
    for name in &names {
        failures.note(bump(state, store, name, ts, signals));
    }
    failures.finish(())
}
