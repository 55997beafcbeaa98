//! `You have entered <area>.` handling: starts, ends, pauses and nests activities.

use super::error::Failures;
use super::lifecycle::{Successor, bump, finish_activity, start_activity, unix};
use super::{TrackerError, TrackerSignal};
use crate::activity::{Activity, ActivityType};
use crate::client_log::{TrackingEvent, area_name};
use crate::game_data::areas::{
    self, ASPIRANTS_PLAZA, ASPIRANTS_TRIAL, AZURITE_MINE, ELDER_ARENA, LAB_TRIAL_MARKER,
};
use crate::game_data::tags::ZANA_MAP_TAG;
use crate::game_data::{classify_area, is_camp_or_hideout, labyrinth_name, stats};
use crate::state::TrackingState;
use crate::storage::TrackerStore;
use waystone_types::TrackerSettings;

pub(super) fn handle_area_change(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    let target = match area_name(&event.raw_line) {
        Ok(area) => area,
        Err(e) => {
            tracing::debug!(line = event.line_number, error = %e, "Area change without area name");
            return Ok(signals);
        }
    };
    let source = state.current_area.clone();
    let at = event.timestamp;
    let ts = unix(at);
    // Set when this transition already created the current activity
    let mut started_here = false;
    // Store failures never stop the transition; the first is reported at the end
    let mut failures = Failures::default();

    failures.note(bump(state, store, stats::AREA_CHANGES, ts, &mut signals));

    if let Some(main) = state.main_activity_mut()
        && matches!(main.kind, ActivityType::Labyrinth | ActivityType::Delve)
    {
        main.last_ended_at = Some(at);
    }

    // ─── Simulacrum: one activity per instance ───────────────────────────────
    if areas::is_simulacrum_area(&target)
        && state.instance_endpoint != state.last_simulacrum_endpoint
    {
        failures.note(bump(state, store, stats::SIMULACRUM_STARTED, ts, &mut signals));
        state.last_simulacrum_endpoint = state.instance_endpoint.clone();
        failures.note(finish_activity(state, store, settings, None, at, &mut signals));
        start_activity(state, &target, ActivityType::Simulacrum, at, &mut signals);
        started_here = true;
    }

    // ─── Elder has no start dialogue ─────────────────────────────────────────
    if target == ELDER_ARENA {
        if !state.elder_fight_active {
            failures.note(bump(state, store, stats::ELDER_TRIED, ts, &mut signals));
        }
        state.elder_fight_active = true;
    }

    let kind = classify_area(&target, &source);

    // ─── Labyrinth ───────────────────────────────────────────────────────────
    if kind == Some(ActivityType::Labyrinth) && source == ASPIRANTS_PLAZA {
        failures.note(finish_activity(state, store, settings, None, at, &mut signals));
        let name = labyrinth_name(state.next_area_level);
        start_activity(state, name, ActivityType::Labyrinth, at, &mut signals);
        failures.note(bump(state, store, stats::LABS_STARTED, ts, &mut signals));
        started_here = true;
    }

    if current_kind(state) == Some(ActivityType::Labyrinth) {
        if target == ASPIRANTS_TRIAL
            && let Some(main) = state.main_activity_mut()
        {
            main.trial_round_count += 1;
        }
        if is_camp_or_hideout(&target) {
            failures.note(finish_activity(state, store, settings, None, at, &mut signals));
        }
    }

    // ─── Delve ───────────────────────────────────────────────────────────────
    if kind == Some(ActivityType::Delve) {
        if current_kind(state) == Some(ActivityType::Delve) {
            let level = state.take_next_area_level();
            if let Some(main) = state.main_activity_mut() {
                main.area_level = main.area_level.max(level);
            }
        } else {
            failures.note(finish_activity(state, store, settings, None, at, &mut signals));
            start_activity(state, AZURITE_MINE, ActivityType::Delve, at, &mut signals);
            started_here = true;
        }
    } else if current_kind(state) == Some(ActivityType::Delve) {
        failures.note(finish_activity(state, store, settings, None, at, &mut signals));
    }

    // ─── Back from a camp into the paused instance ───────────────────────────
    if matches!(
        kind,
        Some(ActivityType::Map | ActivityType::Heist | ActivityType::Simulacrum)
    ) && is_camp_or_hideout(&source)
        && let Some(run) = state.current.as_mut()
        && run.main.area == target
        && run.main.instance_endpoint == state.instance_endpoint
        && run.main.is_pause_open()
    {
        run.main.end_pause(at);
        signals.push(TrackerSignal::PauseChanged {
            area: target.clone(),
            paused: false,
        });
    }

    let entered = match kind {
        Some(kind) => enter_trackable(
            state,
            store,
            settings,
            &source,
            &target,
            kind,
            started_here,
            event,
            &mut signals,
        ),
        None => leave_to_untracked(state, store, settings, &target, event, &mut signals),
    };
    failures.note(entered);

    state.current_area = target;
    failures.finish_with(signals)
}

fn current_kind(state: &TrackingState) -> Option<ActivityType> {
    state.main_activity().map(|a| a.kind)
}

fn enter_trackable(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
    source: &str,
    target: &str,
    kind: ActivityType,
    started_here: bool,
    event: &TrackingEvent,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    let at = event.timestamp;
    // Portalling back into the arena continues the same Elder attempt
    if target != ELDER_ARENA {
        state.elder_fight_active = false;
    }
    state.shaper_kill_lines_seen = 0;

    let existed = state.current.is_some() && !started_here;
    if state.current.is_none() {
        start_activity(state, target, kind, at, signals);
    } else if existed
        && matches!(kind, ActivityType::Map | ActivityType::Simulacrum)
        && let Some(main) = state.main_activity_mut()
    {
        main.portals_used += 1;
    }

    if let Some(main) = state.main_activity_mut()
        && !main.manually_paused
    {
        main.start_stopwatch(at);
    }

    // ─── Map to map: a sub-map opened from inside the current one ────────────
    if existed && areas::is_map_area(source, "") && kind == ActivityType::Map {
        let creating = state
            .current
            .as_ref()
            .is_some_and(|run| !run.nested_active() && run.nested().is_none());
        let level = if creating { state.take_next_area_level() } else { 0 };
        let endpoint = state.instance_endpoint.clone();
        let Some(run) = state.current.as_mut() else {
            return Ok(());
        };

        if run.nested_active() {
            run.leave_nested(at);
        } else {
            run.enter_nested(at, || {
                let mut nested = Activity::new(target, ActivityType::Map, level, at, endpoint);
                nested.add_tag(ZANA_MAP_TAG);
                nested
            });
            if creating {
                signals.push(TrackerSignal::ActivityStarted {
                    area: target.to_string(),
                    kind: ActivityType::Map,
                    started_at: at,
                    nested: true,
                });
            }
        }
        return Ok(());
    }

    let Some(run) = state.current.as_mut() else {
        return Ok(());
    };
    run.clear_nested_active();

    // Labyrinth trial rooms, labs and delves are never replaced here
    let main = &run.main;
    let replaceable = !source.contains(LAB_TRIAL_MARKER)
        && !matches!(main.kind, ActivityType::Labyrinth | ActivityType::Delve);
    if replaceable && (main.area != target || main.instance_endpoint != state.instance_endpoint) {
        let successor = Successor {
            area: target.to_string(),
            kind,
        };
        finish_activity(state, store, settings, Some(successor), at, signals)?;
    }
    Ok(())
}

fn leave_to_untracked(
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
    target: &str,
    event: &TrackingEvent,
    signals: &mut Vec<TrackerSignal>,
) -> Result<(), TrackerError> {
    let at = event.timestamp;
    let Some(run) = state.current.as_mut() else {
        return Ok(());
    };
    if run.main.kind == ActivityType::Labyrinth {
        return Ok(());
    }

    let pausable = matches!(
        run.main.kind,
        ActivityType::Map | ActivityType::Heist | ActivityType::Simulacrum
    );
    if pausable && is_camp_or_hideout(target) {
        if let Some(nested) = run.nested_mut() {
            nested.stop_stopwatch(at);
            nested.last_ended_at = Some(at);
        }
        // A stopped main stopwatch (sub-map or manual pause) accrues nothing to subtract
        if run.main.stopwatch_running() && !run.main.is_pause_open() {
            run.main.start_pause(at);
            signals.push(TrackerSignal::PauseChanged {
                area: run.main.area.clone(),
                paused: true,
            });
        }
        return Ok(());
    }

    run.main.stop_stopwatch(at);
    run.main.last_ended_at = Some(at);
    if let Some(nested) = run.nested_mut() {
        nested.stop_stopwatch(at);
        nested.last_ended_at = Some(at);
    }
    finish_activity(state, store, settings, None, at, signals)
}
