//! Deaths, boss fights, league encounters and NPC speech.

use super::error::Failures;
use super::lifecycle::{bump, finish_activity, unix};
use super::{TrackerError, TrackerSignal};
use crate::activity::{Activity, ActivityType};
use crate::client_log::{
    Encounter, EventKind, ExpeditionNpc, HeistNpc, TrackingEvent, level_up_level, player_name,
};
use crate::game_data::areas;
use crate::game_data::stats;
use crate::game_data::tags::EXPEDITION_TAG;
use crate::state::TrackingState;
use crate::storage::TrackerStore;
use waystone_types::TrackerSettings;

pub(super) fn handle_player_died(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    let Ok(name) = player_name(&event.raw_line) else {
        return Ok(signals);
    };
    if state.is_known_player(name) {
        return Ok(signals);
    }

    let mut failures = Failures::default();
    failures.note(bump(state, store, stats::TOTAL_KILLED_COUNT, unix(event.timestamp), &mut signals));

    if let Some(main) = state.main_activity_mut()
        && main.kind == ActivityType::Labyrinth
    {
        main.death_counter = 1;
        failures.note(finish_activity(state, store, settings, None, event.timestamp, &mut signals));
    }

    // Deaths outside an instance do not count against any activity
    let area = state.current_area.as_str();
    let in_instance = areas::is_map_area(area, "")
        || areas::is_heist_area(area, "")
        || areas::is_simulacrum_area(area);
    if in_instance && let Some(activity) = state.innermost_mut() {
        activity.death_counter += 1;
    }
    failures.finish_with(signals)
}

pub(super) fn handle_boss(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    let ts = unix(event.timestamp);
    let kind = event.kind;

    let counter = match kind {
        EventKind::ShaperFightStarted => Some(stats::SHAPER_TRIED),
        EventKind::ShaperKilled => {
            // The kill dialogue is logged several times per kill
            state.shaper_kill_lines_seen += 1;
            if state.shaper_kill_lines_seen >= settings.shaper_kill_lines.max(1) {
                state.shaper_kill_lines_seen = 0;
                Some(stats::SHAPER_KILLED)
            } else {
                None
            }
        }
        EventKind::ElderKilled => {
            state.elder_fight_active = false;
            Some(stats::ELDER_KILLED)
        }
        EventKind::SirusFightStarted => Some(stats::SIRUS_STARTED),
        EventKind::SirusKilled => Some(stats::SIRUS_KILLED),
        EventKind::MavenFightStarted => Some(stats::MAVEN_STARTED),
        EventKind::MavenKilled => Some(stats::MAVEN_KILLED),
        EventKind::CatarinaFightStarted => Some(stats::CATARINA_TRIED),
        EventKind::CatarinaKilled => Some(stats::CATARINA_KILLED),
        EventKind::VeritaniaFightStarted => Some(stats::VERITANIA_STARTED),
        EventKind::BaranFightStarted => Some(stats::BARAN_STARTED),
        EventKind::DroxFightStarted => Some(stats::DROX_STARTED),
        EventKind::HunterFightStarted => Some(stats::HUNTER_STARTED),
        // Conqueror death speech sometimes fires twice in a row
        EventKind::VeritaniaKilled
        | EventKind::BaranKilled
        | EventKind::DroxKilled
        | EventKind::HunterKilled => {
            if state.last_conqueror_event == Some(kind) {
                None
            } else {
                conqueror_kill_stat(kind)
            }
        }
        EventKind::TrialMasterStarted => Some(stats::TRIALMASTER_STARTED),
        EventKind::TrialMasterKilled => Some(stats::TRIALMASTER_KILLED),
        EventKind::EinharBeastCaptured => Some(stats::EINHAR_CAPTURES),
        EventKind::SimulacrumFullClear => Some(stats::SIMULACRUM_CLEARED),
        _ => None,
    };

    if kind.is_conqueror() {
        state.last_conqueror_event = Some(kind);
    }
    if let Some(name) = counter {
        bump(state, store, name, ts, &mut signals)?;
    }
    Ok(signals)
}

fn conqueror_kill_stat(kind: EventKind) -> Option<&'static str> {
    match kind {
        EventKind::VeritaniaKilled => Some(stats::VERITANIA_KILLED),
        EventKind::BaranKilled => Some(stats::BARAN_KILLED),
        EventKind::DroxKilled => Some(stats::DROX_KILLED),
        EventKind::HunterKilled => Some(stats::HUNTER_KILLED),
        _ => None,
    }
}

pub(super) fn handle_trialmaster(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    let ts = unix(event.timestamp);
    let mut failures = Failures::default();

    match event.kind {
        EventKind::TrialMasterVictory => {
            failures.note(bump(state, store, stats::TRIALMASTER_SUCCESS, ts, &mut signals));
            failures.note(bump(state, store, stats::TRIALMASTER_VICTORY, ts, &mut signals));
            if let Some(main) = state.main_activity_mut() {
                main.trialmaster_success = true;
                main.trialmaster_full_finished = true;
            }
        }
        EventKind::TrialMasterTookReward => {
            failures.note(bump(state, store, stats::TRIALMASTER_TOOK_REWARD, ts, &mut signals));
            failures.note(bump(state, store, stats::TRIALMASTER_SUCCESS, ts, &mut signals));
            if let Some(main) = state.main_activity_mut() {
                main.trialmaster_success = true;
                main.trialmaster_full_finished = false;
            }
        }
        EventKind::TrialMasterRoundStarted => {
            if let Some(main) = state.main_activity_mut() {
                main.trial_round_count += 1;
            }
        }
        _ => {}
    }
    failures.finish_with(signals)
}

/// Map league mechanics. Zana always tags the main map, the rest the innermost one.
pub(super) fn handle_encounter(encounter: Encounter, state: &mut TrackingState) -> Vec<TrackerSignal> {
    if !areas::is_map_area(&state.current_area, "") {
        return Vec::new();
    }
    let target = match encounter {
        Encounter::Zana => state.main_activity_mut(),
        _ => state.innermost_mut(),
    };
    match target {
        Some(activity) => tag_activity(activity, &[encounter.tag()]),
        None => Vec::new(),
    }
}

/// First line of an expedition vendor inside a map run.
pub(super) fn handle_expedition(
    npc: ExpeditionNpc,
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    let applies = state
        .main_activity()
        .is_some_and(|a| a.kind == ActivityType::Map && !a.has_tag(npc.tag()));
    if !applies {
        return Ok(signals);
    }

    let ts = unix(event.timestamp);
    let mut failures = Failures::default();
    failures.note(bump(state, store, stats::EXPEDITION_ENCOUNTERS, ts, &mut signals));
    let per_npc = stats::expedition_encounters(npc.stat_suffix());
    failures.note(bump(state, store, &per_npc, ts, &mut signals));
    if let Some(main) = state.main_activity_mut() {
        signals.extend(tag_activity(main, &[EXPEDITION_TAG, npc.tag()]));
    }
    failures.finish_with(signals)
}

pub(super) fn handle_heist_speech(npc: HeistNpc, state: &mut TrackingState) -> Vec<TrackerSignal> {
    match state.main_activity_mut() {
        Some(main) if main.kind == ActivityType::Heist => tag_activity(main, &[npc.tag()]),
        _ => Vec::new(),
    }
}

pub(super) fn handle_lab_finished(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    let Some(area) = state
        .main_activity()
        .filter(|a| a.kind == ActivityType::Labyrinth)
        .map(|a| a.area.clone())
    else {
        return Ok(signals);
    };

    let ts = unix(event.timestamp);
    let mut failures = Failures::default();
    failures.note(bump(state, store, stats::LABS_FINISHED, ts, &mut signals));
    failures.note(bump(state, store, &stats::labs_completed(&area), ts, &mut signals));
    if let Some(main) = state.main_activity_mut() {
        main.success = true;
    }
    failures.note(finish_activity(state, store, settings, None, event.timestamp, &mut signals));
    failures.finish_with(signals)
}

/// Our own level-ups only: lines naming a party member are theirs.
pub(super) fn handle_level_up(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    if state.mentions_known_player(&event.raw_line) {
        return Ok(signals);
    }

    let ts = unix(event.timestamp);
    let mut failures = Failures::default();
    failures.note(bump(state, store, stats::LEVEL_UPS, ts, &mut signals));
    match level_up_level(&event.raw_line) {
        Ok(level) => {
            let raised = state
                .stats
                .raise_to(store, stats::HIGHEST_LEVEL, ts, state.bookmark, level)
                .map_err(TrackerError::from);
            if let Some(Some(value)) = failures.note(raised) {
                signals.push(TrackerSignal::StatChanged {
                    name: stats::HIGHEST_LEVEL.to_string(),
                    value,
                });
            }
        }
        Err(e) => tracing::debug!(line = event.line_number, error = %e, "Level-up without level"),
    }
    failures.finish_with(signals)
}

pub(super) fn handle_party_member(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    if let Ok(name) = player_name(&event.raw_line)
        && !state.is_known_player(name)
    {
        // Known for this session even if the roster write fails
        state.known_players.insert(name.to_string());
        store.add_known_player(name)?;
        tracing::debug!(player = name, "Party member added");
    }
    Ok(Vec::new())
}

fn tag_activity(activity: &mut Activity, tags: &[&str]) -> Vec<TrackerSignal> {
    let mut changed = false;
    for tag in tags {
        changed |= activity.add_tag(tag);
    }
    if !changed {
        return Vec::new();
    }
    vec![TrackerSignal::TagsChanged {
        area: activity.area.clone(),
        tags: activity.tags().to_vec(),
    }]
}
