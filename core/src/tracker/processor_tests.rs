//! Scenario tests for the activity state machine
//!
//! Each test feeds synthetic Client.txt lines through the classifier and the
//! tracker, then inspects records, counters and signals.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::activity::ActivityType;
use crate::client_log::{EventClassifier, fingerprint};
use crate::game_data::stats;
use crate::state::{TrackingMode, TrackingState};
use crate::game_data::TagDef;
use crate::storage::{ActivityStore, MemoryStore, RosterStore, StatsStore, StoreError};
use hashbrown::HashMap;
use waystone_types::{ActivityRecord, TrackerSettings};

use super::{ActivityTracker, TrackerError, TrackerSignal};

struct Harness {
    tracker: ActivityTracker,
    classifier: EventClassifier,
    state: TrackingState,
    store: MemoryStore,
    line_number: u64,
}

fn at(secs: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 2)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap()
        + TimeDelta::seconds(secs)
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(TrackerSettings::default())
    }

    fn with_settings(settings: TrackerSettings) -> Self {
        Self {
            tracker: ActivityTracker::new(settings),
            classifier: EventClassifier::new(),
            state: TrackingState::new(),
            store: MemoryStore::new(),
            line_number: 0,
        }
    }

    fn live(mut self) -> Self {
        self.state.mode = TrackingMode::Live;
        self
    }

    /// Feed one line `secs` seconds after the scenario start.
    fn feed(&mut self, secs: i64, text: &str) -> Vec<TrackerSignal> {
        let line = format!(
            "{} 1234567 a1b [INFO Client 4242] {text}",
            at(secs).format("%Y/%m/%d %H:%M:%S")
        );
        self.line_number += 1;
        let event = self
            .classifier
            .classify(self.line_number, fingerprint(&line), &line)
            .unwrap_or_else(|| panic!("line not classified: {line}"));
        self.tracker
            .process_event(&event, &mut self.state, &mut self.store)
            .unwrap()
    }

    fn enter(&mut self, secs: i64, area: &str) -> Vec<TrackerSignal> {
        self.feed(secs, &format!(": You have entered {area}."))
    }

    fn connect(&mut self, secs: i64, endpoint: &str) {
        self.feed(secs, &format!("Connecting to instance server at {endpoint}"));
    }

    fn level(&mut self, secs: i64, level: u32) {
        self.feed(secs, &format!("Generating level {level} area \"MapWorlds\" with seed 1"));
    }

    fn chat(&mut self, secs: i64, command: &str) -> Vec<TrackerSignal> {
        self.feed(secs, &format!("Mychar: ::{command}"))
    }

    fn records(&self) -> &[ActivityRecord] {
        self.store.records()
    }

    fn stat(&self, name: &str) -> i64 {
        assert_eq!(
            self.state.stats.get(name),
            self.store.counter(name),
            "memory and store disagree on {name}"
        );
        self.state.stats.get(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Basic map lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn map_then_town_yields_one_record() {
    let mut h = Harness::new();
    h.level(0, 75);
    h.enter(1, "Overgrown Shrine");
    let signals = h.enter(301, "Lioneye's Watch");

    assert_eq!(h.records().len(), 1);
    let record = &h.records()[0];
    assert_eq!(record.area, "Overgrown Shrine");
    assert_eq!(record.kind, ActivityType::Map);
    assert_eq!(record.area_level, 75);
    assert_eq!(record.death_counter, 0);
    assert_eq!(record.duration_secs, 300);
    assert!(!record.is_zana);

    assert_eq!(h.stat(stats::TOTAL_MAPS_DONE), 1);
    assert_eq!(h.stat(&stats::maps_finished("Overgrown Shrine")), 1);
    assert_eq!(h.stat(&stats::map_tier_finished(8)), 1);
    assert_eq!(h.stat(stats::AREA_CHANGES), 2);
    assert!(h.state.current.is_none());
    assert_eq!(h.state.current_area, "Lioneyes Watch");
    assert!(
        signals
            .iter()
            .any(|s| matches!(s, TrackerSignal::ActivityFinished(r) if r.area == "Overgrown Shrine"))
    );
}

#[test]
fn new_map_replaces_current_one() {
    let mut h = Harness::new();
    h.connect(0, "10.0.0.1:6112");
    h.enter(0, "Arcade");
    h.enter(200, "Karui Shores Hideout");
    h.connect(260, "10.0.0.2:6112");
    h.enter(260, "Strand");

    assert_eq!(h.records().len(), 1);
    let record = &h.records()[0];
    assert_eq!(record.area, "Arcade");
    // 200 s in the map, hideout time subtracted
    assert_eq!(record.duration_secs, 200);

    let current = h.state.main_activity().unwrap();
    assert_eq!(current.area, "Strand");
    assert_eq!(current.started_at, at(260));
    assert!(current.stopwatch_running());
}

#[test]
fn hideout_visit_pauses_and_resumes() {
    let mut h = Harness::new();
    h.connect(0, "10.0.0.1:6112");
    h.enter(0, "Arcade");
    let paused = h.enter(100, "Karui Shores Hideout");
    assert!(paused.contains(&TrackerSignal::PauseChanged {
        area: "Arcade".to_string(),
        paused: true
    }));

    let resumed = h.enter(160, "Arcade");
    assert!(resumed.contains(&TrackerSignal::PauseChanged {
        area: "Arcade".to_string(),
        paused: false
    }));
    assert_eq!(h.state.main_activity().unwrap().portals_used, 1);

    h.enter(300, "Lioneye's Watch");
    assert_eq!(h.records().len(), 1);
    assert_eq!(h.records()[0].duration_secs, 240);
}

#[test]
fn durations_are_never_negative() {
    let mut h = Harness::new();
    h.enter(100, "Arcade");
    // Out-of-order timestamps (clock change) clamp to zero
    h.enter(40, "Lioneye's Watch");
    assert_eq!(h.records()[0].duration_secs, 0);
}

#[test]
fn disconnect_finishes_current_activity() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.feed(90, "Abnormal disconnect: An unexpected disconnection occurred.");
    assert_eq!(h.records().len(), 1);
    assert_eq!(h.records()[0].duration_secs, 90);
    assert!(h.state.current.is_none());

    h.enter(100, "Strand");
    h.feed(150, "***** LOG FILE OPENING *****");
    assert_eq!(h.records().len(), 2);
}

#[test]
fn bookmark_tracks_last_handled_event() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    let bookmark = h.state.bookmark;
    assert_ne!(bookmark, 0);
    h.enter(10, "Strand");
    assert_ne!(h.state.bookmark, bookmark);
}

// ─────────────────────────────────────────────────────────────────────────────
// Idempotence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn replaying_a_finished_activity_persists_it_once() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.enter(120, "Lioneye's Watch");

    // Restart without a checkpoint: same lines, fresh state, same store
    h.state = TrackingState::new();
    h.enter(0, "Arcade");
    h.enter(120, "Lioneye's Watch");

    assert_eq!(h.records().len(), 1);
    assert_eq!(h.store.counter(stats::TOTAL_MAPS_DONE), 1);
    assert_eq!(h.state.stats.get(stats::TOTAL_MAPS_DONE), 0);
}

#[test]
fn known_keys_are_not_rewritten() {
    let mut h = Harness::new();
    h.state
        .persisted_keys
        .insert((at(0).and_utc().timestamp(), "Arcade".to_string()));
    h.enter(0, "Arcade");
    let signals = h.enter(120, "Lioneye's Watch");

    assert!(h.records().is_empty());
    assert!(!signals.iter().any(|s| matches!(s, TrackerSignal::ActivityFinished(_))));
    assert_eq!(h.stat(stats::TOTAL_MAPS_DONE), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Nesting
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn map_inside_map_is_nested() {
    let mut h = Harness::new();
    h.level(0, 80);
    h.enter(0, "Arcade");
    h.level(99, 70);
    let signals = h.enter(100, "Maze");

    let run = h.state.current.as_ref().unwrap();
    assert!(run.nested_active());
    assert!(!run.main.stopwatch_running());
    assert!(run.innermost().stopwatch_running());
    assert!(run.innermost().has_tag("zana-map"));
    assert_eq!(run.innermost().area_level, 70);
    assert!(signals.iter().any(|s| matches!(
        s,
        TrackerSignal::ActivityStarted { nested: true, .. }
    )));

    h.enter(160, "Arcade");
    let run = h.state.current.as_ref().unwrap();
    assert!(!run.nested_active());
    assert!(run.main.stopwatch_running());

    h.enter(400, "Lioneye's Watch");
    assert_eq!(h.records().len(), 2);
    let main = h.records().iter().find(|r| r.area == "Arcade").unwrap();
    let nested = h.records().iter().find(|r| r.area == "Maze").unwrap();
    assert_eq!(main.duration_secs, 340);
    assert!(!main.is_zana);
    assert_eq!(nested.duration_secs, 60);
    assert!(nested.is_zana);
    assert!(nested.has_tag("zana-map"));
    assert_eq!(h.stat(stats::TOTAL_MAPS_DONE), 2);
}

#[test]
fn nesting_never_goes_deeper_than_one_level() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.enter(10, "Maze");
    h.enter(20, "Strand");

    let run = h.state.current.as_ref().unwrap();
    assert!(!run.nested_active());
    assert_eq!(run.innermost().area, "Arcade");
    assert_eq!(run.nested().unwrap().area, "Maze");
}

#[test]
fn deaths_count_against_innermost_activity() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.enter(10, "Maze");
    h.feed(20, ": Mychar has been slain.");

    let run = h.state.current.as_ref().unwrap();
    assert_eq!(run.innermost().death_counter, 1);
    assert_eq!(run.main.death_counter, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Players
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn party_member_death_is_ignored() {
    let mut h = Harness::new();
    h.feed(0, ": Zeraphine has joined the area.");
    assert!(h.state.is_known_player("Zeraphine"));
    assert_eq!(h.store.load_known_players().unwrap(), vec!["Zeraphine".to_string()]);

    h.enter(5, "Arcade");
    h.feed(10, ": Zeraphine has been slain.");
    assert_eq!(h.stat(stats::TOTAL_KILLED_COUNT), 0);
    assert_eq!(h.state.innermost().unwrap().death_counter, 0);

    h.feed(20, ": Mychar has been slain.");
    assert_eq!(h.stat(stats::TOTAL_KILLED_COUNT), 1);
    assert_eq!(h.state.innermost().unwrap().death_counter, 1);
}

#[test]
fn deaths_in_town_only_count_globally() {
    let mut h = Harness::new();
    h.enter(0, "Lioneye's Watch");
    h.feed(10, ": Mychar has been slain.");
    assert_eq!(h.stat(stats::TOTAL_KILLED_COUNT), 1);
    assert!(h.state.current.is_none());
}

#[test]
fn level_ups_skip_party_members() {
    let mut h = Harness::new();
    h.feed(0, ": Zeraphine has joined the area.");
    h.feed(1, ": Zeraphine (Juggernaut) is now level 95");
    assert_eq!(h.stat(stats::LEVEL_UPS), 0);

    h.feed(2, ": Mychar (Witch) is now level 90");
    h.feed(3, ": Mychar (Witch) is now level 91");
    assert_eq!(h.stat(stats::LEVEL_UPS), 2);
    assert_eq!(h.stat(stats::HIGHEST_LEVEL), 91);
}

// ─────────────────────────────────────────────────────────────────────────────
// Area classification
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn laboratory_from_rogue_harbour_is_a_heist() {
    let mut h = Harness::new();
    h.enter(0, "The Rogue Harbour");
    h.enter(10, "Laboratory");
    assert_eq!(h.state.main_activity().unwrap().kind, ActivityType::Heist);

    let mut h = Harness::new();
    h.enter(0, "Karui Shores Hideout");
    h.enter(10, "Laboratory");
    assert_eq!(h.state.main_activity().unwrap().kind, ActivityType::Map);
}

#[test]
fn heist_crew_speech_tags_the_heist() {
    let mut h = Harness::new();
    h.enter(0, "The Rogue Harbour");
    h.enter(10, "Smugglers Den");
    h.feed(20, "Karst, the Lockpick: Let's get to work.");
    h.feed(30, "Karst, the Lockpick: Again.");
    assert_eq!(h.state.main_activity().unwrap().tags(), ["karst".to_string()]);

    h.enter(100, "The Rogue Harbour");
    h.enter(110, "Lioneye's Watch");
    assert_eq!(h.records()[0].kind, ActivityType::Heist);
    assert_eq!(h.stat(stats::TOTAL_HEISTS_DONE), 1);
    assert_eq!(h.stat(&stats::heists_finished("Smugglers Den")), 1);
}

#[test]
fn temple_counts_when_finished() {
    let mut h = Harness::new();
    h.enter(0, "The Temple of Atzoatl");
    h.enter(50, "Karui Shores Hideout");
    assert_eq!(h.records()[0].kind, ActivityType::Temple);
    assert_eq!(h.stat(stats::TEMPLES_DONE), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Labyrinth, delve, simulacrum
// ─────────────────────────────────────────────────────────────────────────────

fn start_uber_lab(h: &mut Harness) {
    h.enter(0, "Aspirants Plaza");
    h.level(5, 75);
    h.enter(10, "Estate Path");
}

#[test]
fn labyrinth_completion() {
    let mut h = Harness::new();
    start_uber_lab(&mut h);
    let lab = h.state.main_activity().unwrap();
    assert_eq!(lab.area, "Uber-Lab");
    assert_eq!(lab.kind, ActivityType::Labyrinth);
    assert_eq!(h.stat(stats::LABS_STARTED), 1);

    h.enter(100, "Estate Walkways");
    h.enter(200, "Aspirants Trial");
    assert_eq!(h.state.main_activity().unwrap().trial_round_count, 1);
    h.feed(300, "Izaro: Triumphant at last!");

    assert_eq!(h.records().len(), 1);
    let record = &h.records()[0];
    assert!(record.success);
    assert_eq!(record.round_count, 1);
    assert_eq!(h.stat(stats::LABS_FINISHED), 1);
    assert_eq!(h.stat(&stats::labs_completed("Uber-Lab")), 1);
}

#[test]
fn abandoned_labyrinth_is_discarded() {
    let mut h = Harness::new();
    start_uber_lab(&mut h);
    let signals = h.enter(100, "Karui Shores Hideout");

    assert!(h.records().is_empty());
    assert!(h.state.current.is_none());
    assert!(signals.iter().any(|s| matches!(
        s,
        TrackerSignal::ActivityDiscarded { area, .. } if area == "Uber-Lab"
    )));
}

#[test]
fn abandoned_labyrinth_kept_when_discard_disabled() {
    let mut h = Harness::with_settings(TrackerSettings {
        discard_incomplete_labs: false,
        ..TrackerSettings::default()
    });
    start_uber_lab(&mut h);
    h.enter(100, "Karui Shores Hideout");
    assert_eq!(h.records().len(), 1);
    assert!(!h.records()[0].success);
}

#[test]
fn death_ends_labyrinth() {
    let mut h = Harness::new();
    start_uber_lab(&mut h);
    h.feed(50, ": Mychar has been slain.");

    assert_eq!(h.records().len(), 1);
    assert_eq!(h.records()[0].death_counter, 1);
    assert!(!h.records()[0].success);
    assert!(h.state.current.is_none());
}

#[test]
fn delve_tracks_deepest_level() {
    let mut h = Harness::new();
    h.level(0, 80);
    h.enter(1, "Azurite Mine");
    h.level(100, 95);
    h.enter(101, "Azurite Mine");
    h.level(200, 90);
    h.enter(201, "Azurite Mine");
    assert_eq!(h.state.main_activity().unwrap().area_level, 95);

    h.enter(300, "Karui Shores Hideout");
    assert_eq!(h.records().len(), 1);
    assert_eq!(h.records()[0].kind, ActivityType::Delve);
    assert_eq!(h.records()[0].area_level, 95);
}

#[test]
fn simulacrum_counted_once_per_instance() {
    let mut h = Harness::new();
    h.connect(0, "10.0.0.9:6112");
    h.enter(0, "Lunacy's Watch");
    assert_eq!(h.state.main_activity().unwrap().kind, ActivityType::Simulacrum);
    h.enter(300, "Karui Shores Hideout");
    h.connect(320, "10.0.0.9:6112");
    h.enter(320, "Lunacy's Watch");
    assert_eq!(h.stat(stats::SIMULACRUM_STARTED), 1);

    h.feed(600, "Strange Voice: So be it. Keep your precious sanity, then.");
    h.enter(620, "Lioneye's Watch");
    assert_eq!(h.records().len(), 1);
    assert_eq!(h.records()[0].duration_secs, 600);
    assert_eq!(h.stat(stats::SIMULACRUM_CLEARED), 1);
    assert_eq!(h.stat(&stats::simulacrum_finished("Lunacys Watch")), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Bosses and encounters
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn shaper_kill_needs_three_lines() {
    let mut h = Harness::new();
    h.enter(0, "The Shaper's Realm");
    h.feed(1, "The Shaper: I see you, exile.");
    for i in 0..3 {
        h.feed(10 + i, "The Shaper: Irrelevant.");
    }
    assert_eq!(h.stat(stats::SHAPER_TRIED), 1);
    assert_eq!(h.stat(stats::SHAPER_KILLED), 1);

    for i in 0..2 {
        h.feed(20 + i, "The Shaper: Irrelevant.");
    }
    assert_eq!(h.stat(stats::SHAPER_KILLED), 1);
}

#[test]
fn repeated_conqueror_death_speech_counts_once() {
    let mut h = Harness::new();
    h.feed(0, "Al-Hezmin, the Hunter: Finally, worthy prey!");
    h.feed(10, "Al-Hezmin, the Hunter: The hunt is over.");
    h.feed(11, "Al-Hezmin, the Hunter: The hunt is over.");
    assert_eq!(h.stat(stats::HUNTER_STARTED), 1);
    assert_eq!(h.stat(stats::HUNTER_KILLED), 1);

    h.feed(20, "Al-Hezmin, the Hunter: Finally, worthy prey!");
    h.feed(30, "Al-Hezmin, the Hunter: The hunt is over.");
    assert_eq!(h.stat(stats::HUNTER_KILLED), 2);
}

#[test]
fn elder_attempt_survives_portals() {
    let mut h = Harness::new();
    h.enter(0, "Absence of Value and Meaning");
    h.enter(60, "Karui Shores Hideout");
    h.enter(90, "Absence of Value and Meaning");
    assert_eq!(h.stat(stats::ELDER_TRIED), 1);

    h.feed(200, "Zana, Master Cartographer: Rest now, father.");
    assert_eq!(h.stat(stats::ELDER_KILLED), 1);
    assert!(!h.state.elder_fight_active);
}

#[test]
fn trialmaster_outcomes() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.feed(1, "The Trialmaster: Let the trial begin.");
    h.feed(2, "The Trialmaster: Round 1.");
    h.feed(3, "The Trialmaster: Round 2.");
    h.feed(4, "The Trialmaster: You have chosen to take your reward.");

    let main = h.state.main_activity().unwrap();
    assert_eq!(main.trial_round_count, 2);
    assert!(main.trialmaster_success);
    assert!(!main.trialmaster_full_finished);
    assert_eq!(h.stat(stats::TRIALMASTER_STARTED), 1);
    assert_eq!(h.stat(stats::TRIALMASTER_TOOK_REWARD), 1);
    assert_eq!(h.stat(stats::TRIALMASTER_SUCCESS), 1);

    h.feed(10, "The Trialmaster: Victorious!");
    assert!(h.state.main_activity().unwrap().trialmaster_full_finished);
    assert_eq!(h.stat(stats::TRIALMASTER_SUCCESS), 2);
}

#[test]
fn encounter_tags_only_inside_maps() {
    let mut h = Harness::new();
    h.enter(0, "Lioneye's Watch");
    h.feed(1, "Sister Cassia: Ah, a fellow traveller.");
    assert!(h.state.current.is_none());

    h.enter(10, "Arcade");
    h.feed(11, "Sister Cassia: The blight approaches.");
    h.feed(12, "Einhar, Beastmaster: Exile! Come, hunt with Einhar.");
    h.enter(20, "Maze");
    h.feed(21, "Jun, Veiled Master: Let's take them down.");
    h.feed(22, "Zana, Master Cartographer: Hello, exile.");

    let run = h.state.current.as_ref().unwrap();
    assert_eq!(run.main.tags(), ["blight".to_string(), "einhar".to_string(), "zana".to_string()]);
    assert_eq!(
        run.innermost().tags(),
        ["zana-map".to_string(), "syndicate".to_string()]
    );
}

#[test]
fn expedition_counted_once_per_vendor() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.feed(1, "Dannig, Warrior Skald: Well met.");
    h.feed(2, "Dannig, Warrior Skald: Again.");
    h.feed(3, "Rog, the Dealer: Trade?");

    assert_eq!(h.stat(stats::EXPEDITION_ENCOUNTERS), 2);
    assert_eq!(h.stat(&stats::expedition_encounters("Dannig")), 1);
    assert_eq!(h.stat(&stats::expedition_encounters("Rog")), 1);
    assert_eq!(
        h.state.main_activity().unwrap().tags(),
        ["expedition".to_string(), "dannig".to_string(), "rog".to_string()]
    );
}

#[test]
fn beast_captures_count() {
    let mut h = Harness::new();
    h.feed(0, "Einhar, Beastmaster: Great job, exile! Einhar will take the captured beast to the Menagerie.");
    assert_eq!(h.stat(stats::EINHAR_CAPTURES), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chat_tag_and_untag() {
    let mut h = Harness::new().live();
    h.enter(0, "Arcade");

    let signals = h.chat(10, "tag juggernaut");
    assert!(h.state.innermost().unwrap().has_tag("juggernaut"));
    assert!(signals.iter().any(|s| matches!(s, TrackerSignal::TagsChanged { .. })));
    assert!(
        h.store
            .load_tags()
            .unwrap()
            .iter()
            .any(|t| t.id == "juggernaut" && !t.is_default)
    );

    h.chat(20, "untag juggernaut");
    assert!(!h.state.innermost().unwrap().has_tag("juggernaut"));
}

#[test]
fn chat_tag_targets_nested_map() {
    let mut h = Harness::new().live();
    h.enter(0, "Arcade");
    h.enter(10, "Maze");
    h.chat(20, "tag juggernaut");
    let run = h.state.current.as_ref().unwrap();
    assert!(run.innermost().has_tag("juggernaut"));
    assert!(!run.main.has_tag("juggernaut"));
}

#[test]
fn chat_rejects_default_and_invalid_tags() {
    let mut h = Harness::new().live();
    h.enter(0, "Arcade");
    h.chat(1, "tag blight");
    h.chat(2, "tag a=b");
    h.chat(3, "tagg x");
    assert!(h.state.innermost().unwrap().tags().is_empty());
}

#[test]
fn chat_ignored_during_catch_up() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    h.chat(10, "tag juggernaut");
    h.chat(11, "pause");
    let main = h.state.main_activity().unwrap();
    assert!(main.tags().is_empty());
    assert!(!main.manually_paused);
}

#[test]
fn chat_pause_and_resume() {
    let mut h = Harness::new().live();
    h.enter(0, "Arcade");
    h.chat(50, "pause");
    assert!(h.state.main_activity().unwrap().manually_paused);
    h.chat(150, "resume");
    h.enter(200, "Lioneye's Watch");
    assert_eq!(h.records()[0].duration_secs, 100);
}

#[test]
fn chat_finish_respects_nesting() {
    let mut h = Harness::new().live();
    h.enter(0, "Arcade");
    h.enter(10, "Maze");
    h.chat(20, "finish");
    assert!(h.state.current.is_some());

    h.enter(30, "Arcade");
    h.chat(40, "finish");
    assert!(h.state.current.is_none());
    assert_eq!(h.records().len(), 2);
}

#[test]
fn chat_tag_updates_persisted_record() {
    let mut h = Harness::new().live();
    h.enter(0, "Arcade");
    h.enter(100, "Lioneye's Watch");

    // Same activity replayed while its record already exists
    h.state.persisted_keys.clear();
    h.state.current_area.clear();
    h.enter(0, "Arcade");
    h.state
        .persisted_keys
        .insert((at(0).and_utc().timestamp(), "Arcade".to_string()));
    h.chat(50, "tag juggernaut");

    let records = h.store.load_all_activity_records().unwrap();
    assert_eq!(records[0].tags, vec!["juggernaut".to_string()]);
}

#[test]
fn stat_changes_are_signalled() {
    let mut h = Harness::new();
    let signals = h.enter(0, "Arcade");
    assert!(signals.contains(&TrackerSignal::StatChanged {
        name: stats::AREA_CHANGES.to_string(),
        value: 1
    }));
}

#[test]
fn laboratory_outside_rogue_harbour_is_a_map() {
    let mut h = Harness::new();
    h.enter(0, "Aspirants Plaza");
    h.enter(10, "Laboratory");
    assert_eq!(h.state.main_activity().unwrap().kind, ActivityType::Map);
    assert_eq!(h.stat(stats::LABS_STARTED), 0);

    h.enter(200, "Lioneye's Watch");
    assert_eq!(h.records().len(), 1);
    assert_eq!(h.records()[0].kind, ActivityType::Map);
    assert_eq!(h.stat(&stats::maps_finished("Laboratory")), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Store failures
// ─────────────────────────────────────────────────────────────────────────────

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: bool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.failing {
            Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        } else {
            Ok(())
        }
    }
}

impl ActivityStore for FlakyStore {
    fn append_activity_record(&mut self, record: &ActivityRecord) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.append_activity_record(record)
    }

    fn update_activity_tags(&mut self, timestamp: i64, area: &str, tags: &[String]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update_activity_tags(timestamp, area, tags)
    }

    fn load_all_activity_records(&self) -> Result<Vec<ActivityRecord>, StoreError> {
        self.inner.load_all_activity_records()
    }

    fn clear_activity_records(&mut self) -> Result<(), StoreError> {
        self.inner.clear_activity_records()
    }
}

impl StatsStore for FlakyStore {
    fn increment_stat(&mut self, name: &str, timestamp: i64, event: u64, delta: i64) -> Result<(), StoreError> {
        self.check()?;
        self.inner.increment_stat(name, timestamp, event, delta)
    }

    fn load_stat_counters(&self) -> Result<HashMap<String, i64>, StoreError> {
        self.inner.load_stat_counters()
    }

    fn last_stat_event(&self) -> Result<Option<u64>, StoreError> {
        self.inner.last_stat_event()
    }

    fn clear_stats(&mut self) -> Result<(), StoreError> {
        self.inner.clear_stats()
    }
}

impl RosterStore for FlakyStore {
    fn add_known_player(&mut self, name: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.add_known_player(name)
    }

    fn load_known_players(&self) -> Result<Vec<String>, StoreError> {
        self.inner.load_known_players()
    }

    fn add_tag(&mut self, tag: &TagDef) -> Result<(), StoreError> {
        self.check()?;
        self.inner.add_tag(tag)
    }

    fn load_tags(&self) -> Result<Vec<TagDef>, StoreError> {
        self.inner.load_tags()
    }
}

fn flaky_feed(
    tracker: &ActivityTracker,
    state: &mut TrackingState,
    store: &mut FlakyStore,
    line_number: u64,
    secs: i64,
    area: &str,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let line = format!(
        "{} 1234567 a1b [INFO Client 4242] : You have entered {area}.",
        at(secs).format("%Y/%m/%d %H:%M:%S")
    );
    let event = EventClassifier::new()
        .classify(line_number, fingerprint(&line), &line)
        .unwrap();
    tracker.process_event(&event, state, store)
}

#[test]
fn rejected_write_still_completes_the_transition() {
    let tracker = ActivityTracker::default();
    let mut state = TrackingState::new();
    let mut store = FlakyStore::default();

    flaky_feed(&tracker, &mut state, &mut store, 1, 0, "Arcade").unwrap();

    store.failing = true;
    let err = flaky_feed(&tracker, &mut state, &mut store, 2, 150, "Smugglers Den").unwrap_err();
    assert!(matches!(err, TrackerError::Partial { .. }));
    assert!(err.signals().iter().any(|s| matches!(
        s,
        TrackerSignal::ActivityStarted { area, nested: false, .. } if area == "Smugglers Den"
    )));
    assert_eq!(state.main_activity().unwrap().kind, ActivityType::Heist);
    assert_eq!(state.current_area, "Smugglers Den");
    assert_eq!(state.unsaved_records.len(), 1);
    assert!(store.inner.records().is_empty());

    // The parked record is written first once the store recovers
    store.failing = false;
    flaky_feed(&tracker, &mut state, &mut store, 3, 400, "Lioneye's Watch").unwrap();
    let areas: Vec<_> = store.inner.records().iter().map(|r| r.area.as_str()).collect();
    assert_eq!(areas, ["Arcade", "Smugglers Den"]);
    assert!(state.unsaved_records.is_empty());
    assert_eq!(state.stats.get(stats::TOTAL_MAPS_DONE), 1);
    assert_eq!(store.inner.counter(stats::TOTAL_MAPS_DONE), 1);
    assert_eq!(store.inner.counter(stats::TOTAL_HEISTS_DONE), 1);
    // The rejected area-change increment is missing from both
    assert_eq!(state.stats.get(stats::AREA_CHANGES), 2);
    assert_eq!(store.inner.counter(stats::AREA_CHANGES), 2);
}

#[test]
fn increments_carry_the_event_fingerprint() {
    let mut h = Harness::new();
    h.enter(0, "Arcade");
    let bookmark = h.state.bookmark;
    assert_eq!(h.store.stat_rows().last().map(|r| r.3), Some(bookmark));
}
