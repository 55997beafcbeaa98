//! Stat catalogue
//!
//! Static counters with display names, plus per-area / per-tier keys built at runtime.

use phf::{Map, phf_map};

pub const AREA_CHANGES: &str = "AreaChanges";
pub const TOTAL_KILLED_COUNT: &str = "TotalKilledCount";
pub const HIGHEST_LEVEL: &str = "HighestLevel";
pub const LEVEL_UPS: &str = "LevelUps";
pub const TOTAL_MAPS_DONE: &str = "TotalMapsDone";
pub const TOTAL_HEISTS_DONE: &str = "TotalHeistsDone";
pub const TEMPLES_DONE: &str = "TemplesDone";
pub const LABS_STARTED: &str = "LabsStarted";
pub const LABS_FINISHED: &str = "LabsFinished";
pub const SIMULACRUM_STARTED: &str = "SimulacrumStarted";
pub const SIMULACRUM_CLEARED: &str = "SimulacrumCleared";
pub const ELDER_TRIED: &str = "ElderTried";
pub const ELDER_KILLED: &str = "ElderKilled";
pub const SHAPER_TRIED: &str = "ShaperTried";
pub const SHAPER_KILLED: &str = "ShaperKilled";
pub const SIRUS_STARTED: &str = "SirusStarted";
pub const SIRUS_KILLED: &str = "SirusKilled";
pub const MAVEN_STARTED: &str = "MavenStarted";
pub const MAVEN_KILLED: &str = "MavenKilled";
pub const CATARINA_TRIED: &str = "CatarinaTried";
pub const CATARINA_KILLED: &str = "CatarinaKilled";
pub const VERITANIA_STARTED: &str = "VeritaniaStarted";
pub const VERITANIA_KILLED: &str = "VeritaniaKilled";
pub const BARAN_STARTED: &str = "BaranStarted";
pub const BARAN_KILLED: &str = "BaranKilled";
pub const DROX_STARTED: &str = "DroxStarted";
pub const DROX_KILLED: &str = "DroxKilled";
pub const HUNTER_STARTED: &str = "HunterStarted";
pub const HUNTER_KILLED: &str = "HunterKilled";
pub const TRIALMASTER_STARTED: &str = "TrialMasterStarted";
pub const TRIALMASTER_KILLED: &str = "TrialMasterKilled";
pub const TRIALMASTER_TOOK_REWARD: &str = "TrialMasterTookReward";
pub const TRIALMASTER_VICTORY: &str = "TrialMasterVictory";
pub const TRIALMASTER_SUCCESS: &str = "TrialMasterSuccess";
pub const EINHAR_CAPTURES: &str = "EinharCaptures";
pub const EXPEDITION_ENCOUNTERS: &str = "ExpeditionEncounters";

pub static STAT_NAMES: Map<&'static str, &'static str> = phf_map! {
    "AreaChanges" => "Area changes",
    "TotalKilledCount" => "Death count",
    "HighestLevel" => "Highest level reached",
    "LevelUps" => "Level Ups",
    "TotalMapsDone" => "Total maps done",
    "TotalHeistsDone" => "Total heists done",
    "TemplesDone" => "Temples done",
    "LabsStarted" => "Labs started",
    "LabsFinished" => "Finished labs",
    "SimulacrumStarted" => "Simulacrum started",
    "SimulacrumCleared" => "Simulacrum 100% done",
    "ElderTried" => "Elder tried",
    "ElderKilled" => "Elder killed",
    "ShaperTried" => "Shaper tried",
    "ShaperKilled" => "Shaper killed",
    "SirusStarted" => "Sirus tried",
    "SirusKilled" => "Sirus killed",
    "MavenStarted" => "Maven tried",
    "MavenKilled" => "Maven killed",
    "CatarinaTried" => "Catarina tried",
    "CatarinaKilled" => "Catarina killed",
    "VeritaniaStarted" => "Veritania tried",
    "VeritaniaKilled" => "Veritania killed (not reliable*)",
    "BaranStarted" => "Baran tried",
    "BaranKilled" => "Baran killed (not reliable*)",
    "DroxStarted" => "Drox tried",
    "DroxKilled" => "Drox killed (not reliable*)",
    "HunterStarted" => "Hunter tried",
    "HunterKilled" => "Hunter killed (not reliable*)",
    "TrialMasterStarted" => "Trialmaster-Fight tried",
    "TrialMasterKilled" => "Trialmaster killed",
    "TrialMasterTookReward" => "Ultimatum: took rewards",
    "TrialMasterVictory" => "Ultimatum: cleared all rounds",
    "TrialMasterSuccess" => "Ultimatum: did not fail",
    "EinharCaptures" => "Einhar beasts captured",
    "ExpeditionEncounters" => "Expedition encounters",
    "ExpeditionEncounters_Rog" => "Expedition encounters: Rog",
    "ExpeditionEncounters_Tujen" => "Expedition encounters: Tujen",
    "ExpeditionEncounters_Gwennen" => "Expedition encounters: Gwennen",
    "ExpeditionEncounters_Dannig" => "Expedition encounters: Dannig",
};

/// Prefix → display prefix for keys built from area names or tiers
static DYNAMIC_PREFIXES: &[(&str, &str)] = &[
    ("HeistsFinished_", "Heists done: "),
    ("MapsFinished_", "Maps done: "),
    ("MapTierFinished_", "Maps done: "),
    ("SimulacrumFinished_", "Simulacrum done: "),
    ("LabsCompleted_", "Labs completed: "),
];

pub const MAX_MAP_TIER: u32 = 16;

pub fn heists_finished(area: &str) -> String {
    format!("HeistsFinished_{area}")
}

pub fn maps_finished(area: &str) -> String {
    format!("MapsFinished_{area}")
}

pub fn map_tier_finished(tier: u32) -> String {
    format!("MapTierFinished_T{}", tier.min(MAX_MAP_TIER))
}

pub fn simulacrum_finished(area: &str) -> String {
    format!("SimulacrumFinished_{area}")
}

pub fn labs_completed(area: &str) -> String {
    format!("LabsCompleted_{area}")
}

pub fn expedition_encounters(npc_suffix: &str) -> String {
    format!("{EXPEDITION_ENCOUNTERS}_{npc_suffix}")
}

/// Static or dynamic key this version knows how to produce
pub fn is_known_stat(key: &str) -> bool {
    STAT_NAMES.contains_key(key) || DYNAMIC_PREFIXES.iter().any(|(p, _)| key.starts_with(p))
}

pub fn long_name(key: &str) -> String {
    if let Some(name) = STAT_NAMES.get(key) {
        return (*name).to_string();
    }
    for (prefix, display) in DYNAMIC_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{display}{rest}");
        }
    }
    key.to_string()
}
