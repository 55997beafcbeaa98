//! Area name tables
//!
//! Names are stored the way `client_log::area_name` normalizes them:
//! periods and apostrophes removed.

use phf::{Set, phf_set};
use waystone_types::ActivityType;

/// Entered from the Rogue Harbour it is a heist, otherwise a map.
pub const AMBIGUOUS_LABORATORY: &str = "Laboratory";
pub const ROGUE_HARBOUR: &str = "The Rogue Harbour";
pub const ASPIRANTS_PLAZA: &str = "Aspirants Plaza";
pub const ASPIRANTS_TRIAL: &str = "Aspirants Trial";
pub const AZURITE_MINE: &str = "Azurite Mine";
pub const TEMPLE_OF_ATZOATL: &str = "The Temple of Atzoatl";
pub const ELDER_ARENA: &str = "Absence of Value and Meaning";
/// Source-area prefix of labyrinth trial rooms in the campaign
pub const LAB_TRIAL_MARKER: &str = "Trial of";

pub static MAP_AREAS: Set<&'static str> = phf_set! {
    "Academy", "Acid Caverns", "Alleyways", "Ancient City", "Arachnid Nest",
    "Arachnid Tomb", "Arcade", "Arena", "Arid Lake", "Armoury", "Arsenal",
    "Ashen Wood", "Atoll", "Barrows", "Basilica", "Bazaar", "Beach", "Belfry",
    "Bog", "Bone Crypt", "Bramble Valley", "Burial Chambers", "Cage", "Caldera",
    "Canyon", "Carcass", "Castle Ruins", "Cells", "Cemetery", "Channel",
    "Chateau", "City Square", "Cold River", "Colonnade", "Colosseum",
    "Conservatory", "Coral Ruins", "Core", "Courthouse", "Courtyard", "Coves",
    "Crater", "Crimson Temple", "Crimson Township", "Crystal Ore", "Cursed Crypt",
    "Dark Forest", "Defiled Cathedral", "Desert", "Desert Spring", "Dig",
    "Dunes", "Dungeon", "Estuary", "Excavation", "Factory", "Fields",
    "Flooded Mine", "Forbidden Woods", "Forge of the Phoenix", "Fungal Hollow",
    "Gardens", "Geode", "Ghetto", "Glacier", "Grave Trough", "Graveyard",
    "Grotto", "Haunted Mansion", "Iceberg", "Infested Valley", "Ivory Temple",
    "Jungle Valley", "Lair", "Lair of the Hydra", "Lava Chamber", "Lava Lake",
    "Leyline", "Lighthouse", "Lookout", "Malformation", "Marshes", "Mausoleum",
    "Maze", "Maze of the Minotaur", "Mesa", "Mineral Pools", "Moon Temple",
    "Mud Geyser", "Museum", "Necropolis", "Orchard", "Overgrown Ruin",
    "Overgrown Shrine", "Palace", "Park", "Pen", "Peninsula", "Phantasmagoria",
    "Pier", "Pit", "Pit of the Chimera", "Plateau", "Plaza", "Port", "Precinct",
    "Primordial Blocks", "Primordial Pool", "Promenade", "Racecourse", "Ramparts",
    "Reef", "Residence", "Scriptorium", "Sepulchre", "Shipyard", "Shore",
    "Shrine", "Siege", "Silo", "Spider Forest", "Spider Lair", "Stagnation",
    "Strand", "Sulphur Vents", "Summit", "Sunken City", "Temple", "Terrace",
    "Thicket", "Toxic Sewer", "Tower", "Tropical Island", "Underground River",
    "Underground Sea", "Vaal Pyramid", "Vaal Temple", "Vault", "Villa",
    "Volcano", "Waste Pool", "Wasteland", "Waterways", "Wharf",
    "The Shapers Realm", "Absence of Value and Meaning", "The Alluring Abyss",
    "The Apex of Sacrifice", "The Beachhead", "The Perandus Manor", "The Twilight Temple",
    "Doryanis Machinarium", "Hall of Grandmasters", "Whakawairua Tuahu",
    "Olmecs Sanctum", "Pillars of Arun", "Poorjoys Asylum", "Death and Taxes",
    "Actons Nightmare", "Caer Blaidd, Wolfpacks Den", "Obas Cursed Trove",
    "Mao Kun", "Untainted Paradise", "Vaults of Atziri", "The Vinktar Square",
    "The Cowards Trial", "Maelstrom of Chaos", "Hallowed Ground",
    "The Putrid Cloister", "Augury of Penitence", "Cortex", "Frozen Cabins",
    "Rewritten Distant Memory", "Altered Distant Memory",
    "Augmented Distant Memory", "Twisted Distant Memory", "Polaric Void",
    "Seething Chyme", "The Pale Court", "Eye of the Storm", "The Mavens Crucible",
    "The Feared", "The Formed", "The Forgotten", "The Hidden", "The Twisted",
};

pub static HEIST_AREAS: Set<&'static str> = phf_set! {
    "Bunker", "Mansion", "Prohibited Library", "Records Office",
    "Repository", "Smugglers Den", "Tunnels", "Underbelly",
    "The Den", "The Enigma", "The Hunted", "The Pretender",
};

pub static SIMULACRUM_AREAS: Set<&'static str> = phf_set! {
    "The Bridge Enraptured", "Oriath Delusion", "The Syndrome Encampment",
    "Hysteriagate", "Lunacys Watch",
};

pub static LABYRINTH_AREAS: Set<&'static str> = phf_set! {
    "Estate Path", "Estate Walkways", "Estate Crossing",
};

/// Safe areas other than hideouts where a run is paused, not ended.
pub static CAMP_AREAS: Set<&'static str> = phf_set! {
    "The Rogue Harbour",
};

pub fn is_map_area(area: &str, source: &str) -> bool {
    if area == AMBIGUOUS_LABORATORY {
        return source != ROGUE_HARBOUR;
    }
    MAP_AREAS.contains(area.trim())
}

pub fn is_heist_area(area: &str, source: &str) -> bool {
    if area == AMBIGUOUS_LABORATORY {
        return source == ROGUE_HARBOUR;
    }
    HEIST_AREAS.contains(area.trim())
}

pub fn is_simulacrum_area(area: &str) -> bool {
    SIMULACRUM_AREAS.contains(area.trim())
}

pub fn is_labyrinth_area(area: &str) -> bool {
    LABYRINTH_AREAS.contains(area)
}

/// Hideouts and camps: entering one from a run pauses it.
pub fn is_camp_or_hideout(area: &str) -> bool {
    area.contains("Hideout") || CAMP_AREAS.contains(area)
}

/// Activity type of the target area, using the source to resolve ambiguous names.
pub fn classify_area(target: &str, source: &str) -> Option<ActivityType> {
    if is_map_area(target, source) {
        Some(ActivityType::Map)
    } else if is_heist_area(target, source) {
        Some(ActivityType::Heist)
    } else if is_simulacrum_area(target) {
        Some(ActivityType::Simulacrum)
    } else if is_labyrinth_area(target) {
        Some(ActivityType::Labyrinth)
    } else if target == AZURITE_MINE {
        Some(ActivityType::Delve)
    } else if target == TEMPLE_OF_ATZOATL {
        Some(ActivityType::Temple)
    } else {
        None
    }
}

/// Labyrinth difficulty by the level of its first room
pub fn labyrinth_name(area_level: u32) -> &'static str {
    match area_level {
        33 => "The Labyrinth",
        55 => "The Cruel Labyrinth",
        68 => "The Merciless Labyrinth",
        75 => "Uber-Lab",
        83 => "Advanced Uber-Lab",
        _ => "Unknown",
    }
}
