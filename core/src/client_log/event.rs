use chrono::NaiveDateTime;

/// Expedition vendors whose dialogue marks an expedition encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpeditionNpc {
    Dannig,
    Gwennen,
    Tujen,
    Rog,
}

impl ExpeditionNpc {
    /// Tag id attached to the activity
    pub fn tag(&self) -> &'static str {
        match self {
            ExpeditionNpc::Dannig => "dannig",
            ExpeditionNpc::Gwennen => "gwennen",
            ExpeditionNpc::Tujen => "tujen",
            ExpeditionNpc::Rog => "rog",
        }
    }

    /// Suffix of the per-npc encounter stat
    pub fn stat_suffix(&self) -> &'static str {
        match self {
            ExpeditionNpc::Dannig => "Dannig",
            ExpeditionNpc::Gwennen => "Gwennen",
            ExpeditionNpc::Tujen => "Tujen",
            ExpeditionNpc::Rog => "Rog",
        }
    }
}

/// Heist crew members. Their speech inside a heist tags the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeistNpc {
    Karst,
    Tibbs,
    Isla,
    Tullina,
    Niles,
    Nenet,
    Vinderi,
    Gianna,
    Huck,
}

impl HeistNpc {
    pub fn tag(&self) -> &'static str {
        match self {
            HeistNpc::Karst => "karst",
            HeistNpc::Tibbs => "tibbs",
            HeistNpc::Isla => "isla",
            HeistNpc::Tullina => "tullina",
            HeistNpc::Niles => "niles",
            HeistNpc::Nenet => "nenet",
            HeistNpc::Vinderi => "vinderi",
            HeistNpc::Gianna => "gianna",
            HeistNpc::Huck => "huck",
        }
    }
}

/// League mechanics announced by NPC dialogue inside a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encounter {
    Delirium,
    Blight,
    Einhar,
    Incursion,
    Niko,
    Zana,
    Syndicate,
}

impl Encounter {
    pub fn tag(&self) -> &'static str {
        match self {
            Encounter::Delirium => "delirium",
            Encounter::Blight => "blight",
            Encounter::Einhar => "einhar",
            Encounter::Incursion => "incursion",
            Encounter::Niko => "niko",
            Encounter::Zana => "zana",
            Encounter::Syndicate => "syndicate",
        }
    }
}

/// Classified meaning of a single Client.txt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Client / connection
    ClientStarted,
    AbnormalDisconnect,
    InstanceConnected,
    NextAreaLevel,
    AreaEntered,

    // Players
    ChatCommand,
    PlayerDied,
    PartyMemberJoined,
    LevelUp,

    // Pinnacle bosses
    ShaperFightStarted,
    ShaperKilled,
    ElderKilled,
    SirusFightStarted,
    SirusKilled,
    MavenFightStarted,
    MavenKilled,
    CatarinaFightStarted,
    CatarinaKilled,

    // Conquerors (death speech may repeat)
    VeritaniaFightStarted,
    VeritaniaKilled,
    BaranFightStarted,
    BaranKilled,
    DroxFightStarted,
    DroxKilled,
    HunterFightStarted,
    HunterKilled,

    // Ultimatum
    TrialMasterStarted,
    TrialMasterRoundStarted,
    TrialMasterVictory,
    TrialMasterTookReward,
    TrialMasterKilled,

    // Misc content
    EinharBeastCaptured,
    SimulacrumFullClear,
    LabFinished,
    LabStartInfo,

    Encounter(Encounter),
    Expedition(ExpeditionNpc),
    HeistSpeech(HeistNpc),
}

impl EventKind {
    /// Conqueror events feed the repeated-death-speech memo.
    pub fn is_conqueror(&self) -> bool {
        matches!(
            self,
            EventKind::VeritaniaFightStarted
                | EventKind::VeritaniaKilled
                | EventKind::BaranFightStarted
                | EventKind::BaranKilled
                | EventKind::DroxFightStarted
                | EventKind::DroxKilled
                | EventKind::HunterFightStarted
                | EventKind::HunterKilled
        )
    }
}

/// Immutable event produced by the classifier and consumed once by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingEvent {
    pub kind: EventKind,
    pub timestamp: NaiveDateTime,
    pub raw_line: String,
    pub line_number: u64,
    /// Fingerprint of `raw_line`, used as the replay bookmark
    pub fingerprint: u64,
}
