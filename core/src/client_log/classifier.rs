use super::*;
use chrono::{Local, NaiveDateTime};


const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const AREA_MARKER: &str = "You have entered";
const ENDPOINT_MARKER: &str = "Connecting to instance server at ";
const LEVEL_MARKER: &str = "Generating level ";
const CHAT_COMMAND_MARKER: &str = "::";

/// Whitespace token holding the player name in death / join lines:
/// `date time ticks id [LEVEL Client pid] : Name has been slain.`
const PLAYER_NAME_TOKEN: usize = 8;

/// Ordered priority list. The first entry whose pattern occurs in a line wins,
/// so a more specific pattern must precede any pattern it contains.
static EVENT_PATTERNS: &[(&str, EventKind)] = &[
    // Player chat first: typed text must never be read as NPC dialogue.
    (": ::", EventKind::ChatCommand),
    ("***** LOG FILE OPENING *****", EventKind::ClientStarted),
    ("Abnormal disconnect: ", EventKind::AbnormalDisconnect),
    (" : You have entered ", EventKind::AreaEntered),
    (ENDPOINT_MARKER, EventKind::InstanceConnected),
    (LEVEL_MARKER, EventKind::NextAreaLevel),
    (" has been slain.", EventKind::PlayerDied),
    (" has joined the area.", EventKind::PartyMemberJoined),
    (" is now level ", EventKind::LevelUp),
    // Shaper / Elder
    ("The Shaper: I see you, exile.", EventKind::ShaperFightStarted),
    ("The Shaper: Irrelevant.", EventKind::ShaperKilled),
    ("Zana, Master Cartographer: Rest now, father.", EventKind::ElderKilled),
    // Sirus / Maven / Catarina
    ("Sirus, Awakener of Worlds: Die.", EventKind::SirusFightStarted),
    ("Sirus, Awakener of Worlds: At last, I am free", EventKind::SirusKilled),
    ("The Maven: I am the Maven.", EventKind::MavenFightStarted),
    ("The Maven: Rest, my children.", EventKind::MavenKilled),
    ("Catarina, Master of Undeath: You found me at last", EventKind::CatarinaFightStarted),
    ("Catarina, Master of Undeath: Jun... I", EventKind::CatarinaKilled),
    // Conquerors
    ("Veritania, the Redeemer: Your sins are many", EventKind::VeritaniaFightStarted),
    ("Veritania, the Redeemer: Unexpected...", EventKind::VeritaniaKilled),
    ("Baran, the Crusader: The Eater of Worlds shall fall", EventKind::BaranFightStarted),
    ("Baran, the Crusader: I have seen the end", EventKind::BaranKilled),
    ("Drox, the Warlord: Face me, coward", EventKind::DroxFightStarted),
    ("Drox, the Warlord: A war I am glad to lose", EventKind::DroxKilled),
    ("Al-Hezmin, the Hunter: Finally, worthy prey", EventKind::HunterFightStarted),
    ("Al-Hezmin, the Hunter: The hunt is over", EventKind::HunterKilled),
    // Ultimatum
    ("The Trialmaster: Victorious!", EventKind::TrialMasterVictory),
    ("The Trialmaster: You have chosen to take", EventKind::TrialMasterTookReward),
    ("The Trialmaster: I yield", EventKind::TrialMasterKilled),
    ("The Trialmaster: Round ", EventKind::TrialMasterRoundStarted),
    ("The Trialmaster: Let the trial begin", EventKind::TrialMasterStarted),
    // Einhar: capture before his generic speech
    (
        "Einhar, Beastmaster: Great job, exile! Einhar will take the captured beast",
        EventKind::EinharBeastCaptured,
    ),
    ("Einhar, Beastmaster: ", EventKind::Encounter(Encounter::Einhar)),
    // Simulacrum clear before generic Delirium voice
    (
        "Strange Voice: So be it. Keep your precious sanity",
        EventKind::SimulacrumFullClear,
    ),
    ("Strange Voice: ", EventKind::Encounter(Encounter::Delirium)),
    // Labyrinth
    ("Izaro: Triumphant at last!", EventKind::LabFinished),
    ("Izaro: You are free!", EventKind::LabFinished),
    ("Izaro: Ascend with precision.", EventKind::LabStartInfo),
    // Map encounters
    ("Sister Cassia: ", EventKind::Encounter(Encounter::Blight)),
    ("Alva, Master Explorer: ", EventKind::Encounter(Encounter::Incursion)),
    ("Niko, Master of the Depths: ", EventKind::Encounter(Encounter::Niko)),
    ("Zana, Master Cartographer: ", EventKind::Encounter(Encounter::Zana)),
    ("Jun, Veiled Master: ", EventKind::Encounter(Encounter::Syndicate)),
    // Expedition
    ("Dannig, Warrior Skald: ", EventKind::Expedition(ExpeditionNpc::Dannig)),
    ("Gwennen, the Gambler: ", EventKind::Expedition(ExpeditionNpc::Gwennen)),
    ("Tujen, the Haggler: ", EventKind::Expedition(ExpeditionNpc::Tujen)),
    ("Rog, the Dealer: ", EventKind::Expedition(ExpeditionNpc::Rog)),
    // Heist crew
    ("Karst, the Lockpick: ", EventKind::HeistSpeech(HeistNpc::Karst)),
    ("Tibbs, the Giant: ", EventKind::HeistSpeech(HeistNpc::Tibbs)),
    ("Isla, the Engineer: ", EventKind::HeistSpeech(HeistNpc::Isla)),
    ("Tullina, the Catburglar: ", EventKind::HeistSpeech(HeistNpc::Tullina)),
    ("Niles, the Interrogator: ", EventKind::HeistSpeech(HeistNpc::Niles)),
    ("Nenet, the Scout: ", EventKind::HeistSpeech(HeistNpc::Nenet)),
    ("Vinderi, the Dismantler: ", EventKind::HeistSpeech(HeistNpc::Vinderi)),
    ("Gianna, the Master of Disguise: ", EventKind::HeistSpeech(HeistNpc::Gianna)),
    ("Huck, the Soldier: ", EventKind::HeistSpeech(HeistNpc::Huck)),
];

/// Stateless line classifier. Safe to share across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventClassifier;

impl EventClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Event kind for a line, by first match in the priority list.
    pub fn classify_kind(&self, line: &str) -> Option<EventKind> {
        EVENT_PATTERNS
            .iter()
            .find(|(pattern, _)| line.contains(pattern))
            .map(|&(_, kind)| kind)
    }

    pub fn classify(&self, line_number: u64, fingerprint: u64, line: &str) -> Option<TrackingEvent> {
        let kind = self.classify_kind(line)?;
        let timestamp = parse_timestamp(line_number, line).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "falling back to wall clock");
            Local::now().naive_local()
        });

        Some(TrackingEvent {
            kind,
            timestamp,
            raw_line: line.to_string(),
            line_number,
            fingerprint,
        })
    }
}

/// Parse the leading `YYYY/MM/DD HH:MM:SS` pair
pub fn parse_timestamp(line_number: u64, line: &str) -> Result<NaiveDateTime, ParseError> {
    let mut tokens = line.split_whitespace();
    let segment = match (tokens.next(), tokens.next()) {
        (Some(date), Some(time)) => format!("{date} {time}"),
        _ => {
            return Err(ParseError::InvalidTimestamp {
                line_number,
                segment: line.chars().take(19).collect(),
            });
        }
    };

    NaiveDateTime::parse_from_str(&segment, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::InvalidTimestamp { line_number, segment })
}

// ─────────────────────────────────────────────────────────────────────────────
// Positional fields
// ─────────────────────────────────────────────────────────────────────────────

fn text_after<'a>(line: &'a str, marker: &str, field: &'static str) -> Result<&'a str, ParseError> {
    line.split_once(marker)
        .map(|(_, rest)| rest)
        .ok_or_else(|| ParseError::MissingField {
            field,
            line: line.to_string(),
        })
}

/// Name of the player in a death or party-join line
pub fn player_name(line: &str) -> Result<&str, ParseError> {
    line.split(' ')
        .nth(PLAYER_NAME_TOKEN)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::MissingField {
            field: "player_name",
            line: line.to_string(),
        })
}

/// Area name from an area-entered line, with periods and apostrophes removed.
pub fn area_name(line: &str) -> Result<String, ParseError> {
    let rest = text_after(line, AREA_MARKER, "area_name")?;
    Ok(rest.replace('.', "").trim().replace('\'', ""))
}

pub fn instance_endpoint(line: &str) -> Result<String, ParseError> {
    let rest = text_after(line, ENDPOINT_MARKER, "instance_endpoint")?;
    Ok(rest.trim().to_string())
}

pub fn next_area_level(line: &str) -> Result<u32, ParseError> {
    let rest = text_after(line, LEVEL_MARKER, "area_level")?;
    let value = rest.split(' ').next().unwrap_or_default();
    value.parse().map_err(|_| ParseError::InvalidNumber {
        field: "area_level",
        value: value.to_string(),
    })
}

/// Command text typed after `::` in chat
pub fn chat_command(line: &str) -> Result<&str, ParseError> {
    text_after(line, CHAT_COMMAND_MARKER, "chat_command").map(str::trim)
}

/// Character level from a level-up line (last token)
pub fn level_up_level(line: &str) -> Result<i64, ParseError> {
    let value = line.split_whitespace().last().unwrap_or_default();
    value.parse().map_err(|_| ParseError::InvalidNumber {
        field: "level",
        value: value.to_string(),
    })
}
