//! Activity tags
//!
//! Default tags are assigned by the tracker itself and cannot be toggled from chat.

use phf::{Set, phf_set};

pub const ZANA_MAP_TAG: &str = "zana-map";
pub const EXPEDITION_TAG: &str = "expedition";

pub static DEFAULT_TAGS: Set<&'static str> = phf_set! {
    "blight", "delirium", "einhar", "incursion", "syndicate", "zana", "niko",
    "zana-map", "expedition", "rog", "gwennen", "dannig", "tujen", "karst",
    "tibbs", "isla", "tullina", "niles", "nenet", "vinderi", "gianna", "huck",
};

const FORBIDDEN_TAG_CHARS: [char; 4] = ['=', ',', ';', ' '];

pub fn is_default_tag(id: &str) -> bool {
    DEFAULT_TAGS.contains(id)
}

/// Tag ids end up in `|`-joined columns and in the `name;value` cache format.
pub fn is_valid_tag_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(FORBIDDEN_TAG_CHARS) && !id.contains('|')
}

/// Tag definition as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDef {
    pub id: String,
    pub display_name: String,
    pub is_default: bool,
}

impl TagDef {
    pub fn custom(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            is_default: false,
        }
    }

    pub fn defaults() -> Vec<TagDef> {
        let mut tags: Vec<TagDef> = DEFAULT_TAGS
            .iter()
            .map(|id| TagDef {
                id: (*id).to_string(),
                display_name: (*id).to_string(),
                is_default: true,
            })
            .collect();
        tags.sort_by(|a, b| a.id.cmp(&b.id));
        tags
    }
}
