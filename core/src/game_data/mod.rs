//! Fixed game tables: areas, stats and tags.

pub mod areas;
pub mod stats;
pub mod tags;

pub use areas::{classify_area, is_camp_or_hideout, labyrinth_name};
pub use tags::{TagDef, is_default_tag, is_valid_tag_id};
