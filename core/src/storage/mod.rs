//! Durable storage for finished activities, stat increments and the player roster.
//!
//! The tracker only talks to the traits below. [`SqliteStore`] is the on-disk
//! implementation; [`MemoryStore`] backs tests.
//!
//! Files live under `~/.local/share/waystone/` (or the configured override):
//! `waystone.db` and the `stats.cache` checkpoint.

pub mod checkpoint;
mod error;
mod memory;
mod sqlite;

pub use checkpoint::StatCheckpoint;
pub use error::{CheckpointError, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::game_data::TagDef;
use hashbrown::HashMap;
use std::path::{Path, PathBuf};
use waystone_types::ActivityRecord;

pub const DATABASE_FILE: &str = "waystone.db";
pub const CHECKPOINT_FILE: &str = "stats.cache";

pub trait ActivityStore {
    /// Insert unless `(timestamp, area)` already exists. Returns whether a row was written.
    fn append_activity_record(&mut self, record: &ActivityRecord) -> Result<bool, StoreError>;

    fn update_activity_tags(
        &mut self,
        timestamp: i64,
        area: &str,
        tags: &[String],
    ) -> Result<(), StoreError>;

    /// Newest first
    fn load_all_activity_records(&self) -> Result<Vec<ActivityRecord>, StoreError>;

    fn clear_activity_records(&mut self) -> Result<(), StoreError>;
}

pub trait StatsStore {
    /// Append one auditable increment; counters are the sum of these rows.
    /// `event` is the fingerprint of the log line that caused it.
    fn increment_stat(
        &mut self,
        name: &str,
        timestamp: i64,
        event: u64,
        delta: i64,
    ) -> Result<(), StoreError>;

    fn load_stat_counters(&self) -> Result<HashMap<String, i64>, StoreError>;

    /// Fingerprint recorded with the newest increment, if any.
    fn last_stat_event(&self) -> Result<Option<u64>, StoreError>;

    fn clear_stats(&mut self) -> Result<(), StoreError>;
}

pub trait RosterStore {
    fn add_known_player(&mut self, name: &str) -> Result<(), StoreError>;

    fn load_known_players(&self) -> Result<Vec<String>, StoreError>;

    fn add_tag(&mut self, tag: &TagDef) -> Result<(), StoreError>;

    fn load_tags(&self) -> Result<Vec<TagDef>, StoreError>;
}

/// Everything the tracker writes through.
pub trait TrackerStore: ActivityStore + StatsStore + RosterStore + Send {}

impl<T: ActivityStore + StatsStore + RosterStore + Send> TrackerStore for T {}

/// Storage directory, created if missing.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf, StoreError> {
    let base = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waystone"),
    };

    std::fs::create_dir_all(&base).map_err(|source| StoreError::CreateDir {
        path: base.clone(),
        source,
    })?;
    Ok(base)
}

pub(crate) fn join_tags(tags: &[String]) -> String {
    tags.join("|")
}

pub(crate) fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split('|')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
