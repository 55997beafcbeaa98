use super::{ActivityStore, RosterStore, StatsStore, StoreError};
use crate::game_data::TagDef;
use hashbrown::HashMap;
use waystone_types::ActivityRecord;

/// Volatile store with the same semantics as the SQLite one.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Vec<ActivityRecord>,
    stat_rows: Vec<(i64, String, i64, u64)>,
    players: Vec<String>,
    tags: Vec<TagDef>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            stat_rows: Vec::new(),
            players: Vec::new(),
            tags: TagDef::defaults(),
        }
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    /// Raw `(timestamp, name, delta, event)` rows in insertion order
    pub fn stat_rows(&self) -> &[(i64, String, i64, u64)] {
        &self.stat_rows
    }

    pub fn counter(&self, name: &str) -> i64 {
        self.stat_rows
            .iter()
            .filter(|(_, n, _, _)| n == name)
            .map(|(_, _, delta, _)| delta)
            .sum()
    }
}

impl ActivityStore for MemoryStore {
    fn append_activity_record(&mut self, record: &ActivityRecord) -> Result<bool, StoreError> {
        if self.records.iter().any(|r| r.key() == record.key()) {
            return Ok(false);
        }
        self.records.push(record.clone());
        Ok(true)
    }

    fn update_activity_tags(
        &mut self,
        timestamp: i64,
        area: &str,
        tags: &[String],
    ) -> Result<(), StoreError> {
        if let Some(record) = self.records.iter_mut().find(|r| r.key() == (timestamp, area)) {
            record.tags = tags.to_vec();
        }
        Ok(())
    }

    fn load_all_activity_records(&self) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut records = self.records.clone();
        records.reverse();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    fn clear_activity_records(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }
}

impl StatsStore for MemoryStore {
    fn increment_stat(
        &mut self,
        name: &str,
        timestamp: i64,
        event: u64,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.stat_rows.push((timestamp, name.to_string(), delta, event));
        Ok(())
    }

    fn load_stat_counters(&self) -> Result<HashMap<String, i64>, StoreError> {
        let mut counters = HashMap::new();
        for (_, name, delta, _) in &self.stat_rows {
            *counters.entry(name.clone()).or_insert(0) += delta;
        }
        Ok(counters)
    }

    fn last_stat_event(&self) -> Result<Option<u64>, StoreError> {
        Ok(self
            .stat_rows
            .last()
            .map(|(_, _, _, event)| *event)
            .filter(|event| *event != 0))
    }

    fn clear_stats(&mut self) -> Result<(), StoreError> {
        self.stat_rows.clear();
        Ok(())
    }
}

impl RosterStore for MemoryStore {
    fn add_known_player(&mut self, name: &str) -> Result<(), StoreError> {
        if !self.players.iter().any(|p| p == name) {
            self.players.push(name.to_string());
        }
        Ok(())
    }

    fn load_known_players(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.players.clone())
    }

    fn add_tag(&mut self, tag: &TagDef) -> Result<(), StoreError> {
        if !self.tags.iter().any(|t| t.id == tag.id) {
            self.tags.push(tag.clone());
        }
        Ok(())
    }

    fn load_tags(&self) -> Result<Vec<TagDef>, StoreError> {
        Ok(self.tags.clone())
    }
}
