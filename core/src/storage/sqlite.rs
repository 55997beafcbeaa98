use super::{
    ActivityStore, RosterStore, StatsStore, StoreError, join_tags, split_tags,
};
use crate::game_data::TagDef;
use hashbrown::HashMap;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use waystone_types::{ActivityRecord, ActivityType};

/// SQLite-backed store.
///
/// `rusqlite::Connection` is `Send` but not `Sync`; a store has exactly one
/// owner, the tracking session.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (and if necessary creates) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Idempotent schema setup; also seeds the default tags.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tx_activity_log (
                timestamp INTEGER NOT NULL,
                act_type TEXT NOT NULL,
                act_area TEXT NOT NULL,
                act_level INTEGER NOT NULL DEFAULT 0,
                act_stopwatch INTEGER NOT NULL DEFAULT 0,
                act_deathcounter INTEGER NOT NULL DEFAULT 0,
                act_ulti_rounds INTEGER NOT NULL DEFAULT 0,
                act_is_zana INTEGER NOT NULL DEFAULT 0,
                act_tags TEXT NOT NULL DEFAULT '',
                act_success INTEGER NOT NULL DEFAULT 0,
                UNIQUE (timestamp, act_area)
            );

            CREATE INDEX IF NOT EXISTS idx_activity_timestamp ON tx_activity_log(timestamp);

            -- stat_value is the delta of one increment, never a running total
            CREATE TABLE IF NOT EXISTS tx_stats (
                timestamp INTEGER NOT NULL,
                stat_name TEXT NOT NULL,
                stat_value INTEGER NOT NULL,
                event_fp INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_stats_name ON tx_stats(stat_name);

            CREATE TABLE IF NOT EXISTS tx_known_players (
                player_name TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS tx_tags (
                tag_id TEXT PRIMARY KEY,
                tag_display TEXT NOT NULL,
                is_default INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;
        self.migrate()?;

        for tag in TagDef::defaults() {
            self.conn.execute(
                "INSERT OR IGNORE INTO tx_tags (tag_id, tag_display, is_default) VALUES (?1, ?2, 1)",
                params![tag.id, tag.display_name],
            )?;
        }
        Ok(())
    }

    /// Databases written before increments carried their event fingerprint.
    fn migrate(&self) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(tx_stats)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        if !columns.iter().any(|c| c == "event_fp") {
            tracing::info!("Adding event_fp column to tx_stats");
            self.conn.execute(
                "ALTER TABLE tx_stats ADD COLUMN event_fp INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }
        Ok(())
    }
}

impl ActivityStore for SqliteStore {
    fn append_activity_record(&mut self, record: &ActivityRecord) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "
            INSERT OR IGNORE INTO tx_activity_log
                (timestamp, act_type, act_area, act_level, act_stopwatch, act_deathcounter,
                 act_ulti_rounds, act_is_zana, act_tags, act_success)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                record.timestamp,
                record.kind.as_str(),
                record.area,
                record.area_level,
                record.duration_secs,
                record.death_counter,
                record.round_count,
                record.is_zana,
                join_tags(&record.tags),
                record.success,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn update_activity_tags(
        &mut self,
        timestamp: i64,
        area: &str,
        tags: &[String],
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE tx_activity_log SET act_tags = ?1 WHERE timestamp = ?2 AND act_area = ?3",
            params![join_tags(tags), timestamp, area],
        )?;
        Ok(())
    }

    fn load_all_activity_records(&self) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT timestamp, act_type, act_area, act_level, act_stopwatch, act_deathcounter,
                   act_ulti_rounds, act_is_zana, act_tags, act_success
            FROM tx_activity_log
            ORDER BY timestamp DESC, rowid DESC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(1)?;
            let tags: String = row.get(8)?;
            Ok(ActivityRecord {
                timestamp: row.get(0)?,
                kind: ActivityType::from_storage(&kind),
                area: row.get(2)?,
                area_level: row.get(3)?,
                duration_secs: row.get(4)?,
                death_counter: row.get(5)?,
                round_count: row.get(6)?,
                is_zana: row.get(7)?,
                tags: split_tags(&tags),
                success: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn clear_activity_records(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM tx_activity_log", [])?;
        Ok(())
    }
}

impl StatsStore for SqliteStore {
    fn increment_stat(
        &mut self,
        name: &str,
        timestamp: i64,
        event: u64,
        delta: i64,
    ) -> Result<(), StoreError> {
        // SQLite integers are signed; the fingerprint is stored bit-for-bit
        self.conn.execute(
            "INSERT INTO tx_stats (timestamp, stat_name, stat_value, event_fp) VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, name, delta, event as i64],
        )?;
        Ok(())
    }

    fn load_stat_counters(&self) -> Result<HashMap<String, i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT stat_name, SUM(stat_value) FROM tx_stats GROUP BY stat_name")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        let mut counters = HashMap::new();
        for row in rows {
            let (name, value) = row?;
            counters.insert(name, value);
        }
        Ok(counters)
    }

    fn last_stat_event(&self) -> Result<Option<u64>, StoreError> {
        let event = self
            .conn
            .query_row(
                "SELECT event_fp FROM tx_stats ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(event.filter(|e| *e != 0).map(|e| e as u64))
    }

    fn clear_stats(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM tx_stats", [])?;
        Ok(())
    }
}

impl RosterStore for SqliteStore {
    fn add_known_player(&mut self, name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tx_known_players (player_name) VALUES (?1)",
            params![name],
        )?;
        Ok(())
    }

    fn load_known_players(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_name FROM tx_known_players ORDER BY player_name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn add_tag(&mut self, tag: &TagDef) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tx_tags (tag_id, tag_display, is_default) VALUES (?1, ?2, ?3)",
            params![tag.id, tag.display_name, tag.is_default],
        )?;
        Ok(())
    }

    fn load_tags(&self) -> Result<Vec<TagDef>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id, tag_display, is_default FROM tx_tags ORDER BY tag_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(TagDef {
                id: row.get(0)?,
                display_name: row.get(1)?,
                is_default: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(timestamp: i64, area: &str) -> ActivityRecord {
        ActivityRecord {
            timestamp,
            kind: ActivityType::Map,
            area: area.to_string(),
            area_level: 81,
            duration_secs: 312,
            death_counter: 1,
            round_count: 0,
            is_zana: false,
            tags: vec!["blight".to_string(), "juggernaut".to_string()],
            success: false,
        }
    }

    #[test]
    fn append_is_idempotent_on_key() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.append_activity_record(&record(100, "Arcade")).unwrap());
        assert!(!store.append_activity_record(&record(100, "Arcade")).unwrap());
        assert!(store.append_activity_record(&record(100, "Maze")).unwrap());
        assert_eq!(store.load_all_activity_records().unwrap().len(), 2);
    }

    #[test]
    fn records_load_newest_first_with_tags() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.append_activity_record(&record(100, "Arcade")).unwrap();
        store.append_activity_record(&record(300, "Strand")).unwrap();

        let records = store.load_all_activity_records().unwrap();
        assert_eq!(records[0].area, "Strand");
        assert_eq!(records[1], record(100, "Arcade"));
    }

    #[test]
    fn tag_update_rewrites_column() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.append_activity_record(&record(100, "Arcade")).unwrap();
        store
            .update_activity_tags(100, "Arcade", &["zana".to_string()])
            .unwrap();
        let records = store.load_all_activity_records().unwrap();
        assert_eq!(records[0].tags, vec!["zana".to_string()]);
    }

    #[test]
    fn stat_counters_sum_increments() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.increment_stat("AreaChanges", 1, 11, 1).unwrap();
        store.increment_stat("AreaChanges", 2, 12, 1).unwrap();
        store.increment_stat("HighestLevel", 3, 13, 90).unwrap();

        let counters = store.load_stat_counters().unwrap();
        assert_eq!(counters.get("AreaChanges"), Some(&2));
        assert_eq!(counters.get("HighestLevel"), Some(&90));

        store.clear_stats().unwrap();
        assert!(store.load_stat_counters().unwrap().is_empty());
    }

    #[test]
    fn last_stat_event_keeps_full_fingerprint() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.last_stat_event().unwrap(), None);

        store.increment_stat("AreaChanges", 1, 5, 1).unwrap();
        store.increment_stat("AreaChanges", 2, u64::MAX - 3, 1).unwrap();
        assert_eq!(store.last_stat_event().unwrap(), Some(u64::MAX - 3));
    }

    #[test]
    fn old_stats_table_gains_event_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waystone.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE tx_stats (timestamp INTEGER NOT NULL, stat_name TEXT NOT NULL, stat_value INTEGER NOT NULL);
                 INSERT INTO tx_stats VALUES (1, 'AreaChanges', 3);",
            )
            .unwrap();
        }

        let mut store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.last_stat_event().unwrap(), None);
        store.increment_stat("AreaChanges", 2, 99, 1).unwrap();
        assert_eq!(store.load_stat_counters().unwrap().get("AreaChanges"), Some(&4));
        assert_eq!(store.last_stat_event().unwrap(), Some(99));
    }

    #[test]
    fn roster_and_tags() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.add_known_player("Zeraphine").unwrap();
        store.add_known_player("Zeraphine").unwrap();
        assert_eq!(store.load_known_players().unwrap(), vec!["Zeraphine".to_string()]);

        let defaults = store.load_tags().unwrap().len();
        store.add_tag(&TagDef::custom("juggernaut")).unwrap();
        let tags = store.load_tags().unwrap();
        assert_eq!(tags.len(), defaults + 1);
        assert!(tags.iter().any(|t| t.id == "juggernaut" && !t.is_default));
        assert!(tags.iter().any(|t| t.id == "blight" && t.is_default));
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waystone.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.append_activity_record(&record(100, "Arcade")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_all_activity_records().unwrap().len(), 1);
    }
}
