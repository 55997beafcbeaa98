use crate::storage::{StatsStore, StoreError};
use hashbrown::HashMap;

/// In-memory stat counters.
///
/// Every change goes to the store first; memory is updated only once the
/// write succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsAggregate {
    counters: HashMap<String, i64>,
}

impl StatsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counters(counters: HashMap<String, i64>) -> Self {
        Self { counters }
    }

    pub fn get(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> &HashMap<String, i64> {
        &self.counters
    }

    /// Add `delta` and return the new value. `event` is the fingerprint of
    /// the line being handled.
    pub fn increment<S: StatsStore + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
        timestamp: i64,
        event: u64,
        delta: i64,
    ) -> Result<i64, StoreError> {
        store.increment_stat(name, timestamp, event, delta)?;
        let value = self.counters.entry(name.to_string()).or_insert(0);
        *value += delta;
        Ok(*value)
    }

    /// Raise a high-water-mark counter. Returns the new value if it changed.
    pub fn raise_to<S: StatsStore + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
        timestamp: i64,
        event: u64,
        value: i64,
    ) -> Result<Option<i64>, StoreError> {
        let current = self.get(name);
        if value <= current {
            return Ok(None);
        }
        self.increment(store, name, timestamp, event, value - current).map(Some)
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }

    /// Counters sorted by name
    pub fn sorted(&self) -> Vec<(String, i64)> {
        let mut out: Vec<(String, i64)> = self
            .counters
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        out.sort();
        out
    }
}
