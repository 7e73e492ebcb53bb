// State Cache - Last-seen snapshot per symbol with age-based eviction
// Supplies the "previous" snapshot to detectors

use super::snapshot::MarketSnapshot;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MAX_AGE_SECS: i64 = 300;

/// Symbol -> most recent snapshot. Entries older than `max_age` are treated as absent.
pub struct StateCache {
    entries: HashMap<String, Arc<MarketSnapshot>>,
    max_age: Duration,
}

impl StateCache {
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            entries: HashMap::new(),
            max_age: Duration::seconds(max_age_secs),
        }
    }

    /// Previous snapshot for `symbol`, judged against the wall clock
    pub fn get(&mut self, symbol: &str) -> Option<Arc<MarketSnapshot>> {
        self.get_at(symbol, Utc::now())
    }

    /// Previous snapshot for `symbol`, judged against `now`.
    /// A stale entry is evicted and reported as absent.
    pub fn get_at(&mut self, symbol: &str, now: DateTime<Utc>) -> Option<Arc<MarketSnapshot>> {
        let stale = match self.entries.get(symbol) {
            Some(snapshot) => now - snapshot.timestamp > self.max_age,
            None => return None,
        };

        if stale {
            self.entries.remove(symbol);
            debug!(symbol = %symbol, "Evicted stale snapshot");
            return None;
        }

        self.entries.get(symbol).cloned()
    }

    pub fn put(&mut self, symbol: &str, snapshot: Arc<MarketSnapshot>) {
        self.entries.insert(symbol.to_string(), snapshot);
    }

    /// Age-based sweep against the wall clock
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Utc::now())
    }

    /// Age-based sweep against `now`; returns the number of evicted symbols
    pub fn cleanup_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let max_age = self.max_age;
        self.entries.retain(|_, snapshot| now - snapshot.timestamp <= max_age);
        before - self.entries.len()
    }

    /// Drop every symbol not in `keep`; returns the number removed
    pub fn retain_symbols<F: Fn(&str) -> bool>(&mut self, keep: F) -> usize {
        let before = self.entries.len();
        self.entries.retain(|symbol, _| keep(symbol));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE_SECS)
    }
}
