// Sharded Engine - N independent detection engines routed by hash(symbol) % N
// A symbol always lands on the same shard, so per-symbol ordering holds per shard lock

use super::detection::{DetectionEngine, EngineStats};
use crate::core::config::{DetectionThresholds, EngineConfig};
use crate::core::events::{EventRecord, EventSink};
use crate::state::MarketSnapshot;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::info;

pub struct ShardedEngine {
    shards: Vec<Mutex<DetectionEngine>>,
}

impl ShardedEngine {
    /// `config.shards` engines, each with the full detector catalog
    pub fn new(config: EngineConfig, thresholds: &DetectionThresholds) -> Self {
        let count = config.shards.max(1);
        let shards = (0..count)
            .map(|_| Mutex::new(DetectionEngine::with_default_detectors(config.clone(), thresholds)))
            .collect();

        info!(shards = count, "Sharded engine initialized");
        Self { shards }
    }

    /// Wrap engines built elsewhere (custom detector sets); at least one is required
    pub fn from_engines(engines: Vec<DetectionEngine>) -> Option<Self> {
        if engines.is_empty() {
            return None;
        }
        Some(Self {
            shards: engines.into_iter().map(Mutex::new).collect(),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_for(&self, symbol: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    pub fn process(&self, symbol: &str, snapshot: MarketSnapshot) -> Vec<EventRecord> {
        self.shards[self.shard_for(symbol)].lock().process(symbol, snapshot)
    }

    pub fn process_and_publish(&self, symbol: &str, snapshot: MarketSnapshot, sink: &dyn EventSink) -> usize {
        // Publish outside the shard lock
        let events = self.process(symbol, snapshot);
        let count = events.len();
        for event in events {
            sink.publish(event);
        }
        count
    }

    pub fn cleanup(&self, active_symbols: &HashSet<String>) -> usize {
        self.shards.iter().map(|shard| shard.lock().cleanup(active_symbols)).sum()
    }

    pub fn reset_daily(&self) {
        for shard in &self.shards {
            shard.lock().reset_daily();
        }
    }

    /// Counters summed across shards
    pub fn stats(&self) -> EngineStats {
        let mut total = EngineStats::default();
        for shard in &self.shards {
            total.merge(&shard.lock().stats());
        }
        total
    }
}
