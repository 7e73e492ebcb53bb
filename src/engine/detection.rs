// Detection Engine - Runs every registered detector over each (current, previous) pair
//
// Owns the state cache and cooldown tracker. One engine must only ever see a
// given symbol from one thread at a time; see ShardedEngine for parallelism.

use crate::core::config::{DetectionThresholds, EngineConfig};
use crate::core::error::{DetectorError, SnapshotError};
use crate::core::events::{EventRecord, EventSink};
use crate::core::types::CooldownClock;
use crate::detectors::{default_detectors, CooldownTracker, DetectionContext, Detector};
use crate::state::{MarketSnapshot, StateCache};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-detector counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    pub events: u64,
    pub failures: u64,
}

/// Engine statistics snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub ticks_processed: u64,
    pub ticks_rejected: u64,
    pub events_emitted: u64,
    pub detector_failures: u64,
    pub detectors: BTreeMap<&'static str, DetectorStats>,
    pub cached_symbols: usize,
}

impl EngineStats {
    /// Fold another engine's counters into this one
    pub fn merge(&mut self, other: &EngineStats) {
        self.ticks_processed += other.ticks_processed;
        self.ticks_rejected += other.ticks_rejected;
        self.events_emitted += other.events_emitted;
        self.detector_failures += other.detector_failures;
        self.cached_symbols += other.cached_symbols;
        for (name, stats) in &other.detectors {
            let entry = self.detectors.entry(*name).or_default();
            entry.events += stats.events;
            entry.failures += stats.failures;
        }
    }
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Engine(ticks={}, rejected={}, events={}, failures={}, symbols={})",
            self.ticks_processed, self.ticks_rejected, self.events_emitted,
            self.detector_failures, self.cached_symbols
        )
    }
}

pub struct DetectionEngine {
    config: EngineConfig,
    detectors: Vec<Box<dyn Detector>>,
    cache: StateCache,
    cooldowns: CooldownTracker,
    stats: EngineStats,
}

impl DetectionEngine {
    /// Empty engine with a fresh cache and cooldown tracker
    pub fn new(config: EngineConfig) -> Self {
        let cache = StateCache::new(config.state_max_age_secs);
        Self::with_parts(config, cache, CooldownTracker::new())
    }

    /// Empty engine over an existing cache and cooldown tracker
    pub fn with_parts(config: EngineConfig, cache: StateCache, cooldowns: CooldownTracker) -> Self {
        Self {
            config,
            detectors: Vec::new(),
            cache,
            cooldowns,
            stats: EngineStats::default(),
        }
    }

    /// Engine with the full detector catalog registered in its fixed order
    pub fn with_default_detectors(config: EngineConfig, thresholds: &DetectionThresholds) -> Self {
        let mut engine = Self::new(config);
        for detector in default_detectors(thresholds) {
            engine.register(detector);
        }
        engine
    }

    /// Append a detector; detectors run in registration order
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        debug!(detector = detector.name(), "Registered detector");
        self.detectors.push(detector);
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Run all detectors for one tick of `symbol`, then cache the tick as the next "previous"
    pub fn process(&mut self, symbol: &str, snapshot: MarketSnapshot) -> Vec<EventRecord> {
        let previous = match self.admit(symbol, &snapshot) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Rejected snapshot");
                self.stats.ticks_rejected += 1;
                return Vec::new();
            }
        };

        let now = self.cooldown_now(&snapshot);
        let mut events = Vec::new();

        for detector in self.detectors.iter_mut() {
            let name = detector.name();
            let mut ctx = DetectionContext {
                cooldowns: &mut self.cooldowns,
                config: &self.config,
                now,
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                detector.detect(&snapshot, previous.as_deref(), &mut ctx)
            }));
            let detector_stats = self.stats.detectors.entry(name).or_default();

            match outcome {
                Ok(Ok(fired)) => {
                    for event in &fired {
                        debug!(symbol = %symbol, detector = name, event = %event.event_type, "Event fired");
                    }
                    detector_stats.events += fired.len() as u64;
                    events.extend(fired);
                }
                Ok(Err(e)) => {
                    warn!(symbol = %symbol, detector = name, error = %e, "Detector failed");
                    detector_stats.failures += 1;
                    self.stats.detector_failures += 1;
                }
                Err(payload) => {
                    let e = DetectorError::Internal(panic_message(payload.as_ref()));
                    warn!(symbol = %symbol, detector = name, error = %e, "Detector panicked");
                    detector_stats.failures += 1;
                    self.stats.detector_failures += 1;
                }
            }
        }

        self.cache.put(symbol, Arc::new(snapshot));
        self.stats.ticks_processed += 1;
        self.stats.events_emitted += events.len() as u64;
        events
    }

    /// `process`, then hand every event to `sink`; returns the number published
    pub fn process_and_publish(&mut self, symbol: &str, snapshot: MarketSnapshot, sink: &dyn EventSink) -> usize {
        let events = self.process(symbol, snapshot);
        let count = events.len();
        for event in events {
            sink.publish(event);
        }
        count
    }

    /// Drop all per-symbol state for symbols not in `active_symbols`
    pub fn cleanup(&mut self, active_symbols: &HashSet<String>) -> usize {
        let from_detectors: usize = self.detectors.iter_mut().map(|d| d.cleanup(active_symbols)).sum();
        let from_cooldowns = self.cooldowns.cleanup(active_symbols);
        let from_cache = self.cache.retain_symbols(|symbol| active_symbols.contains(symbol));

        let removed = from_detectors + from_cooldowns + from_cache;
        info!(
            detectors = from_detectors,
            cooldowns = from_cooldowns,
            cache = from_cache,
            "Cleanup removed {} entries",
            removed
        );
        removed
    }

    /// Trading-day rollover: clear detector state, cooldowns, and cached snapshots
    pub fn reset_daily(&mut self) {
        for detector in self.detectors.iter_mut() {
            detector.reset_daily();
        }
        self.cooldowns.reset();
        self.cache.clear();
        info!(detectors = self.detectors.len(), "Daily reset complete");
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cached_symbols: self.cache.len(),
            ..self.stats.clone()
        }
    }

    /// Validate `snapshot` and fetch the previous tick for it
    fn admit(&mut self, symbol: &str, snapshot: &MarketSnapshot) -> Result<Option<Arc<MarketSnapshot>>, SnapshotError> {
        snapshot.validate()?;
        if snapshot.symbol != symbol {
            return Err(SnapshotError::SymbolMismatch {
                expected: symbol.to_string(),
                actual: snapshot.symbol.clone(),
            });
        }

        let previous = self.cache.get_at(symbol, snapshot.timestamp);
        if let Some(previous) = &previous {
            if snapshot.timestamp < previous.timestamp {
                return Err(SnapshotError::OutOfOrder {
                    symbol: symbol.to_string(),
                    previous: previous.timestamp,
                    current: snapshot.timestamp,
                });
            }
        }
        Ok(previous)
    }

    fn cooldown_now(&self, snapshot: &MarketSnapshot) -> DateTime<Utc> {
        match self.config.cooldown_clock {
            CooldownClock::Wall => Utc::now(),
            CooldownClock::EventTime => snapshot.timestamp,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_types::EventType;
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn replay_config() -> EngineConfig {
        EngineConfig {
            cooldown_clock: CooldownClock::EventTime,
            ..EngineConfig::default()
        }
    }

    fn snap(symbol: &str, secs: i64, price: f64) -> MarketSnapshot {
        MarketSnapshot {
            open_price: Some(10.0),
            ..MarketSnapshot::new(symbol, t(secs), price, 500_000.0)
        }
    }

    struct Panicking;

    impl Detector for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn detect(
            &mut self,
            _current: &MarketSnapshot,
            _previous: Option<&MarketSnapshot>,
            _ctx: &mut DetectionContext<'_>,
        ) -> Result<Vec<EventRecord>, DetectorError> {
            panic!("boom");
        }
    }

    struct Failing;

    impl Detector for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect(
            &mut self,
            current: &MarketSnapshot,
            _previous: Option<&MarketSnapshot>,
            _ctx: &mut DetectionContext<'_>,
        ) -> Result<Vec<EventRecord>, DetectorError> {
            Err(DetectorError::InvalidInput { symbol: current.symbol.clone(), field: "price", value: current.price })
        }
    }

    #[test]
    fn test_default_detector_order() {
        let engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());
        assert_eq!(
            engine.detector_names(),
            vec![
                "price", "volume", "momentum", "pullback", "gap", "moving_average", "bollinger",
                "daily_levels", "macd", "stochastic", "orb", "consolidation", "confirmed_cross", "session",
            ]
        );
    }

    #[test]
    fn test_first_tick_only_seeds() {
        let mut engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());
        assert!(engine.process("AAPL", snap("AAPL", 0, 9.9)).is_empty());

        let events = engine.process("AAPL", snap("AAPL", 1, 10.1));
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert!(types.contains(&EventType::CrossedAboveOpen));
        assert!(types.contains(&EventType::NewHigh));
    }

    #[test]
    fn test_failing_detectors_are_isolated() {
        let mut engine = DetectionEngine::new(replay_config());
        engine.register(Box::new(Panicking));
        engine.register(Box::new(Failing));
        for detector in default_detectors(&DetectionThresholds::default()) {
            engine.register(detector);
        }

        engine.process("AAPL", snap("AAPL", 0, 9.9));
        let events = engine.process("AAPL", snap("AAPL", 1, 10.1));
        assert!(events.iter().any(|e| e.event_type == EventType::CrossedAboveOpen));

        let stats = engine.stats();
        assert_eq!(stats.ticks_processed, 2);
        assert_eq!(stats.detector_failures, 4);
        assert_eq!(stats.detectors["panicking"].failures, 2);
        assert_eq!(stats.detectors["failing"].failures, 2);
    }

    #[test]
    fn test_invalid_snapshots_rejected() {
        let mut engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());

        assert!(engine.process("AAPL", snap("AAPL", 0, f64::NAN)).is_empty());
        assert!(engine.process("AAPL", snap("MSFT", 0, 10.0)).is_empty());
        engine.process("AAPL", snap("AAPL", 10, 10.0));
        assert!(engine.process("AAPL", snap("AAPL", 5, 11.0)).is_empty());

        let stats = engine.stats();
        assert_eq!(stats.ticks_rejected, 3);
        assert_eq!(stats.ticks_processed, 1);
        assert_eq!(stats.cached_symbols, 1);
    }

    #[test]
    fn test_stale_previous_treated_as_absent() {
        let mut engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());
        engine.process("AAPL", snap("AAPL", 0, 9.9));

        // Beyond the 300s max age the open cross is not seen
        let events = engine.process("AAPL", snap("AAPL", 301, 10.1));
        assert!(events.is_empty());
    }

    #[test]
    fn test_cleanup_then_first_observation() {
        let mut engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());
        engine.process("AAPL", snap("AAPL", 0, 9.9));
        engine.process("AAPL", snap("AAPL", 1, 10.1));
        engine.process("MSFT", snap("MSFT", 0, 9.9));

        let active: HashSet<String> = ["MSFT".to_string()].into_iter().collect();
        assert!(engine.cleanup(&active) > 0);
        assert_eq!(engine.stats().cached_symbols, 1);
        assert_eq!(engine.cooldowns().tracked_symbols(), 0);

        // AAPL starts over: no previous, nothing fires
        assert!(engine.process("AAPL", snap("AAPL", 2, 9.8)).is_empty());
    }

    #[test]
    fn test_reset_daily_clears_everything() {
        let mut engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());
        engine.process("AAPL", snap("AAPL", 0, 9.9));
        engine.process("AAPL", snap("AAPL", 1, 10.1));

        engine.reset_daily();
        assert_eq!(engine.stats().cached_symbols, 0);
        assert_eq!(engine.cooldowns().tracked_symbols(), 0);
        assert!(engine.process("AAPL", snap("AAPL", 2, 9.8)).is_empty());
    }

    #[test]
    fn test_process_and_publish() {
        let mut engine = DetectionEngine::with_default_detectors(replay_config(), &DetectionThresholds::default());
        let received = Mutex::new(Vec::new());
        let sink = |event: EventRecord| received.lock().push(event.event_type);

        engine.process_and_publish("AAPL", snap("AAPL", 0, 9.9), &sink);
        let published = engine.process_and_publish("AAPL", snap("AAPL", 1, 10.1), &sink);

        assert!(published > 0);
        assert_eq!(received.lock().len(), published);
    }
}
