// Market Events - Real-time market event detection over per-symbol state snapshots
//
// core       types, config, logging, event records and sinks
// state      market snapshot and the last-seen snapshot cache
// detectors  detector plugins, crossing helpers, cooldown tracker
// engine     detection engine and its sharded wrapper

pub mod core;
pub mod state;
pub mod detectors;
pub mod engine;

pub use crate::core::{
    setup_logging, ConfigManager, DetectionThresholds, EngineConfig, EventBus, EventRecord, EventSink, EventType,
};
pub use crate::detectors::{CooldownTracker, DetectionContext, Detector};
pub use crate::engine::{DetectionEngine, EngineStats, ShardedEngine};
pub use crate::state::{MarketSnapshot, StateCache};
