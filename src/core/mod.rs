// Core Module - Foundational types, config, logging, event records

pub mod types;
pub mod error;
pub mod event_types;
pub mod config;
pub mod logger;
pub mod events;
pub mod market_clock;

// Re-export commonly used items for convenience
pub use types::*;
pub use error::{DetectorError, SnapshotError};
pub use event_types::{EventCategory, EventType};
pub use config::{ConfigError, ConfigManager, DetectionThresholds, EngineConfig};
pub use logger::setup_logging;
pub use events::{EventBus, EventBusStatsSnapshot, EventContext, EventRecord, EventSink};
