// Engine Module - Detector orchestration over the state cache and cooldown tracker

pub mod detection;
pub mod sharded;

pub use detection::{DetectionEngine, DetectorStats, EngineStats};
pub use sharded::ShardedEngine;
