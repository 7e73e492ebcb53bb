// Detectors - Plugin contract and the detector catalog
// Each detector turns a (current, previous) snapshot pair into zero or more events

pub mod cooldown;
pub mod crossing;

pub mod price;
pub mod volume;
pub mod momentum;
pub mod pullback;
pub mod gap;
pub mod moving_average;
pub mod bollinger;
pub mod daily_levels;
pub mod macd;
pub mod stochastic;
pub mod orb;
pub mod consolidation;
pub mod confirmed_cross;
pub mod session;

use crate::core::config::{DetectionThresholds, EngineConfig};
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub use cooldown::CooldownTracker;

pub use price::PriceDetector;
pub use volume::VolumeDetector;
pub use momentum::MomentumDetector;
pub use pullback::PullbackDetector;
pub use gap::GapDetector;
pub use moving_average::MovingAverageDetector;
pub use bollinger::BollingerDetector;
pub use daily_levels::DailyLevelsDetector;
pub use macd::MacdDetector;
pub use stochastic::StochasticDetector;
pub use orb::OrbDetector;
pub use consolidation::ConsolidationDetector;
pub use confirmed_cross::ConfirmedCrossDetector;
pub use session::SessionDetector;

/// Per-call view of the shared engine resources a detector may touch
pub struct DetectionContext<'a> {
    pub cooldowns: &'a mut CooldownTracker,
    pub config: &'a EngineConfig,
    /// Time used for cooldown checks (wall clock or snapshot time, per config)
    pub now: DateTime<Utc>,
}

impl DetectionContext<'_> {
    /// Cooldown check for `event_type` on `symbol`; records the firing when allowed
    pub fn try_fire(&mut self, event_type: EventType, symbol: &str) -> bool {
        let cooldown = self.config.cooldown_secs(event_type);
        self.cooldowns.try_fire(event_type, symbol, cooldown, self.now)
    }
}

/// Detection plugin.
///
/// `detect` must not block. Absent optional inputs mean "no event this tick",
/// never an error. Per-symbol state is owned by the detector instance and must
/// be pruned by `cleanup` and cleared by `reset_daily`.
pub trait Detector: Send {
    fn name(&self) -> &'static str;

    fn detect(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
    ) -> Result<Vec<EventRecord>, DetectorError>;

    /// Drop per-symbol state for symbols not in `active_symbols`; returns symbols removed
    fn cleanup(&mut self, _active_symbols: &HashSet<String>) -> usize {
        0
    }

    /// Clear all state at trading-day rollover
    fn reset_daily(&mut self) {}
}

/// Every detector in engine order
pub fn default_detectors(thresholds: &DetectionThresholds) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(PriceDetector::new(thresholds.clone())),
        Box::new(VolumeDetector::new(thresholds.clone())),
        Box::new(MomentumDetector::new(thresholds.clone())),
        Box::new(PullbackDetector::new(thresholds.clone())),
        Box::new(GapDetector::new(thresholds.clone())),
        Box::new(MovingAverageDetector::new(thresholds.clone())),
        Box::new(BollingerDetector::new(thresholds.clone())),
        Box::new(DailyLevelsDetector::new(thresholds.clone())),
        Box::new(MacdDetector::new(thresholds.clone())),
        Box::new(StochasticDetector::new(thresholds.clone())),
        Box::new(OrbDetector::new(thresholds.clone())),
        Box::new(ConsolidationDetector::new(thresholds.clone())),
        Box::new(ConfirmedCrossDetector::new(thresholds.clone())),
        Box::new(SessionDetector::new()),
    ]
}
