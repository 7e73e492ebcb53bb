// Stochastic Detector - Zone-gated %K/%D crosses and oversold/overbought entries

use super::crossing::{crossed_above, crossed_below, line_cross};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;

const NAME: &str = "stochastic";

pub struct StochasticDetector {
    thresholds: DetectionThresholds,
}

impl StochasticDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    /// %K/%D cross, counted only from the matching extreme zone
    fn kd_cross(&self, current: &MarketSnapshot, previous: &MarketSnapshot, k: f64) -> Option<EventType> {
        match line_cross(previous.stoch_k, previous.stoch_d, current.stoch_k, current.stoch_d)? {
            CrossDirection::Up if k < self.thresholds.stoch_bullish_zone => Some(EventType::StochBullishCross),
            CrossDirection::Down if k > self.thresholds.stoch_bearish_zone => Some(EventType::StochBearishCross),
            _ => None,
        }
    }

    fn zone_entry(&self, prev_k: f64, k: f64) -> Option<EventType> {
        if crossed_below(prev_k, self.thresholds.stoch_oversold, k) {
            Some(EventType::StochOversold)
        } else if crossed_above(prev_k, self.thresholds.stoch_overbought, k) {
            Some(EventType::StochOverbought)
        } else {
            None
        }
    }
}

impl Detector for StochasticDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn detect(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
    ) -> Result<Vec<EventRecord>, DetectorError> {
        let Some(previous) = previous else {
            return Ok(Vec::new());
        };
        if !current.has_volume(self.thresholds.min_volume) {
            return Ok(Vec::new());
        }
        let (Some(prev_k), Some(k)) = (previous.stoch_k, current.stoch_k) else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        let candidates = [self.kd_cross(current, previous, k), self.zone_entry(prev_k, k)];
        for event_type in candidates.into_iter().flatten() {
            if !ctx.try_fire(event_type, &current.symbol) {
                continue;
            }
            let mut event = EventRecord::new(event_type, NAME, current)
                .with_values(prev_k, k)
                .with_detail("stoch_k", k);
            if let Some(d) = current.stoch_d {
                event = event.with_detail("stoch_d", d);
            }
            events.push(event);
        }

        Ok(events)
    }
}
