// Opening Range Breakout Detector - Range built over the first minutes after the open, then locked
//
// Window timing comes from the snapshot timestamp in US Eastern market time,
// so replayed data behaves the same as live data.

use super::crossing::level_cross;
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::market_clock;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const NAME: &str = "orb";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
    pub locked: bool,
    /// False when the locked range was too narrow (or never built) to trade
    pub valid: bool,
}

pub struct OrbDetector {
    thresholds: DetectionThresholds,
    ranges: HashMap<String, OpeningRange>,
}

impl OrbDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self {
            thresholds,
            ranges: HashMap::new(),
        }
    }

    pub fn range(&self, symbol: &str) -> Option<OpeningRange> {
        self.ranges.get(symbol).copied()
    }

    fn extend_range(&mut self, current: &MarketSnapshot) {
        let high = current.intraday_high.unwrap_or(current.price).max(current.price);
        let low = current.intraday_low.unwrap_or(current.price).min(current.price);

        let range = self.ranges.entry(current.symbol.clone()).or_insert(OpeningRange {
            high,
            low,
            locked: false,
            valid: false,
        });
        range.high = range.high.max(high);
        range.low = range.low.min(low);
    }

    /// Freeze the range; returns the locked state
    fn lock_range(&mut self, current: &MarketSnapshot) -> OpeningRange {
        let min_width_pct = self.thresholds.orb_min_width_pct;
        let range = self.ranges.entry(current.symbol.clone()).or_insert(OpeningRange {
            high: current.price,
            low: current.price,
            locked: false,
            valid: false,
        });

        if !range.locked {
            let width_pct = (range.high - range.low) / current.price * 100.0;
            range.locked = true;
            range.valid = range.high > range.low && width_pct >= min_width_pct;
            debug!(
                symbol = %current.symbol,
                orb_high = range.high,
                orb_low = range.low,
                valid = range.valid,
                "Opening range locked"
            );
        }
        *range
    }
}

impl Detector for OrbDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn detect(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
    ) -> Result<Vec<EventRecord>, DetectorError> {
        let since_open = market_clock::seconds_since_open(current.timestamp)
            .ok_or_else(|| DetectorError::MarketClock(format!("cannot place {} in market time", current.timestamp)))?;
        let window_secs = self.thresholds.orb_window_minutes * 60;

        if since_open < 0 {
            return Ok(Vec::new());
        }
        if since_open < window_secs {
            self.extend_range(current);
            return Ok(Vec::new());
        }

        let range = self.lock_range(current);
        if !range.valid {
            return Ok(Vec::new());
        }
        let Some(previous) = previous else {
            return Ok(Vec::new());
        };
        if !current.has_volume(self.thresholds.min_volume) {
            return Ok(Vec::new());
        }

        let prev_price = Some(previous.price);
        let price = Some(current.price);
        let breakout = match (
            level_cross(prev_price, Some(range.high), price),
            level_cross(prev_price, Some(range.low), price),
        ) {
            (Some(CrossDirection::Up), _) => Some(EventType::OrbBreakoutUp),
            (_, Some(CrossDirection::Down)) => Some(EventType::OrbBreakoutDown),
            _ => None,
        };

        let Some(event_type) = breakout else {
            return Ok(Vec::new());
        };
        if !ctx.try_fire(event_type, &current.symbol) {
            return Ok(Vec::new());
        }

        Ok(vec![EventRecord::new(event_type, NAME, current)
            .with_values(previous.price, current.price)
            .with_detail("orb_high", range.high)
            .with_detail("orb_low", range.low)])
    }

    fn cleanup(&mut self, active_symbols: &HashSet<String>) -> usize {
        let before = self.ranges.len();
        self.ranges.retain(|symbol, _| active_symbols.contains(symbol));
        before - self.ranges.len()
    }

    fn reset_daily(&mut self) {
        self.ranges.clear();
    }
}
