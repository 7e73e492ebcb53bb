// Price Detector - New intraday highs/lows plus open, previous-close and VWAP crosses
//
// The snapshot's intraday_high/low already include the current price, so
// comparing price against them is trivially true at the peak. This detector
// keeps its own lagged extremes per symbol instead.

use super::crossing::level_cross;
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const NAME: &str = "price";

#[derive(Debug, Clone, Copy)]
struct TrackedExtremes {
    high: f64,
    low: f64,
}

pub struct PriceDetector {
    thresholds: DetectionThresholds,
    extremes: HashMap<String, TrackedExtremes>,
}

impl PriceDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self {
            thresholds,
            extremes: HashMap::new(),
        }
    }

    /// Currently tracked (high, low) for `symbol`
    pub fn tracked(&self, symbol: &str) -> Option<(f64, f64)> {
        self.extremes.get(symbol).map(|e| (e.high, e.low))
    }

    fn check_extremes(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let symbol = current.symbol.as_str();
        let price = current.price;

        // No previous (first sight or a dropped stale snapshot): seed from this snapshot alone
        if previous.is_none() || !self.extremes.contains_key(symbol) {
            let seed = TrackedExtremes {
                high: current.intraday_high.unwrap_or(price).max(price),
                low: current.intraday_low.unwrap_or(price).min(price),
            };
            self.extremes.insert(symbol.to_string(), seed);
            debug!(symbol = %symbol, high = seed.high, low = seed.low, "Seeded price extremes");
            return;
        }
        let Some(tracked) = self.extremes.get_mut(symbol) else {
            return;
        };

        let can_emit = current.has_volume(self.thresholds.min_volume);

        if price > tracked.high {
            let prior = tracked.high;
            tracked.high = price;
            if can_emit && ctx.try_fire(EventType::NewHigh, symbol) {
                events.push(
                    EventRecord::new(EventType::NewHigh, NAME, current)
                        .with_values(prior, price)
                        .with_detail("previous_high", prior),
                );
            }
        }

        if price < tracked.low {
            let prior = tracked.low;
            tracked.low = price;
            if can_emit && ctx.try_fire(EventType::NewLow, symbol) {
                events.push(
                    EventRecord::new(EventType::NewLow, NAME, current)
                        .with_values(prior, price)
                        .with_detail("previous_low", prior),
                );
            }
        }
    }

    fn check_level(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        level: Option<f64>,
        level_name: &str,
        up: EventType,
        down: EventType,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let Some(direction) = level_cross(Some(previous.price), level, Some(current.price)) else {
            return;
        };
        let event_type = match direction {
            CrossDirection::Up => up,
            CrossDirection::Down => down,
        };

        if ctx.try_fire(event_type, &current.symbol) {
            let mut event = EventRecord::new(event_type, NAME, current)
                .with_values(previous.price, current.price);
            if let Some(level) = level {
                event = event.with_detail(level_name, level);
            }
            events.push(event);
        }
    }
}

impl Detector for PriceDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn detect(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
    ) -> Result<Vec<EventRecord>, DetectorError> {
        let mut events = Vec::new();

        self.check_extremes(current, previous, ctx, &mut events);

        let Some(previous) = previous else {
            return Ok(events);
        };
        if !current.has_volume(self.thresholds.min_volume) {
            return Ok(events);
        }

        self.check_level(
            current, previous, current.open_price, "open_price",
            EventType::CrossedAboveOpen, EventType::CrossedBelowOpen, ctx, &mut events,
        );
        self.check_level(
            current, previous, current.prev_close, "prev_close",
            EventType::CrossedAbovePrevClose, EventType::CrossedBelowPrevClose, ctx, &mut events,
        );
        self.check_level(
            current, previous, current.vwap, "vwap",
            EventType::VwapCrossAbove, EventType::VwapCrossBelow, ctx, &mut events,
        );

        Ok(events)
    }

    fn cleanup(&mut self, active_symbols: &HashSet<String>) -> usize {
        let before = self.extremes.len();
        self.extremes.retain(|symbol, _| active_symbols.contains(symbol));
        before - self.extremes.len()
    }

    fn reset_daily(&mut self) {
        self.extremes.clear();
    }
}
