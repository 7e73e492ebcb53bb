// Pullback Detector - Retracements from the intraday high and rebounds from the intraday low
//
// Three reference bases (full range, previous close, today's open) times two
// retracement fractions times two directions: 12 independent events.

use super::crossing::{crossed_above, crossed_below};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;

const NAME: &str = "pullback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Intraday high to intraday low
    Range,
    /// Intraday extreme to the previous close
    Close,
    /// Intraday extreme to today's open
    Open,
}

impl Anchor {
    const ALL: [Anchor; 3] = [Anchor::Range, Anchor::Close, Anchor::Open];

    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Range => "range",
            Anchor::Close => "prev_close",
            Anchor::Open => "open",
        }
    }

    /// (from_high, from_low) event types for the shallow and deep fractions
    fn event_types(&self, deep: bool) -> (EventType, EventType) {
        use EventType::*;
        match (self, deep) {
            (Anchor::Range, false) => (Pullback25FromHigh, Pullback25FromLow),
            (Anchor::Range, true) => (Pullback75FromHigh, Pullback75FromLow),
            (Anchor::Close, false) => (Pullback25FromHighClose, Pullback25FromLowClose),
            (Anchor::Close, true) => (Pullback75FromHighClose, Pullback75FromLowClose),
            (Anchor::Open, false) => (Pullback25FromHighOpen, Pullback25FromLowOpen),
            (Anchor::Open, true) => (Pullback75FromHighOpen, Pullback75FromLowOpen),
        }
    }
}

/// A retracement level ready for the crossing test
struct PullbackLevel {
    event_type: EventType,
    anchor: Anchor,
    fraction: f64,
    level: f64,
    from_high: bool,
}

pub struct PullbackDetector {
    thresholds: DetectionThresholds,
}

impl PullbackDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    /// Range that passes the noise floor, measured relative to `reference`
    fn wide_enough(&self, range: f64, reference: f64) -> bool {
        reference > 0.0 && range > 0.0 && range / reference * 100.0 >= self.thresholds.pullback_min_range_pct
    }

    fn levels(&self, current: &MarketSnapshot, high: f64, low: f64) -> Vec<PullbackLevel> {
        let fractions = [
            (self.thresholds.pullback_shallow_fraction, false),
            (self.thresholds.pullback_deep_fraction, true),
        ];

        let mut levels = Vec::new();
        for anchor in Anchor::ALL {
            // (range below the high, range above the low, noise reference)
            let (high_span, low_span, reference) = match anchor {
                Anchor::Range => (high - low, high - low, current.price),
                Anchor::Close => {
                    let Some(prev_close) = current.prev_close else { continue };
                    (high - prev_close, prev_close - low, prev_close)
                }
                Anchor::Open => {
                    let Some(open) = current.open_price else { continue };
                    (high - open, open - low, open)
                }
            };

            for (fraction, deep) in fractions {
                let (from_high, from_low) = anchor.event_types(deep);
                if self.wide_enough(high_span, reference) {
                    levels.push(PullbackLevel {
                        event_type: from_high,
                        anchor,
                        fraction,
                        level: high - fraction * high_span,
                        from_high: true,
                    });
                }
                if self.wide_enough(low_span, reference) {
                    levels.push(PullbackLevel {
                        event_type: from_low,
                        anchor,
                        fraction,
                        level: low + fraction * low_span,
                        from_high: false,
                    });
                }
            }
        }
        levels
    }
}

impl Detector for PullbackDetector {
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
        let (Some(high), Some(low)) = (current.intraday_high, current.intraday_low) else {
            return Ok(Vec::new());
        };
        if high <= low {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for level in self.levels(current, high, low) {
            let crossed = if level.from_high {
                crossed_below(previous.price, level.level, current.price)
            } else {
                crossed_above(previous.price, level.level, current.price)
            };
            if !crossed || !ctx.try_fire(level.event_type, &current.symbol) {
                continue;
            }

            events.push(
                EventRecord::new(level.event_type, NAME, current)
                    .with_values(previous.price, current.price)
                    .with_detail("level", level.level)
                    .with_detail("fraction", level.fraction)
                    .with_detail("anchor", level.anchor.as_str())
                    .with_detail("intraday_high", high)
                    .with_detail("intraday_low", low),
            );
        }

        Ok(events)
    }
}
