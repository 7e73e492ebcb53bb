// Bollinger Detector - Price breaking out of the upper band or down through the lower band

use super::crossing::{crossed_above, crossed_below};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;

const NAME: &str = "bollinger";

pub struct BollingerDetector {
    thresholds: DetectionThresholds,
}

impl BollingerDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    fn band_event(
        &self,
        event_type: EventType,
        band: f64,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
    ) -> EventRecord {
        let mut event = EventRecord::new(event_type, NAME, current)
            .with_values(previous.price, current.price)
            .with_detail("band", band);
        if let (Some(upper), Some(lower), Some(middle)) = (current.bb_upper, current.bb_lower, current.bb_middle) {
            if middle > 0.0 {
                event = event.with_detail("bandwidth_pct", (upper - lower) / middle * 100.0);
            }
        }
        event
    }
}

impl Detector for BollingerDetector {
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

        let mut events = Vec::new();

        if let Some(upper) = current.bb_upper {
            if crossed_above(previous.price, upper, current.price)
                && ctx.try_fire(EventType::BbUpperBreakout, &current.symbol)
            {
                events.push(self.band_event(EventType::BbUpperBreakout, upper, current, previous));
            }
        }

        if let Some(lower) = current.bb_lower {
            if crossed_below(previous.price, lower, current.price)
                && ctx.try_fire(EventType::BbLowerBreakdown, &current.symbol)
            {
                events.push(self.band_event(EventType::BbLowerBreakdown, lower, current, previous));
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    fn banded(secs: i64, price: f64) -> MarketSnapshot {
        MarketSnapshot {
            bb_upper: Some(105.0),
            bb_middle: Some(100.0),
            bb_lower: Some(95.0),
            ..snap("SPY", secs, price)
        }
    }

    #[test]
    fn test_upper_breakout() {
        let mut detector = BollingerDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let events = harness.run(&mut detector, &banded(1, 105.2), Some(&banded(0, 104.8)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::BbUpperBreakout);
        assert_eq!(events[0].detail_f64("band"), Some(105.0));
        assert!((events[0].detail_f64("bandwidth_pct").unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_lower_breakdown_and_cooldown() {
        let mut detector = BollingerDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let types = harness.types(&mut detector, &banded(1, 94.9), Some(&banded(0, 95.1)));
        assert_eq!(types, vec![EventType::BbLowerBreakdown]);

        // Back inside and out again 60s later, still within the 120s cooldown
        harness.run(&mut detector, &banded(30, 95.5), Some(&banded(1, 94.9)));
        assert!(harness.run(&mut detector, &banded(61, 94.8), Some(&banded(30, 95.5))).is_empty());
    }

    #[test]
    fn test_missing_bands() {
        let mut detector = BollingerDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();
        assert!(harness.run(&mut detector, &snap("SPY", 1, 120.0), Some(&snap("SPY", 0, 90.0))).is_empty());
    }
}
