// Gap Detector - Gap reversals back through the opening price

use super::crossing::{crossed_above, crossed_below};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;

const NAME: &str = "gap";

pub struct GapDetector {
    thresholds: DetectionThresholds,
}

impl GapDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }
}

impl Detector for GapDetector {
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
        let (Some(gap_pct), Some(open)) = (current.gap_percent(), current.open_price) else {
            return Ok(Vec::new());
        };
        if gap_pct.abs() < self.thresholds.gap_min_pct {
            return Ok(Vec::new());
        }

        // Reversal means moving back through the open toward the previous close
        let event_type = if gap_pct > 0.0 && crossed_below(previous.price, open, current.price) {
            EventType::GapUpReversal
        } else if gap_pct < 0.0 && crossed_above(previous.price, open, current.price) {
            EventType::GapDownReversal
        } else {
            return Ok(Vec::new());
        };

        if !ctx.try_fire(event_type, &current.symbol) {
            return Ok(Vec::new());
        }

        let mut event = EventRecord::new(event_type, NAME, current)
            .with_values(previous.price, current.price)
            .with_detail("gap_percent", gap_pct)
            .with_detail("open_price", open);
        if let Some(prev_close) = current.prev_close {
            event = event.with_detail("prev_close", prev_close);
        }
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    fn gapped(secs: i64, price: f64, open: f64) -> MarketSnapshot {
        MarketSnapshot {
            open_price: Some(open),
            prev_close: Some(10.0),
            ..snap("PLTR", secs, price)
        }
    }

    #[test]
    fn test_gap_up_reversal() {
        let mut detector = GapDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        // Opened +5% at 10.50, trades back under the open
        let events = harness.run(&mut detector, &gapped(1, 10.45, 10.5), Some(&gapped(0, 10.55, 10.5)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::GapUpReversal);
        assert!((events[0].detail_f64("gap_percent").unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_down_reversal() {
        let mut detector = GapDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let types = harness.types(&mut detector, &gapped(1, 9.55, 9.5), Some(&gapped(0, 9.45, 9.5)));
        assert_eq!(types, vec![EventType::GapDownReversal]);
    }

    #[test]
    fn test_continuation_is_not_a_reversal() {
        let mut detector = GapDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        // Gap up, price moves up through the open: extends the gap
        let events = harness.run(&mut detector, &gapped(1, 10.55, 10.5), Some(&gapped(0, 10.45, 10.5)));
        assert!(events.is_empty());
    }

    #[test]
    fn test_small_gap_ignored() {
        let mut detector = GapDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        // +1% gap is under the 2% minimum
        let events = harness.run(&mut detector, &gapped(1, 10.05, 10.1), Some(&gapped(0, 10.15, 10.1)));
        assert!(events.is_empty());
    }
}
