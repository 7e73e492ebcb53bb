// Consolidation Detector - Sharp 1-minute move out of a tight multi-window range

use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;

const NAME: &str = "consolidation";

pub struct ConsolidationDetector {
    thresholds: DetectionThresholds,
}

impl ConsolidationDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    fn was_consolidating(&self, previous: &MarketSnapshot) -> bool {
        match (previous.chg_5min, previous.chg_10min) {
            (Some(chg_5), Some(chg_10)) => {
                chg_5.abs() < self.thresholds.consolidation_max_chg_5min_pct
                    && chg_10.abs() < self.thresholds.consolidation_max_chg_10min_pct
            }
            _ => false,
        }
    }
}

impl Detector for ConsolidationDetector {
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
        if !current.has_volume(self.thresholds.min_volume) || !self.was_consolidating(previous) {
            return Ok(Vec::new());
        }
        let (Some(chg_1), Some(rvol)) = (current.chg_1min, current.rvol) else {
            return Ok(Vec::new());
        };
        if chg_1.abs() < self.thresholds.consolidation_breakout_chg_1min_pct
            || rvol < self.thresholds.consolidation_min_rvol
        {
            return Ok(Vec::new());
        }

        let event_type = if chg_1 > 0.0 {
            EventType::ConsolidationBreakoutUp
        } else {
            EventType::ConsolidationBreakoutDown
        };
        if !ctx.try_fire(event_type, &current.symbol) {
            return Ok(Vec::new());
        }

        let mut event = EventRecord::new(event_type, NAME, current)
            .with_values(previous.price, current.price)
            .with_detail("chg_1min", chg_1)
            .with_detail("rvol", rvol);
        if let Some(chg_5) = previous.chg_5min {
            event = event.with_detail("prior_chg_5min", chg_5);
        }
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    fn tight(secs: i64, price: f64) -> MarketSnapshot {
        MarketSnapshot {
            chg_5min: Some(0.2),
            chg_10min: Some(-0.4),
            ..snap("COIN", secs, price)
        }
    }

    #[test]
    fn test_breakout_up() {
        let mut detector = ConsolidationDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let current = MarketSnapshot { chg_1min: Some(1.1), rvol: Some(2.0), ..snap("COIN", 1, 202.0) };
        let events = harness.run(&mut detector, &current, Some(&tight(0, 200.0)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ConsolidationBreakoutUp);
        assert_eq!(events[0].detail_f64("rvol"), Some(2.0));
    }

    #[test]
    fn test_breakout_down() {
        let mut detector = ConsolidationDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let current = MarketSnapshot { chg_1min: Some(-0.9), rvol: Some(1.6), ..snap("COIN", 1, 198.0) };
        let types = harness.types(&mut detector, &current, Some(&tight(0, 200.0)));
        assert_eq!(types, vec![EventType::ConsolidationBreakoutDown]);
    }

    #[test]
    fn test_requires_prior_consolidation_and_volume() {
        let mut detector = ConsolidationDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let trending = MarketSnapshot { chg_5min: Some(1.5), chg_10min: Some(0.5), ..snap("COIN", 0, 200.0) };
        let current = MarketSnapshot { chg_1min: Some(1.1), rvol: Some(2.0), ..snap("COIN", 1, 202.0) };
        assert!(harness.run(&mut detector, &current, Some(&trending)).is_empty());

        let quiet = MarketSnapshot { chg_1min: Some(1.1), rvol: Some(1.0), ..snap("COIN", 2, 202.0) };
        assert!(harness.run(&mut detector, &quiet, Some(&tight(1, 200.0))).is_empty());
    }
}
