// Momentum Detector - Short-window running moves and daily percent-change milestones

use super::crossing::{crossed_above, crossed_below};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;

const NAME: &str = "momentum";

pub struct MomentumDetector {
    thresholds: DetectionThresholds,
}

impl MomentumDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    fn check_running(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        if !current.has_volume(self.thresholds.running_min_volume) {
            return;
        }
        let (Some(prev_chg), Some(cur_chg)) = (previous.chg_5min, current.chg_5min) else {
            return;
        };

        let level = self.thresholds.running_chg_5min_pct;
        let event_type = if crossed_above(prev_chg, level, cur_chg) {
            EventType::RunningUp
        } else if crossed_below(prev_chg, -level, cur_chg) {
            EventType::RunningDown
        } else {
            return;
        };

        if ctx.try_fire(event_type, &current.symbol) {
            events.push(
                EventRecord::new(event_type, NAME, current)
                    .with_values(prev_chg, cur_chg)
                    .with_detail("window", "5m"),
            );
        }
    }

    fn check_daily_change(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let (Some(prev_chg), Some(cur_chg)) = (previous.daily_change_percent(), current.daily_change_percent()) else {
            return;
        };

        let milestones = [
            (self.thresholds.daily_change_pct, EventType::PercentUp5, EventType::PercentDown5),
            (self.thresholds.daily_change_large_pct, EventType::PercentUp10, EventType::PercentDown10),
        ];

        for (level, up, down) in milestones {
            let event_type = if crossed_above(prev_chg, level, cur_chg) {
                up
            } else if crossed_below(prev_chg, -level, cur_chg) {
                down
            } else {
                continue;
            };

            if ctx.try_fire(event_type, &current.symbol) {
                events.push(
                    EventRecord::new(event_type, NAME, current)
                        .with_values(prev_chg, cur_chg)
                        .with_detail("threshold_pct", level),
                );
            }
        }
    }
}

impl Detector for MomentumDetector {
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
        self.check_running(current, previous, ctx, &mut events);
        self.check_daily_change(current, previous, ctx, &mut events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    #[test]
    fn test_running_up_and_down() {
        let mut detector = MomentumDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { chg_5min: Some(1.5), ..snap("NVDA", 0, 120.0) };
        let current = MarketSnapshot { chg_5min: Some(2.4), ..snap("NVDA", 1, 121.0) };
        assert_eq!(harness.types(&mut detector, &current, Some(&previous)), vec![EventType::RunningUp]);

        let previous = MarketSnapshot { chg_5min: Some(-1.0), ..snap("AMD", 0, 120.0) };
        let current = MarketSnapshot { chg_5min: Some(-2.5), ..snap("AMD", 1, 118.0) };
        assert_eq!(harness.types(&mut detector, &current, Some(&previous)), vec![EventType::RunningDown]);
    }

    #[test]
    fn test_running_needs_higher_volume_floor() {
        let mut detector = MomentumDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { chg_5min: Some(1.5), volume: 20_000.0, ..snap("NVDA", 0, 120.0) };
        let current = MarketSnapshot { chg_5min: Some(2.4), volume: 30_000.0, ..snap("NVDA", 1, 121.0) };
        assert!(harness.run(&mut detector, &current, Some(&previous)).is_empty());
    }

    #[test]
    fn test_daily_change_derived_from_prev_close() {
        let mut detector = MomentumDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        // 10.45 is +4.5%, 10.55 is +5.5% against a 10.00 close
        let previous = MarketSnapshot { prev_close: Some(10.0), ..snap("SOFI", 0, 10.45) };
        let current = MarketSnapshot { prev_close: Some(10.0), ..snap("SOFI", 1, 10.55) };
        let events = harness.run(&mut detector, &current, Some(&previous));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PercentUp5);
        assert_eq!(events[0].detail_f64("threshold_pct"), Some(5.0));
    }

    #[test]
    fn test_large_move_fires_both_milestones() {
        let mut detector = MomentumDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { change_percent: Some(-4.0), ..snap("SOFI", 0, 9.6) };
        let current = MarketSnapshot { change_percent: Some(-11.0), ..snap("SOFI", 1, 8.9) };
        let types = harness.types(&mut detector, &current, Some(&previous));
        assert_eq!(types, vec![EventType::PercentDown5, EventType::PercentDown10]);
    }

    #[test]
    fn test_missing_fields_skip() {
        let mut detector = MomentumDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = snap("SOFI", 0, 9.6);
        let current = MarketSnapshot { chg_5min: Some(9.0), ..snap("SOFI", 1, 12.0) };
        assert!(harness.run(&mut detector, &current, Some(&previous)).is_empty());
    }
}
