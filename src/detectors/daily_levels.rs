// Daily Levels Detector - Previous-day range breaks, false gaps, multi-window running momentum

use super::crossing::{crossed_above, crossed_below, level_cross};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;

const NAME: &str = "daily_levels";

pub struct DailyLevelsDetector {
    thresholds: DetectionThresholds,
}

impl DailyLevelsDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    fn fire(
        &self,
        event_type: EventType,
        current: &MarketSnapshot,
        prev_value: f64,
        new_value: f64,
        detail: (&str, f64),
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        if ctx.try_fire(event_type, &current.symbol) {
            events.push(
                EventRecord::new(event_type, NAME, current)
                    .with_values(prev_value, new_value)
                    .with_detail(detail.0, detail.1),
            );
        }
    }

    fn check_prev_day_range(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        if let Some(high) = current.prev_day_high {
            if crossed_above(previous.price, high, current.price) {
                self.fire(
                    EventType::CrossedAbovePrevDayHigh, current, previous.price, current.price,
                    ("prev_day_high", high), ctx, events,
                );
            }
        }
        if let Some(low) = current.prev_day_low {
            if crossed_below(previous.price, low, current.price) {
                self.fire(
                    EventType::CrossedBelowPrevDayLow, current, previous.price, current.price,
                    ("prev_day_low", low), ctx, events,
                );
            }
        }
    }

    /// A qualifying gap that trades all the way back through the previous close
    fn check_false_gap(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let (Some(gap_pct), Some(prev_close)) = (current.gap_percent(), current.prev_close) else {
            return;
        };
        if gap_pct.abs() < self.thresholds.gap_min_pct {
            return;
        }

        let event_type = match level_cross(Some(previous.price), Some(prev_close), Some(current.price)) {
            Some(CrossDirection::Down) if gap_pct > 0.0 => EventType::FalseGapUpRetracement,
            Some(CrossDirection::Up) if gap_pct < 0.0 => EventType::FalseGapDownRetracement,
            _ => return,
        };
        self.fire(event_type, current, previous.price, current.price, ("gap_percent", gap_pct), ctx, events);
    }

    fn check_sustained(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let (Some(prev_chg), Some(cur_chg)) = (previous.chg_10min, current.chg_10min) else {
            return;
        };
        let level = self.thresholds.sustained_chg_10min_pct;
        let event_type = if crossed_above(prev_chg, level, cur_chg) {
            EventType::RunningUpSustained
        } else if crossed_below(prev_chg, -level, cur_chg) {
            EventType::RunningDownSustained
        } else {
            return;
        };
        self.fire(event_type, current, prev_chg, cur_chg, ("chg_10min", cur_chg), ctx, events);
    }

    /// 5-minute running move backed by a 15-minute move already beyond its threshold
    fn check_confirmed(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let (Some(prev_chg), Some(cur_chg), Some(chg_15)) = (previous.chg_5min, current.chg_5min, current.chg_15min)
        else {
            return;
        };
        let level = self.thresholds.confirmed_chg_5min_pct;
        let backing = self.thresholds.confirmed_chg_15min_pct;

        let event_type = if crossed_above(prev_chg, level, cur_chg) && chg_15 >= backing {
            EventType::RunningUpConfirmed
        } else if crossed_below(prev_chg, -level, cur_chg) && chg_15 <= -backing {
            EventType::RunningDownConfirmed
        } else {
            return;
        };
        self.fire(event_type, current, prev_chg, cur_chg, ("chg_15min", chg_15), ctx, events);
    }
}

impl Detector for DailyLevelsDetector {
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
        self.check_prev_day_range(current, previous, ctx, &mut events);
        self.check_false_gap(current, previous, ctx, &mut events);
        self.check_sustained(current, previous, ctx, &mut events);
        self.check_confirmed(current, previous, ctx, &mut events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    #[test]
    fn test_prev_day_breaks() {
        let mut detector = DailyLevelsDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let levels = |secs, price| MarketSnapshot {
            prev_day_high: Some(50.0),
            prev_day_low: Some(45.0),
            ..snap("META", secs, price)
        };
        let events = harness.run(&mut detector, &levels(1, 50.1), Some(&levels(0, 49.9)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::CrossedAbovePrevDayHigh);
        assert_eq!(events[0].detail_f64("prev_day_high"), Some(50.0));

        let types = harness.types(&mut detector, &levels(3, 44.9), Some(&levels(2, 45.2)));
        assert_eq!(types, vec![EventType::CrossedBelowPrevDayLow]);
    }

    #[test]
    fn test_false_gap_up() {
        let mut detector = DailyLevelsDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        // Gapped up 4% and fully round-tripped below the prior close
        let gapped = |secs, price| MarketSnapshot {
            open_price: Some(10.4),
            prev_close: Some(10.0),
            ..snap("META", secs, price)
        };
        let types = harness.types(&mut detector, &gapped(1, 9.95), Some(&gapped(0, 10.05)));
        assert_eq!(types, vec![EventType::FalseGapUpRetracement]);
    }

    #[test]
    fn test_false_gap_needs_real_gap() {
        let mut detector = DailyLevelsDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let flat = |secs, price| MarketSnapshot {
            open_price: Some(10.1),
            prev_close: Some(10.0),
            ..snap("META", secs, price)
        };
        assert!(harness.run(&mut detector, &flat(1, 9.95), Some(&flat(0, 10.05))).is_empty());
    }

    #[test]
    fn test_sustained_running() {
        let mut detector = DailyLevelsDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { chg_10min: Some(-2.8), ..snap("META", 0, 500.0) };
        let current = MarketSnapshot { chg_10min: Some(-3.1), ..snap("META", 1, 498.0) };
        assert_eq!(harness.types(&mut detector, &current, Some(&previous)), vec![EventType::RunningDownSustained]);
    }

    #[test]
    fn test_confirmed_running_requires_backing_window() {
        let mut detector = DailyLevelsDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { chg_5min: Some(1.8), ..snap("META", 0, 500.0) };
        let weak = MarketSnapshot { chg_5min: Some(2.2), chg_15min: Some(3.0), ..snap("META", 1, 505.0) };
        assert!(harness.run(&mut detector, &weak, Some(&previous)).is_empty());

        let strong = MarketSnapshot { chg_5min: Some(2.2), chg_15min: Some(4.5), ..snap("META", 1, 505.0) };
        assert_eq!(harness.types(&mut detector, &strong, Some(&previous)), vec![EventType::RunningUpConfirmed]);
    }
}
