// Moving Average Detector - Price crossing SMA/EMA lines plus the SMA8/SMA20 cross
// Crossings are tested against the current tick's indicator value

use super::crossing::{level_cross, line_cross};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;

const NAME: &str = "moving_average";

struct AverageLine {
    name: &'static str,
    value: fn(&MarketSnapshot) -> Option<f64>,
    above: EventType,
    below: EventType,
}

const AVERAGES: [AverageLine; 6] = [
    AverageLine { name: "sma_8", value: |s| s.sma_8, above: EventType::CrossedAboveSma8, below: EventType::CrossedBelowSma8 },
    AverageLine { name: "sma_20", value: |s| s.sma_20, above: EventType::CrossedAboveSma20, below: EventType::CrossedBelowSma20 },
    AverageLine { name: "ema_20", value: |s| s.ema_20, above: EventType::CrossedAboveEma20, below: EventType::CrossedBelowEma20 },
    AverageLine { name: "sma_50", value: |s| s.sma_50, above: EventType::CrossedAboveSma50, below: EventType::CrossedBelowSma50 },
    AverageLine { name: "ema_50", value: |s| s.ema_50, above: EventType::CrossedAboveEma50, below: EventType::CrossedBelowEma50 },
    AverageLine {
        name: "daily_sma_200",
        value: |s| s.daily_sma_200,
        above: EventType::CrossedAboveSma200,
        below: EventType::CrossedBelowSma200,
    },
];

pub struct MovingAverageDetector {
    thresholds: DetectionThresholds,
}

impl MovingAverageDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    fn check_sma_cross(
        &self,
        current: &MarketSnapshot,
        previous: &MarketSnapshot,
        ctx: &mut DetectionContext<'_>,
        events: &mut Vec<EventRecord>,
    ) {
        let positive = |v: Option<f64>| v.filter(|x| *x > 0.0);
        let direction = line_cross(
            positive(previous.sma_8),
            positive(previous.sma_20),
            positive(current.sma_8),
            positive(current.sma_20),
        );
        let event_type = match direction {
            Some(CrossDirection::Up) => EventType::Sma8CrossAboveSma20,
            Some(CrossDirection::Down) => EventType::Sma8CrossBelowSma20,
            None => return,
        };

        if ctx.try_fire(event_type, &current.symbol) {
            // line_cross already proved all four present
            let (sma_8, sma_20) = (current.sma_8.unwrap_or_default(), current.sma_20.unwrap_or_default());
            events.push(
                EventRecord::new(event_type, NAME, current)
                    .with_values(previous.sma_8.unwrap_or_default(), sma_8)
                    .with_detail("sma_8", sma_8)
                    .with_detail("sma_20", sma_20),
            );
        }
    }
}

impl Detector for MovingAverageDetector {
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
        for line in &AVERAGES {
            let level = (line.value)(current).filter(|v| *v > 0.0);
            let event_type = match level_cross(Some(previous.price), level, Some(current.price)) {
                Some(CrossDirection::Up) => line.above,
                Some(CrossDirection::Down) => line.below,
                None => continue,
            };
            if ctx.try_fire(event_type, &current.symbol) {
                let mut event = EventRecord::new(event_type, NAME, current)
                    .with_values(previous.price, current.price);
                if let Some(level) = level {
                    event = event.with_detail(line.name, level);
                }
                events.push(event);
            }
        }

        self.check_sma_cross(current, previous, ctx, &mut events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    #[test]
    fn test_price_crosses_several_averages() {
        let mut detector = MovingAverageDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let averages = |secs, price| MarketSnapshot {
            sma_8: Some(50.2),
            sma_20: Some(50.4),
            ema_50: Some(49.0),
            daily_sma_200: Some(50.6),
            ..snap("F", secs, price)
        };
        let types = harness.types(&mut detector, &averages(1, 50.5), Some(&averages(0, 50.0)));
        assert_eq!(types, vec![EventType::CrossedAboveSma8, EventType::CrossedAboveSma20]);

        let types = harness.types(&mut detector, &averages(3, 48.5), Some(&averages(2, 49.5)));
        assert_eq!(types, vec![EventType::CrossedBelowEma50]);
    }

    #[test]
    fn test_golden_and_death_cross() {
        let mut detector = MovingAverageDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { sma_8: Some(9.9), sma_20: Some(10.0), ..snap("F", 0, 12.0) };
        let current = MarketSnapshot { sma_8: Some(10.1), sma_20: Some(10.0), ..snap("F", 1, 12.0) };
        let events = harness.run(&mut detector, &current, Some(&previous));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Sma8CrossAboveSma20);
        assert_eq!(events[0].detail_f64("sma_20"), Some(10.0));

        let later = MarketSnapshot { sma_8: Some(9.8), sma_20: Some(10.0), ..snap("F", 2, 12.0) };
        let types = harness.types(&mut detector, &later, Some(&current));
        assert_eq!(types, vec![EventType::Sma8CrossBelowSma20]);
    }

    #[test]
    fn test_sma_cross_requires_positive_values() {
        let mut detector = MovingAverageDetector::new(DetectionThresholds::default());
        let mut harness = Harness::new();

        let previous = MarketSnapshot { sma_8: Some(0.0), sma_20: Some(10.0), ..snap("F", 0, 12.0) };
        let current = MarketSnapshot { sma_8: Some(10.1), sma_20: Some(10.0), ..snap("F", 1, 12.0) };
        assert!(harness.run(&mut detector, &current, Some(&previous)).is_empty());
    }
}
