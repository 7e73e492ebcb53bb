// MACD Detector - Signal-line crosses and zero-line crosses

use super::crossing::{level_cross, line_cross};
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;

const NAME: &str = "macd";

pub struct MacdDetector {
    thresholds: DetectionThresholds,
}

impl MacdDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    fn macd_event(event_type: EventType, current: &MarketSnapshot, previous: &MarketSnapshot) -> EventRecord {
        let mut event = EventRecord::new(event_type, NAME, current);
        if let (Some(prev_line), Some(line)) = (previous.macd_line, current.macd_line) {
            event = event.with_values(prev_line, line);
        }
        if let Some(signal) = current.macd_signal {
            event = event.with_detail("macd_signal", signal);
        }
        if let Some(histogram) = current.macd_histogram {
            event = event.with_detail("macd_histogram", histogram);
        }
        event
    }
}

impl Detector for MacdDetector {
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

        let signal_cross = line_cross(previous.macd_line, previous.macd_signal, current.macd_line, current.macd_signal)
            .map(|direction| match direction {
                CrossDirection::Up => EventType::MacdBullishCross,
                CrossDirection::Down => EventType::MacdBearishCross,
            });
        let zero_cross = level_cross(previous.macd_line, Some(0.0), current.macd_line).map(|direction| match direction {
            CrossDirection::Up => EventType::MacdZeroCrossUp,
            CrossDirection::Down => EventType::MacdZeroCrossDown,
        });

        for event_type in [signal_cross, zero_cross].into_iter().flatten() {
            if ctx.try_fire(event_type, &current.symbol) {
                events.push(Self::macd_event(event_type, current, previous));
            }
        }

        Ok(events)
    }
}
