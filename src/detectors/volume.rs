// Volume Detector - RVOL spikes, volume surges, 1-minute spikes, block trades, unusual prints
// Each check is a generic up-cross of a volume measure through a fixed threshold

use super::crossing::crossed_above;
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::state::MarketSnapshot;

const NAME: &str = "volume";

/// One up-cross rule: which field, which level, which liquidity floor
struct VolumeRule {
    event_type: EventType,
    field: fn(&MarketSnapshot) -> Option<f64>,
    threshold: f64,
    min_volume: f64,
}

pub struct VolumeDetector {
    rules: Vec<VolumeRule>,
}

impl VolumeDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        let rules = vec![
            VolumeRule {
                event_type: EventType::RvolSpike,
                field: |s| s.rvol,
                threshold: thresholds.rvol_spike,
                min_volume: thresholds.rvol_spike_min_volume,
            },
            VolumeRule {
                event_type: EventType::VolumeSurge,
                field: |s| s.rvol,
                threshold: thresholds.volume_surge_rvol,
                min_volume: thresholds.volume_surge_min_volume,
            },
            VolumeRule {
                event_type: EventType::VolumeSpike1Min,
                field: |s| s.vol_1min,
                threshold: thresholds.volume_spike_1min,
                min_volume: thresholds.min_volume,
            },
            VolumeRule {
                event_type: EventType::BlockTrade,
                field: |s| s.minute_volume,
                threshold: thresholds.block_trade_volume,
                min_volume: thresholds.min_volume,
            },
            VolumeRule {
                event_type: EventType::UnusualPrints,
                field: |s| s.trades_z_score,
                threshold: thresholds.unusual_prints_z,
                min_volume: thresholds.min_volume,
            },
        ];

        Self { rules }
    }
}

impl Detector for VolumeDetector {
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

        let mut events = Vec::new();
        for rule in &self.rules {
            if !current.has_volume(rule.min_volume) {
                continue;
            }
            let (Some(prev_value), Some(cur_value)) = ((rule.field)(previous), (rule.field)(current)) else {
                continue;
            };
            if !crossed_above(prev_value, rule.threshold, cur_value) {
                continue;
            }
            if ctx.try_fire(rule.event_type, &current.symbol) {
                events.push(
                    EventRecord::new(rule.event_type, NAME, current)
                        .with_values(prev_value, cur_value)
                        .with_detail("threshold", rule.threshold),
                );
            }
        }

        Ok(events)
    }
}
