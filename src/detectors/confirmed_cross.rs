// Confirmed Cross Detector - Open / previous-close crosses that hold for a confirmation window
//
// A fresh cross opens a pending entry keyed by (direction, level). The entry is
// dropped when price falls back across the level, when the opposite cross
// happens, or once it matures; so one crossing can fire at most once.

use super::crossing::level_cross;
use super::{DetectionContext, Detector};
use crate::core::config::DetectionThresholds;
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::CrossDirection;
use crate::state::MarketSnapshot;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const NAME: &str = "confirmed_cross";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LevelKind {
    Open,
    PrevClose,
}

impl LevelKind {
    const ALL: [LevelKind; 2] = [LevelKind::Open, LevelKind::PrevClose];

    fn level(&self, snapshot: &MarketSnapshot) -> Option<f64> {
        match self {
            LevelKind::Open => snapshot.open_price,
            LevelKind::PrevClose => snapshot.prev_close,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LevelKind::Open => "open_price",
            LevelKind::PrevClose => "prev_close",
        }
    }

    fn event_type(&self, direction: CrossDirection) -> EventType {
        match (self, direction) {
            (LevelKind::Open, CrossDirection::Up) => EventType::CrossedAboveOpenConfirmed,
            (LevelKind::Open, CrossDirection::Down) => EventType::CrossedBelowOpenConfirmed,
            (LevelKind::PrevClose, CrossDirection::Up) => EventType::CrossedAbovePrevCloseConfirmed,
            (LevelKind::PrevClose, CrossDirection::Down) => EventType::CrossedBelowPrevCloseConfirmed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingCross {
    cross_time: DateTime<Utc>,
    level: f64,
}

type PendingKey = (CrossDirection, LevelKind);

pub struct ConfirmedCrossDetector {
    thresholds: DetectionThresholds,
    pending: HashMap<String, HashMap<PendingKey, PendingCross>>,
}

impl ConfirmedCrossDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self {
            thresholds,
            pending: HashMap::new(),
        }
    }

    /// Crossings awaiting confirmation for `symbol`
    pub fn pending_count(&self, symbol: &str) -> usize {
        self.pending.get(symbol).map_or(0, HashMap::len)
    }

    fn open_fresh_crosses(&mut self, current: &MarketSnapshot, previous: &MarketSnapshot) {
        for kind in LevelKind::ALL {
            let level = kind.level(current);
            let Some(direction) = level_cross(Some(previous.price), level, Some(current.price)) else {
                continue;
            };
            let Some(level) = level else { continue };

            let entries = self.pending.entry(current.symbol.clone()).or_default();
            entries.remove(&(direction.opposite(), kind));
            entries.insert((direction, kind), PendingCross { cross_time: current.timestamp, level });
            debug!(
                symbol = %current.symbol,
                level = kind.as_str(),
                direction = %direction,
                "Cross pending confirmation"
            );
        }
    }

    /// Drop reverted entries and pull out matured ones
    fn settle(&mut self, current: &MarketSnapshot) -> Vec<(PendingKey, PendingCross)> {
        let Some(entries) = self.pending.get_mut(&current.symbol) else {
            return Vec::new();
        };
        let confirmation_secs = self.thresholds.confirmation_secs;

        let mut matured = Vec::new();
        entries.retain(|key, pending| {
            let holding = match key.0 {
                CrossDirection::Up => current.price > pending.level,
                CrossDirection::Down => current.price < pending.level,
            };
            if !holding {
                return false;
            }
            if (current.timestamp - pending.cross_time).num_seconds() >= confirmation_secs {
                matured.push((*key, *pending));
                return false;
            }
            true
        });

        if entries.is_empty() {
            self.pending.remove(&current.symbol);
        }
        matured
    }
}

impl Detector for ConfirmedCrossDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn detect(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
    ) -> Result<Vec<EventRecord>, DetectorError> {
        // No continuity without a previous tick
        let Some(previous) = previous else {
            self.pending.remove(&current.symbol);
            return Ok(Vec::new());
        };

        if current.has_volume(self.thresholds.min_volume) {
            self.open_fresh_crosses(current, previous);
        }

        let mut events = Vec::new();
        for ((direction, kind), pending) in self.settle(current) {
            let event_type = kind.event_type(direction);
            if !ctx.try_fire(event_type, &current.symbol) {
                continue;
            }
            let held_secs = (current.timestamp - pending.cross_time).num_seconds();
            events.push(
                EventRecord::new(event_type, NAME, current)
                    .with_values(pending.level, current.price)
                    .with_detail("level", pending.level)
                    .with_detail("level_type", kind.as_str())
                    .with_detail("cross_time", pending.cross_time.to_rfc3339())
                    .with_detail("held_secs", held_secs),
            );
        }

        Ok(events)
    }

    fn cleanup(&mut self, active_symbols: &HashSet<String>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|symbol, _| active_symbols.contains(symbol));
        before - self.pending.len()
    }

    fn reset_daily(&mut self) {
        self.pending.clear();
    }
}
