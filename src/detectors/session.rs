// Session Detector - Pre-market and post-market highs/lows
// Extremes are tracked per extended session and cleared on session transitions

use super::{DetectionContext, Detector};
use crate::core::error::DetectorError;
use crate::core::event_types::EventType;
use crate::core::events::EventRecord;
use crate::core::types::MarketSession;
use crate::state::MarketSnapshot;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const NAME: &str = "session";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionExtremes {
    pub high: Option<f64>,
    pub low: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct SessionTrack {
    session: MarketSession,
    pre_market: SessionExtremes,
    post_market: SessionExtremes,
}

impl SessionTrack {
    fn enter(&mut self, session: MarketSession) {
        match session {
            MarketSession::MarketOpen => {
                self.pre_market = SessionExtremes::default();
                self.post_market = SessionExtremes::default();
            }
            MarketSession::PreMarket => self.pre_market = SessionExtremes::default(),
            MarketSession::PostMarket => self.post_market = SessionExtremes::default(),
            MarketSession::Closed => {}
        }
        self.session = session;
    }

    fn extremes_mut(&mut self) -> Option<&mut SessionExtremes> {
        match self.session {
            MarketSession::PreMarket => Some(&mut self.pre_market),
            MarketSession::PostMarket => Some(&mut self.post_market),
            _ => None,
        }
    }
}

/// Extended-hours prints are thin, so no volume floor applies here
#[derive(Default)]
pub struct SessionDetector {
    tracks: HashMap<String, SessionTrack>,
}

impl SessionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extremes tracked for `symbol` in `session` (pre- or post-market only)
    pub fn extremes(&self, symbol: &str, session: MarketSession) -> Option<SessionExtremes> {
        let track = self.tracks.get(symbol)?;
        match session {
            MarketSession::PreMarket => Some(track.pre_market),
            MarketSession::PostMarket => Some(track.post_market),
            _ => None,
        }
    }
}

impl Detector for SessionDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn detect(
        &mut self,
        current: &MarketSnapshot,
        previous: Option<&MarketSnapshot>,
        ctx: &mut DetectionContext<'_>,
    ) -> Result<Vec<EventRecord>, DetectorError> {
        let session = current.market_session;
        let track = self.tracks.entry(current.symbol.clone()).or_default();
        if track.session != session {
            debug!(symbol = %current.symbol, from = %track.session, to = %session, "Session transition");
            track.enter(session);
        }

        let Some(extremes) = track.extremes_mut() else {
            return Ok(Vec::new());
        };
        let (high_event, low_event) = match session {
            MarketSession::PreMarket => (EventType::PreMarketHigh, EventType::PreMarketLow),
            _ => (EventType::PostMarketHigh, EventType::PostMarketLow),
        };

        let price = current.price;
        let mut events = Vec::new();

        match extremes.high {
            Some(high) if price > high => {
                extremes.high = Some(price);
                if previous.is_some() && ctx.try_fire(high_event, &current.symbol) {
                    events.push(
                        EventRecord::new(high_event, NAME, current)
                            .with_values(high, price)
                            .with_detail("session", session.to_string()),
                    );
                }
            }
            Some(_) => {}
            None => extremes.high = Some(price),
        }

        match extremes.low {
            Some(low) if price < low => {
                extremes.low = Some(price);
                if previous.is_some() && ctx.try_fire(low_event, &current.symbol) {
                    events.push(
                        EventRecord::new(low_event, NAME, current)
                            .with_values(low, price)
                            .with_detail("session", session.to_string()),
                    );
                }
            }
            Some(_) => {}
            None => extremes.low = Some(price),
        }

        Ok(events)
    }

    fn cleanup(&mut self, active_symbols: &HashSet<String>) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|symbol, _| active_symbols.contains(symbol));
        before - self.tracks.len()
    }

    fn reset_daily(&mut self) {
        self.tracks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{snap, Harness};

    fn in_session(secs: i64, price: f64, session: MarketSession) -> MarketSnapshot {
        MarketSnapshot { market_session: session, ..snap("GME", secs, price) }
    }

    #[test]
    fn test_pre_market_high_and_low() {
        let mut detector = SessionDetector::new();
        let mut harness = Harness::new();

        let a = in_session(0, 20.0, MarketSession::PreMarket);
        let b = in_session(40, 21.0, MarketSession::PreMarket);
        let c = in_session(80, 19.0, MarketSession::PreMarket);
        assert!(harness.run(&mut detector, &a, None).is_empty());
        assert_eq!(harness.types(&mut detector, &b, Some(&a)), vec![EventType::PreMarketHigh]);
        assert_eq!(harness.types(&mut detector, &c, Some(&b)), vec![EventType::PreMarketLow]);
    }

    #[test]
    fn test_regular_session_is_ignored() {
        let mut detector = SessionDetector::new();
        let mut harness = Harness::new();

        let a = in_session(0, 20.0, MarketSession::MarketOpen);
        let b = in_session(1, 25.0, MarketSession::MarketOpen);
        harness.run(&mut detector, &a, None);
        assert!(harness.run(&mut detector, &b, Some(&a)).is_empty());
    }

    #[test]
    fn test_stale_pre_market_high_not_reused() {
        let mut detector = SessionDetector::new();
        let mut harness = Harness::new();

        let pre = in_session(0, 15.0, MarketSession::PreMarket);
        harness.run(&mut detector, &pre, None);
        assert_eq!(detector.extremes("GME", MarketSession::PreMarket).unwrap().high, Some(15.0));

        let open = in_session(60, 13.0, MarketSession::MarketOpen);
        harness.run(&mut detector, &open, Some(&pre));
        assert_eq!(detector.extremes("GME", MarketSession::PreMarket), Some(SessionExtremes::default()));

        // First post-market print seeds, the next higher print is a new post-market high
        let post = in_session(120, 12.0, MarketSession::PostMarket);
        assert!(harness.run(&mut detector, &post, Some(&open)).is_empty());
        let higher = in_session(180, 12.5, MarketSession::PostMarket);
        let events = harness.run(&mut detector, &higher, Some(&post));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PostMarketHigh);
        assert_eq!(events[0].prev_value, Some(12.0));
    }

    #[test]
    fn test_cleanup() {
        let mut detector = SessionDetector::new();
        let mut harness = Harness::new();
        harness.run(&mut detector, &in_session(0, 15.0, MarketSession::PreMarket), None);

        assert_eq!(detector.cleanup(&HashSet::new()), 1);
        assert!(detector.extremes("GME", MarketSession::PreMarket).is_none());
    }
}
