// Core Type Definitions for the Market Event Engine
// Small shared enums used by snapshots, detectors and event records

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Enums
// ============================================================================

/// Trading session a snapshot was taken in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSession {
    PreMarket,
    MarketOpen,
    PostMarket,
    #[default]
    Closed,
}

impl MarketSession {
    /// Extended-hours sessions (pre-market and post-market)
    pub fn is_extended(&self) -> bool {
        matches!(self, MarketSession::PreMarket | MarketSession::PostMarket)
    }
}

impl fmt::Display for MarketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketSession::PreMarket => write!(f, "PRE_MARKET"),
            MarketSession::MarketOpen => write!(f, "MARKET_OPEN"),
            MarketSession::PostMarket => write!(f, "POST_MARKET"),
            MarketSession::Closed => write!(f, "CLOSED"),
        }
    }
}

impl std::str::FromStr for MarketSession {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PRE_MARKET" | "PREMARKET" | "PRE" => Ok(MarketSession::PreMarket),
            "MARKET_OPEN" | "OPEN" | "REGULAR" => Ok(MarketSession::MarketOpen),
            "POST_MARKET" | "POSTMARKET" | "POST" | "AFTER_HOURS" => Ok(MarketSession::PostMarket),
            "CLOSED" => Ok(MarketSession::Closed),
            _ => Err(format!("Invalid MarketSession: '{}'", s)),
        }
    }
}

/// Direction of a level crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    Up,
    Down,
}

impl CrossDirection {
    pub fn opposite(&self) -> Self {
        match self {
            CrossDirection::Up => CrossDirection::Down,
            CrossDirection::Down => CrossDirection::Up,
        }
    }
}

impl fmt::Display for CrossDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossDirection::Up => write!(f, "up"),
            CrossDirection::Down => write!(f, "down"),
        }
    }
}

/// Time source used for cooldown windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownClock {
    /// Wall clock at evaluation time (live behaviour)
    #[default]
    Wall,
    /// Timestamp of the snapshot being evaluated (deterministic replay)
    EventTime,
}

impl std::str::FromStr for CooldownClock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wall" | "wall_clock" => Ok(CooldownClock::Wall),
            "event_time" | "event" => Ok(CooldownClock::EventTime),
            _ => Err(format!("Invalid CooldownClock: '{}'. Expected 'wall' or 'event_time'", s)),
        }
    }
}
