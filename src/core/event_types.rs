// Event Type Catalog - Every event the detection core can emit
// Names, categories and default cooldowns in one table

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Detector family an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Price,
    Volume,
    Momentum,
    Pullback,
    Gap,
    MovingAverage,
    Bollinger,
    DailyLevels,
    Macd,
    Stochastic,
    OpeningRange,
    Consolidation,
    ConfirmedCross,
    Session,
}

macro_rules! event_catalog {
    ($( $variant:ident => ($name:literal, $category:ident, $cooldown:literal), )+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventType {
            $( $variant, )+
        }

        impl EventType {
            pub const ALL: &'static [EventType] = &[ $( EventType::$variant, )+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( EventType::$variant => $name, )+
                }
            }

            pub fn category(&self) -> EventCategory {
                match self {
                    $( EventType::$variant => EventCategory::$category, )+
                }
            }

            /// Minimum seconds between two firings for the same symbol
            pub fn default_cooldown_secs(&self) -> u64 {
                match self {
                    $( EventType::$variant => $cooldown, )+
                }
            }
        }
    };
}

event_catalog! {
    // Price (8)
    NewHigh => ("NEW_HIGH", Price, 30),
    NewLow => ("NEW_LOW", Price, 30),
    CrossedAboveOpen => ("CROSSED_ABOVE_OPEN", Price, 120),
    CrossedBelowOpen => ("CROSSED_BELOW_OPEN", Price, 120),
    CrossedAbovePrevClose => ("CROSSED_ABOVE_PREV_CLOSE", Price, 120),
    CrossedBelowPrevClose => ("CROSSED_BELOW_PREV_CLOSE", Price, 120),
    VwapCrossAbove => ("VWAP_CROSS_ABOVE", Price, 60),
    VwapCrossBelow => ("VWAP_CROSS_BELOW", Price, 60),

    // Volume (5)
    RvolSpike => ("RVOL_SPIKE", Volume, 300),
    VolumeSurge => ("VOLUME_SURGE", Volume, 600),
    VolumeSpike1Min => ("VOLUME_SPIKE_1MIN", Volume, 120),
    BlockTrade => ("BLOCK_TRADE", Volume, 60),
    UnusualPrints => ("UNUSUAL_PRINTS", Volume, 300),

    // Momentum (6)
    RunningUp => ("RUNNING_UP", Momentum, 120),
    RunningDown => ("RUNNING_DOWN", Momentum, 120),
    PercentUp5 => ("PERCENT_UP_5", Momentum, 300),
    PercentDown5 => ("PERCENT_DOWN_5", Momentum, 300),
    PercentUp10 => ("PERCENT_UP_10", Momentum, 300),
    PercentDown10 => ("PERCENT_DOWN_10", Momentum, 300),

    // Pullback (12): full range, close-anchored, open-anchored x 25% / 75% x from high / from low
    Pullback25FromHigh => ("PULLBACK_25_FROM_HIGH", Pullback, 300),
    Pullback75FromHigh => ("PULLBACK_75_FROM_HIGH", Pullback, 300),
    Pullback25FromLow => ("PULLBACK_25_FROM_LOW", Pullback, 300),
    Pullback75FromLow => ("PULLBACK_75_FROM_LOW", Pullback, 300),
    Pullback25FromHighClose => ("PULLBACK_25_FROM_HIGH_CLOSE", Pullback, 300),
    Pullback75FromHighClose => ("PULLBACK_75_FROM_HIGH_CLOSE", Pullback, 300),
    Pullback25FromLowClose => ("PULLBACK_25_FROM_LOW_CLOSE", Pullback, 300),
    Pullback75FromLowClose => ("PULLBACK_75_FROM_LOW_CLOSE", Pullback, 300),
    Pullback25FromHighOpen => ("PULLBACK_25_FROM_HIGH_OPEN", Pullback, 300),
    Pullback75FromHighOpen => ("PULLBACK_75_FROM_HIGH_OPEN", Pullback, 300),
    Pullback25FromLowOpen => ("PULLBACK_25_FROM_LOW_OPEN", Pullback, 300),
    Pullback75FromLowOpen => ("PULLBACK_75_FROM_LOW_OPEN", Pullback, 300),

    // Gap (2)
    GapUpReversal => ("GAP_UP_REVERSAL", Gap, 600),
    GapDownReversal => ("GAP_DOWN_REVERSAL", Gap, 600),

    // Moving averages (14)
    CrossedAboveSma8 => ("CROSSED_ABOVE_SMA8", MovingAverage, 120),
    CrossedBelowSma8 => ("CROSSED_BELOW_SMA8", MovingAverage, 120),
    CrossedAboveSma20 => ("CROSSED_ABOVE_SMA20", MovingAverage, 180),
    CrossedBelowSma20 => ("CROSSED_BELOW_SMA20", MovingAverage, 180),
    CrossedAboveEma20 => ("CROSSED_ABOVE_EMA20", MovingAverage, 180),
    CrossedBelowEma20 => ("CROSSED_BELOW_EMA20", MovingAverage, 180),
    CrossedAboveSma50 => ("CROSSED_ABOVE_SMA50", MovingAverage, 300),
    CrossedBelowSma50 => ("CROSSED_BELOW_SMA50", MovingAverage, 300),
    CrossedAboveEma50 => ("CROSSED_ABOVE_EMA50", MovingAverage, 300),
    CrossedBelowEma50 => ("CROSSED_BELOW_EMA50", MovingAverage, 300),
    CrossedAboveSma200 => ("CROSSED_ABOVE_SMA200", MovingAverage, 600),
    CrossedBelowSma200 => ("CROSSED_BELOW_SMA200", MovingAverage, 600),
    Sma8CrossAboveSma20 => ("SMA8_CROSS_ABOVE_SMA20", MovingAverage, 300),
    Sma8CrossBelowSma20 => ("SMA8_CROSS_BELOW_SMA20", MovingAverage, 300),

    // Bollinger (2)
    BbUpperBreakout => ("BB_UPPER_BREAKOUT", Bollinger, 120),
    BbLowerBreakdown => ("BB_LOWER_BREAKDOWN", Bollinger, 120),

    // Daily levels and multi-window momentum (8)
    CrossedAbovePrevDayHigh => ("CROSSED_ABOVE_PREV_DAY_HIGH", DailyLevels, 600),
    CrossedBelowPrevDayLow => ("CROSSED_BELOW_PREV_DAY_LOW", DailyLevels, 600),
    FalseGapUpRetracement => ("FALSE_GAP_UP_RETRACEMENT", DailyLevels, 600),
    FalseGapDownRetracement => ("FALSE_GAP_DOWN_RETRACEMENT", DailyLevels, 600),
    RunningUpSustained => ("RUNNING_UP_SUSTAINED", DailyLevels, 300),
    RunningDownSustained => ("RUNNING_DOWN_SUSTAINED", DailyLevels, 300),
    RunningUpConfirmed => ("RUNNING_UP_CONFIRMED", DailyLevels, 300),
    RunningDownConfirmed => ("RUNNING_DOWN_CONFIRMED", DailyLevels, 300),

    // MACD (4)
    MacdBullishCross => ("MACD_BULLISH_CROSS", Macd, 300),
    MacdBearishCross => ("MACD_BEARISH_CROSS", Macd, 300),
    MacdZeroCrossUp => ("MACD_ZERO_CROSS_UP", Macd, 600),
    MacdZeroCrossDown => ("MACD_ZERO_CROSS_DOWN", Macd, 600),

    // Stochastic (4)
    StochBullishCross => ("STOCH_BULLISH_CROSS", Stochastic, 300),
    StochBearishCross => ("STOCH_BEARISH_CROSS", Stochastic, 300),
    StochOversold => ("STOCH_OVERSOLD", Stochastic, 600),
    StochOverbought => ("STOCH_OVERBOUGHT", Stochastic, 600),

    // Opening range (2)
    OrbBreakoutUp => ("ORB_BREAKOUT_UP", OpeningRange, 600),
    OrbBreakoutDown => ("ORB_BREAKOUT_DOWN", OpeningRange, 600),

    // Consolidation (2)
    ConsolidationBreakoutUp => ("CONSOLIDATION_BREAKOUT_UP", Consolidation, 600),
    ConsolidationBreakoutDown => ("CONSOLIDATION_BREAKOUT_DOWN", Consolidation, 600),

    // Confirmed crosses (4)
    CrossedAboveOpenConfirmed => ("CROSSED_ABOVE_OPEN_CONFIRMED", ConfirmedCross, 300),
    CrossedBelowOpenConfirmed => ("CROSSED_BELOW_OPEN_CONFIRMED", ConfirmedCross, 300),
    CrossedAbovePrevCloseConfirmed => ("CROSSED_ABOVE_PREV_CLOSE_CONFIRMED", ConfirmedCross, 300),
    CrossedBelowPrevCloseConfirmed => ("CROSSED_BELOW_PREV_CLOSE_CONFIRMED", ConfirmedCross, 300),

    // Extended-hours session extremes (4)
    PreMarketHigh => ("PRE_MARKET_HIGH", Session, 30),
    PreMarketLow => ("PRE_MARKET_LOW", Session, 30),
    PostMarketHigh => ("POST_MARKET_HIGH", Session, 30),
    PostMarketLow => ("POST_MARKET_LOW", Session, 30),
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_uppercase();
        EventType::ALL
            .iter()
            .copied()
            .find(|event_type| event_type.as_str() == wanted)
            .ok_or_else(|| format!("Unknown event type: '{}'", s))
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
