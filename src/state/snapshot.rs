// Market Snapshot - Immutable per-symbol, per-tick state record
// Produced upstream (bar aggregation, indicator computation, scanner enrichment)

use crate::core::error::SnapshotError;
use crate::core::types::MarketSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tick of market state for one symbol.
///
/// Optional fields are `None` when the producer has not computed them; a
/// detector must never read `None` as zero. Intraday extremes already include
/// the current price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    // Identity
    pub symbol: String,
    pub timestamp: DateTime<Utc>,

    // Required
    pub price: f64,
    /// Cumulative day volume (shares)
    pub volume: f64,

    // Realtime
    /// Volume of the current per-minute bar
    pub minute_volume: Option<f64>,
    pub vwap: Option<f64>,

    // Intraday extremes (inclusive of the current price)
    pub intraday_high: Option<f64>,
    pub intraday_low: Option<f64>,

    // Reference prices
    pub prev_close: Option<f64>,
    pub open_price: Option<f64>,
    pub prev_day_high: Option<f64>,
    pub prev_day_low: Option<f64>,

    // Rolling-window price changes (%)
    pub chg_1min: Option<f64>,
    pub chg_5min: Option<f64>,
    pub chg_10min: Option<f64>,
    pub chg_15min: Option<f64>,
    pub chg_30min: Option<f64>,

    // Rolling-window volumes (shares)
    pub vol_1min: Option<f64>,
    pub vol_5min: Option<f64>,
    pub vol_10min: Option<f64>,
    pub vol_15min: Option<f64>,
    pub vol_30min: Option<f64>,

    pub rvol: Option<f64>,
    /// Daily change vs previous close (%), derived from `prev_close` when absent
    pub change_percent: Option<f64>,
    /// Z-score of the trade count against its historical baseline
    pub trades_z_score: Option<f64>,

    // Moving averages
    pub sma_8: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_9: Option<f64>,
    pub ema_20: Option<f64>,
    pub ema_50: Option<f64>,
    /// SMA(200) on the daily timeframe
    pub daily_sma_200: Option<f64>,

    // Bollinger
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,

    // Oscillators
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub atr_percent: Option<f64>,

    // 52-week
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,

    // Fundamentals
    pub market_cap: Option<f64>,
    pub float_shares: Option<f64>,
    pub security_type: Option<String>,
    pub sector: Option<String>,

    pub market_session: MarketSession,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            volume,
            ..Self::default()
        }
    }

    /// Check the required fields. Optional fields are never validated here.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.symbol.is_empty() {
            return Err(SnapshotError::EmptySymbol);
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(SnapshotError::InvalidPrice { symbol: self.symbol.clone(), price: self.price });
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(SnapshotError::InvalidVolume { symbol: self.symbol.clone(), volume: self.volume });
        }
        Ok(())
    }

    /// Gap between today's open and the previous close (%)
    pub fn gap_percent(&self) -> Option<f64> {
        match (self.open_price, self.prev_close) {
            (Some(open), Some(prev_close)) if prev_close > 0.0 => {
                Some((open - prev_close) / prev_close * 100.0)
            }
            _ => None,
        }
    }

    /// Daily change (%): the supplied field, else derived from `prev_close`
    pub fn daily_change_percent(&self) -> Option<f64> {
        self.change_percent.or_else(|| match self.prev_close {
            Some(prev_close) if prev_close > 0.0 => Some((self.price - prev_close) / prev_close * 100.0),
            _ => None,
        })
    }

    pub fn has_volume(&self, floor: f64) -> bool {
        self.volume >= floor
    }
}
