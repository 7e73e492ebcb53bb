// Error Types for the Market Event Engine
// Nothing here is user-visible: the engine logs these and degrades to "no event"

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Rejection of a snapshot before any detector sees it
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot has empty symbol")]
    EmptySymbol,
    #[error("symbol mismatch: expected {expected}, snapshot carries {actual}")]
    SymbolMismatch { expected: String, actual: String },
    #[error("invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: String, price: f64 },
    #[error("invalid volume for {symbol}: {volume}")]
    InvalidVolume { symbol: String, volume: f64 },
    #[error("out-of-order snapshot for {symbol}: {current} is older than {previous}")]
    OutOfOrder { symbol: String, previous: DateTime<Utc>, current: DateTime<Utc> },
}

/// Failure inside a single detector for a single tick
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("invalid {field} for {symbol}: {value}")]
    InvalidInput { symbol: String, field: &'static str, value: f64 },
    #[error("market clock conversion failed for {0}")]
    MarketClock(String),
    #[error("detector invariant violated: {0}")]
    Internal(String),
}
