use serde::{Deserialize, Serialize};

use crate::domain::{Symbol, TradingDate, UtcMinute};

/// One validated minute OHLCV observation. Null prices arrive coerced to
/// `0.0` and null volume to `0`; a bar never carries partial fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub ts: UtcMinute,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// One row of the output schema, in sink column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub event_timestamp: UtcMinute,
    pub trading_date: TradingDate,
    pub ticker: Symbol,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Percent change in close vs the previous minute of the same ticker;
    /// 0.0 for the first bar or an undefined prior.
    pub minute_return: f64,
    pub trade_hour: u8,
    pub trade_minute: u8,
}
