use crate::models::{Exchange, Timeframe};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// The exchange this candle is from
    pub exchange: Exchange,
    pub timeframe: Timeframe,
    /// Open time in seconds since the Unix epoch
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in base asset
    pub volume: f64,
    /// Trailing kline fields, when the exchange sent them
    pub detail: Option<KlineDetail>,
}

/// Auxiliary kline fields beyond OHLCV
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KlineDetail {
    /// Close time in milliseconds since the Unix epoch
    pub close_time_ms: i64,
    pub quote_volume: f64,
    pub trade_count: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl Candle {
    pub fn open_time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.open_time, 0).single()
    }

    /// Open time of the candle that directly follows this one.
    pub fn next_open_time(&self) -> i64 {
        self.open_time + self.timeframe.duration_seconds()
    }
}
