use crate::executor::CandleNormalizer;
use common::{
    models::{Candle, Exchange, KlineDetail, Timeframe},
    Error, Result,
};
use serde_json::Value;

// Binance returns an array of arrays:
// [
//   [
//     1499040000000,      // Open time
//     "0.01634790",       // Open
//     "0.80000000",       // High
//     "0.01575800",       // Low
//     "0.01577100",       // Close
//     "148976.11427815",  // Volume
//     1499644799999,      // Close time
//     "2434.19055334",    // Quote asset volume
//     308,                // Number of trades
//     "1756.87402397",    // Taker buy base asset volume
//     "28.46694368",      // Taker buy quote asset volume
//     "0"                 // Unused
//   ]
// ]

/// Normalizer for spot and USDⓈ-M futures klines, which share one layout.
#[derive(Debug, Clone, Copy)]
pub struct BinanceKlineNormalizer {
    exchange: Exchange,
}

impl BinanceKlineNormalizer {
    pub fn new(exchange: Exchange) -> Self {
        Self { exchange }
    }
}

impl CandleNormalizer for BinanceKlineNormalizer {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn normalize(&self, raw: &Value, timeframe: Timeframe) -> Result<Candle> {
        normalize(raw, self.exchange, timeframe)
    }
}

pub fn normalize(raw: &Value, exchange: Exchange, timeframe: Timeframe) -> Result<Candle> {
    let fields = raw
        .as_array()
        .ok_or_else(|| Error::MalformedCandle(format!("expected a kline array, got {}", raw)))?;

    let open_time_ms = integer(fields, 0, "open time")?;

    Ok(Candle {
        exchange,
        timeframe,
        open_time: open_time_ms.div_euclid(1000),
        open: decimal(fields, 1, "open")?,
        high: decimal(fields, 2, "high")?,
        low: decimal(fields, 3, "low")?,
        close: decimal(fields, 4, "close")?,
        volume: decimal(fields, 5, "volume")?,
        detail: detail(fields),
    })
}

fn detail(fields: &[Value]) -> Option<KlineDetail> {
    Some(KlineDetail {
        close_time_ms: integer(fields, 6, "close time").ok()?,
        quote_volume: decimal(fields, 7, "quote volume").ok()?,
        trade_count: fields.get(8)?.as_u64()?,
        taker_buy_base_volume: decimal(fields, 9, "taker buy base volume").ok()?,
        taker_buy_quote_volume: decimal(fields, 10, "taker buy quote volume").ok()?,
    })
}

fn integer(fields: &[Value], index: usize, name: &str) -> Result<i64> {
    let value = fields
        .get(index)
        .ok_or_else(|| Error::MalformedCandle(format!("missing {}", name)))?;

    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::MalformedCandle(format!("{} is not an integer: {}", name, value)))
}

fn decimal(fields: &[Value], index: usize, name: &str) -> Result<f64> {
    let value = fields
        .get(index)
        .ok_or_else(|| Error::MalformedCandle(format!("missing {}", name)))?;

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::MalformedCandle(format!("{} is not numeric: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_kline() -> Value {
        json!([
            1499040000000_i64,
            "0.01634790",
            "0.80000000",
            "0.01575800",
            "0.01577100",
            "148976.11427815",
            1499644799999_i64,
            "2434.19055334",
            308,
            "1756.87402397",
            "28.46694368",
            "0"
        ])
    }

    #[test]
    fn converts_open_time_to_seconds() {
        let candle = normalize(&full_kline(), Exchange::BinanceSpot, Timeframe::OneWeek).unwrap();

        assert_eq!(candle.open_time, 1499040000);
        assert_eq!(candle.exchange, Exchange::BinanceSpot);
        assert_eq!(candle.timeframe, Timeframe::OneWeek);
        assert!((candle.open - 0.0163479).abs() < 1e-12);
        assert!((candle.high - 0.8).abs() < 1e-12);
        assert!((candle.low - 0.015758).abs() < 1e-12);
        assert!((candle.close - 0.015771).abs() < 1e-12);
        assert!((candle.volume - 148976.11427815).abs() < 1e-6);
    }

    #[test]
    fn keeps_trailing_fields_as_detail() {
        let candle = normalize(&full_kline(), Exchange::BinanceUsdFutures, Timeframe::OneHour).unwrap();
        let detail = candle.detail.unwrap();

        assert_eq!(detail.close_time_ms, 1499644799999);
        assert_eq!(detail.trade_count, 308);
        assert!((detail.quote_volume - 2434.19055334).abs() < 1e-6);
        assert!((detail.taker_buy_base_volume - 1756.87402397).abs() < 1e-6);
        assert!((detail.taker_buy_quote_volume - 28.46694368).abs() < 1e-6);
    }

    #[test]
    fn ohlcv_only_record_has_no_detail() {
        let raw = json!([1499040000000_i64, 1.0, 2.0, 0.5, 1.5, 10]);
        let candle = normalize(&raw, Exchange::BinanceSpot, Timeframe::OneMinute).unwrap();

        assert_eq!(candle.open, 1.0);
        assert_eq!(candle.volume, 10.0);
        assert!(candle.detail.is_none());
    }

    #[test]
    fn missing_or_non_numeric_fields_are_malformed() {
        let cases = [
            json!({"open": "1"}),
            json!([]),
            json!(["yesterday", "1", "2", "0.5", "1.5", "10"]),
            json!([1499040000000_i64, "1", "2", "0.5", "1.5"]),
            json!([1499040000000_i64, "1", "two", "0.5", "1.5", "10"]),
            json!([1499040000000_i64, "1", "2", null, "1.5", "10"]),
            json!([1499040000000_i64, "NaN", "2", "0.5", "1.5", "10"]),
        ];

        for raw in cases {
            match normalize(&raw, Exchange::BinanceSpot, Timeframe::OneHour) {
                Err(Error::MalformedCandle(_)) => {}
                other => panic!("expected MalformedCandle for {raw}, got {other:?}"),
            }
        }
    }
}
