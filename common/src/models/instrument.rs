use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exchange identifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Exchange {
    #[serde(rename = "binance")]
    BinanceSpot,
    #[serde(rename = "binance_futures")]
    BinanceUsdFutures,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exchange::BinanceSpot => write!(f, "binance"),
            Exchange::BinanceUsdFutures => write!(f, "binance_futures"),
        }
    }
}

/// Trading rules for one symbol, as published by the exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub exchange: Exchange,
    /// Exchange symbol (e.g., "BTCUSDT"), unique within a catalog
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub price_decimals: u32,
    pub quantity_decimals: u32,
    /// Smallest price increment, `10^-price_decimals`
    pub tick_size: f64,
    /// Smallest quantity increment, `10^-quantity_decimals`
    pub lot_size: f64,
    pub min_notional: f64,
    pub max_notional: f64,
}

impl Instrument {
    pub const DEFAULT_MIN_NOTIONAL: f64 = 5.0;
    pub const DEFAULT_MAX_NOTIONAL: f64 = 5000.0;

    /// Build an instrument, deriving tick and lot size from the decimals.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        exchange: Exchange,
        symbol: impl Into<String>,
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        price_decimals: u32,
        quantity_decimals: u32,
        min_notional: f64,
        max_notional: f64,
    ) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
            price_decimals,
            quantity_decimals,
            tick_size: increment(price_decimals),
            lot_size: increment(quantity_decimals),
            min_notional,
            max_notional,
        }
    }

    /// Whether an order of `price * quantity` falls inside the notional bounds.
    pub fn accepts_notional(&self, price: f64, quantity: f64) -> bool {
        let notional = price * quantity;
        notional >= self.min_notional && notional <= self.max_notional
    }
}

/// Snapshot of an exchange's instruments keyed by symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    instruments: HashMap<String, Instrument>,
}

impl Catalog {
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    /// Symbols in lexical order
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.instruments.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Instruments quoted in `quote` (e.g., "USDC"), ordered by symbol
    pub fn quoted_in(&self, quote: &str) -> Vec<&Instrument> {
        let mut matches: Vec<&Instrument> = self
            .instruments
            .values()
            .filter(|i| i.quote_asset.eq_ignore_ascii_case(quote))
            .collect();
        matches.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        matches
    }
}

impl FromIterator<Instrument> for Catalog {
    fn from_iter<I: IntoIterator<Item = Instrument>>(iter: I) -> Self {
        Self {
            instruments: iter
                .into_iter()
                .map(|instrument| (instrument.symbol.clone(), instrument))
                .collect(),
        }
    }
}

fn increment(decimals: u32) -> f64 {
    10f64.powi(-(decimals as i32))
}
