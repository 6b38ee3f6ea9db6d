use common::{models::Exchange, Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Which Binance API family to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "spot")]
    Spot,
    #[serde(rename = "futures")]
    UsdFutures,
}

impl Market {
    pub fn exchange(self) -> Exchange {
        match self {
            Market::Spot => Exchange::BinanceSpot,
            Market::UsdFutures => Exchange::BinanceUsdFutures,
        }
    }

    pub fn rest_base_url(self, testnet: bool) -> &'static str {
        match (self, testnet) {
            (Market::Spot, false) => "https://api.binance.com",
            (Market::Spot, true) => "https://testnet.binance.vision",
            (Market::UsdFutures, false) => "https://fapi.binance.com",
            (Market::UsdFutures, true) => "https://testnet.binancefuture.com",
        }
    }

    pub fn exchange_info_path(self) -> &'static str {
        match self {
            Market::Spot => "/api/v3/exchangeInfo",
            Market::UsdFutures => "/fapi/v1/exchangeInfo",
        }
    }

    pub fn klines_path(self) -> &'static str {
        match self {
            Market::Spot => "/api/v3/klines",
            Market::UsdFutures => "/fapi/v1/klines",
        }
    }
}

impl FromStr for Market {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Ok(Market::Spot),
            "futures" | "usdm" => Ok(Market::UsdFutures),
            other => Err(Error::ConfigError(format!(
                "Unknown market: {}. Supported markets: spot, futures",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Spot => write!(f, "spot"),
            Market::UsdFutures => write!(f, "futures"),
        }
    }
}

/// Connection settings for a Binance connector
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub market: Market,
    /// Use the testnet endpoints instead of production
    pub testnet: bool,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Overrides the base URL derived from `market` and `testnet`
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            market: Market::Spot,
            testnet: false,
            api_key: None,
            api_secret: None,
            base_url: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl BinanceConfig {
    /// Create a configuration from `BINANCE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let market = match lookup("BINANCE_MARKET") {
            Some(value) => value.parse()?,
            None => defaults.market,
        };

        let testnet = match lookup("BINANCE_TESTNET") {
            Some(value) => parse_flag("BINANCE_TESTNET", &value)?,
            None => defaults.testnet,
        };

        let timeout = match lookup("BINANCE_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| {
                    Error::ConfigError(format!("BINANCE_TIMEOUT_SECS '{}': {}", value, e))
                })?,
            None => defaults.timeout,
        };

        Ok(Self {
            market,
            testnet,
            api_key: lookup("BINANCE_API_KEY").filter(|v| !v.is_empty()),
            api_secret: lookup("BINANCE_API_SECRET").filter(|v| !v.is_empty()),
            base_url: lookup("BINANCE_BASE_URL").filter(|v| !v.is_empty()),
            timeout,
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.market.rest_base_url(self.testnet).to_string())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_production_spot() {
        let config = BinanceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.market, Market::Spot);
        assert!(!config.testnet);
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url(), "https://api.binance.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn futures_testnet_from_env() {
        let config = BinanceConfig::from_lookup(lookup(&[
            ("BINANCE_MARKET", "futures"),
            ("BINANCE_TESTNET", "true"),
            ("BINANCE_API_KEY", "key"),
            ("BINANCE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.market, Market::UsdFutures);
        assert_eq!(config.base_url(), "https://testnet.binancefuture.com");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.market.klines_path(), "/fapi/v1/klines");
    }

    #[test]
    fn base_url_override_wins() {
        let config = BinanceConfig::from_lookup(lookup(&[
            ("BINANCE_TESTNET", "1"),
            ("BINANCE_BASE_URL", "http://127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn malformed_values_are_config_errors() {
        for vars in [
            [("BINANCE_MARKET", "options")],
            [("BINANCE_TESTNET", "maybe")],
            [("BINANCE_TIMEOUT_SECS", "ten")],
        ] {
            match BinanceConfig::from_lookup(lookup(&vars)) {
                Err(Error::ConfigError(_)) => {}
                other => panic!("expected ConfigError for {:?}, got {:?}", vars, other),
            }
        }
    }
}
