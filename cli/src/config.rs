use common::{Error, Result};
use connectors::{BinanceConfig, Market};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;

/// Settings the binary runs with: the connector config from `BINANCE_*`
/// plus whatever the command line overrides.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub log_level: Level,
    pub binance: BinanceConfig,
}

/// Command-line values that take precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub market: Option<Market>,
    pub testnet: bool,
    pub log_level: Option<String>,
}

impl CliConfig {
    pub fn from_env(overrides: &Overrides) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    pub fn from_lookup<F>(lookup: F, overrides: &Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = match overrides
            .log_level
            .clone()
            .or_else(|| lookup("KLINEFETCH_LOG"))
        {
            Some(level) => level.trim().parse::<Level>().map_err(|_| {
                Error::ConfigError(format!(
                    "Unknown log level: {}. Use trace, debug, info, warn or error",
                    level
                ))
            })?,
            None => DEFAULT_LOG_LEVEL,
        };

        let mut binance = BinanceConfig::from_lookup(&lookup)?;
        if let Some(market) = overrides.market {
            binance.market = market;
        }
        if overrides.testnet {
            binance.testnet = true;
        }

        Ok(Self { log_level, binance })
    }
}
