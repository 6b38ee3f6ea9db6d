mod config;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use clap::{Parser, Subcommand};
use common::{
    models::{Candle, Instrument},
    Error,
};
use config::{CliConfig, Overrides};
use connectors::{BinanceConnector, ExchangeConnector, Market, RequestDescriptor};
use tracing::{error, info};

/// Binance historical candles and instrument rules
#[derive(Debug, Parser)]
#[command(name = "klinefetch", version, about)]
struct Cli {
    /// spot or futures (defaults to BINANCE_MARKET, then spot)
    #[arg(long, global = true)]
    market: Option<Market>,

    /// Use the testnet endpoints
    #[arg(long, global = true)]
    testnet: bool,

    /// trace, debug, info, warn or error (defaults to KLINEFETCH_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch historical candles, paginating past the 1000-candle limit
    Candles {
        symbol: String,
        /// Binance interval label, e.g. 1m, 1h, 1d, 1M
        timeframe: String,
        /// Window start, RFC 3339
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Window end, RFC 3339
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Number of candles
        #[arg(long)]
        count: Option<u32>,
    },
    /// List tradable instruments with their precision and notional limits
    Instruments {
        /// Only symbols quoted in this asset
        #[arg(long)]
        quote: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = CliConfig::from_env(&Overrides {
        market: cli.market,
        testnet: cli.testnet,
        log_level: cli.log_level.clone(),
    })
    .map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Using Binance {} at {}",
        config.binance.market,
        config.binance.base_url()
    );

    let result = match cli.command {
        Command::Candles {
            symbol,
            timeframe,
            start,
            end,
            count,
        } => {
            let mut descriptor = RequestDescriptor::parse(symbol, &timeframe)?;
            descriptor.start_time = start;
            descriptor.end_time = end;
            descriptor.count = count;
            candles(&config, &descriptor, cli.json).await
        }
        Command::Instruments { quote } => instruments(&config, quote.as_deref(), cli.json).await,
    };

    if let Err(Error::PartialFetchFailed {
        retrieved,
        resume_from_ms,
        ..
    }) = &result
    {
        error!(
            "Fetched {} candles before failing; resume with --start {}",
            retrieved,
            rfc3339_millis(*resume_from_ms)
        );
    }

    result?;
    Ok(())
}

async fn candles(
    config: &CliConfig,
    descriptor: &RequestDescriptor,
    json: bool,
) -> common::Result<()> {
    let connector = BinanceConnector::new(&config.binance)?;
    let candles = connector.fetch_historical_candles(descriptor).await?;

    if json {
        println!("{}", to_json(&candles)?);
    } else {
        candles.iter().for_each(|candle| println!("{}", candle_line(candle)));
    }
    Ok(())
}

async fn instruments(config: &CliConfig, quote: Option<&str>, json: bool) -> common::Result<()> {
    let connector = BinanceConnector::connect(&config.binance).await?;
    let catalog = connector.instruments();

    let listed: Vec<&Instrument> = match quote {
        Some(quote) => catalog.quoted_in(quote),
        None => catalog
            .symbols()
            .into_iter()
            .filter_map(|symbol| catalog.get(symbol))
            .collect(),
    };

    if json {
        println!("{}", to_json(&listed)?);
    } else {
        listed
            .iter()
            .for_each(|instrument| println!("{}", instrument_line(instrument)));
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> common::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::ParseError(e.to_string()))
}

fn rfc3339_millis(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}

fn candle_line(candle: &Candle) -> String {
    let open_time = candle
        .open_time_utc()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| candle.open_time.to_string());

    format!(
        "{} o={} h={} l={} c={} v={}",
        open_time, candle.open, candle.high, candle.low, candle.close, candle.volume
    )
}

fn instrument_line(instrument: &Instrument) -> String {
    format!(
        "{:<16} {:>6}/{:<6} price_dp={} qty_dp={} notional=[{}, {}]",
        instrument.symbol,
        instrument.base_asset,
        instrument.quote_asset,
        instrument.price_decimals,
        instrument.quantity_decimals,
        instrument.min_notional,
        instrument.max_notional
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use common::models::{Exchange, Timeframe};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_candles_with_global_flags() {
        let cli = Cli::try_parse_from([
            "klinefetch",
            "candles",
            "BTCUSDT",
            "1h",
            "--start",
            "2024-01-01T00:00:00Z",
            "--count",
            "2500",
            "--market",
            "futures",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.market, Some(Market::UsdFutures));
        assert!(cli.json);
        match cli.command {
            Command::Candles {
                symbol,
                timeframe,
                start,
                end,
                count,
            } => {
                assert_eq!(symbol, "BTCUSDT");
                assert_eq!(timeframe, "1h");
                assert_eq!(start.unwrap().timestamp(), 1_704_067_200);
                assert!(end.is_none());
                assert_eq!(count, Some(2500));
            }
            other => panic!("expected candles, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_market() {
        assert!(Cli::try_parse_from(["klinefetch", "--market", "margin", "instruments"]).is_err());
    }

    #[test]
    fn candle_line_shows_rfc3339_open_time() {
        let candle = Candle {
            exchange: Exchange::BinanceSpot,
            timeframe: Timeframe::OneHour,
            open_time: 1_704_067_200,
            open: 1.5,
            high: 2.0,
            low: 1.0,
            close: 1.75,
            volume: 10.0,
            detail: None,
        };

        assert_eq!(
            candle_line(&candle),
            "2024-01-01T00:00:00Z o=1.5 h=2 l=1 c=1.75 v=10"
        );
    }

    #[test]
    fn resume_point_formats_as_rfc3339() {
        assert_eq!(rfc3339_millis(1_704_067_200_000), "2024-01-01T00:00:00Z");
    }
}
