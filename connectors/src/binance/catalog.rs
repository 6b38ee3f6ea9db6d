use crate::config::Market;
use common::{
    diagnostics::{Diagnostic, DiagnosticsSink},
    models::{Catalog, Instrument},
    Error, Result,
};
use serde_json::Value;
use tracing::info;

/// Build a [`Catalog`] from an `exchangeInfo` payload.
///
/// Bad entries never fail the load: an unusable notional filter falls back
/// to the default bounds and an entry without its identifying fields is
/// dropped, each with a diagnostic. Only a payload without a `symbols`
/// array is an error.
pub fn load(market: Market, raw: &Value, diagnostics: &dyn DiagnosticsSink) -> Result<Catalog> {
    let entries = raw
        .get("symbols")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::CatalogUnavailable("exchange info has no symbols array".to_string())
        })?;

    let catalog = entries
        .iter()
        .filter_map(|entry| match parse_instrument(market, entry, diagnostics) {
            Ok(instrument) => Some(instrument),
            Err(reason) => {
                diagnostics.report(Diagnostic::InstrumentSkipped {
                    symbol: entry.get("symbol").and_then(Value::as_str).map(str::to_string),
                    reason,
                });
                None
            }
        })
        .collect::<Catalog>();

    info!(
        "Loaded {} of {} {} instruments",
        catalog.len(),
        entries.len(),
        market
    );

    Ok(catalog)
}

fn parse_instrument(
    market: Market,
    entry: &Value,
    diagnostics: &dyn DiagnosticsSink,
) -> std::result::Result<Instrument, String> {
    let symbol = text(entry, "symbol")?;
    let base_asset = text(entry, "baseAsset")?;
    let quote_asset = text(entry, "quoteAsset")?;

    let (price_key, quantity_key) = match market {
        Market::Spot => ("quoteAssetPrecision", "baseAssetPrecision"),
        Market::UsdFutures => ("pricePrecision", "quantityPrecision"),
    };
    let price_decimals = precision(entry, price_key)?;
    let quantity_decimals = precision(entry, quantity_key)?;

    let (min_notional, max_notional) = notional_bounds(entry).unwrap_or_else(|reason| {
        diagnostics.report(Diagnostic::NotionalDefaulted {
            symbol: symbol.to_string(),
            reason,
            min_notional: Instrument::DEFAULT_MIN_NOTIONAL,
            max_notional: Instrument::DEFAULT_MAX_NOTIONAL,
        });
        (
            Instrument::DEFAULT_MIN_NOTIONAL,
            Instrument::DEFAULT_MAX_NOTIONAL,
        )
    });

    Ok(Instrument::new(
        market.exchange(),
        symbol,
        base_asset,
        quote_asset,
        price_decimals,
        quantity_decimals,
        min_notional,
        max_notional,
    ))
}

// Spot publishes {"filterType": "NOTIONAL", "minNotional", "maxNotional"};
// futures publishes {"filterType": "MIN_NOTIONAL", "notional"} with no maximum.
fn notional_bounds(entry: &Value) -> std::result::Result<(f64, f64), String> {
    let filters = entry
        .get("filters")
        .and_then(Value::as_array)
        .ok_or("no filters array")?;

    let filter = filters
        .iter()
        .find(|f| {
            matches!(
                f.get("filterType").and_then(Value::as_str),
                Some("NOTIONAL") | Some("MIN_NOTIONAL")
            )
        })
        .ok_or("no NOTIONAL or MIN_NOTIONAL filter")?;

    let min = filter
        .get("minNotional")
        .or_else(|| filter.get("notional"))
        .ok_or("notional filter has no minimum")?;
    let min = decimal(min).ok_or_else(|| format!("minimum notional {} is not numeric", min))?;

    let max = match filter.get("maxNotional") {
        Some(max) => {
            decimal(max).ok_or_else(|| format!("maximum notional {} is not numeric", max))?
        }
        None => Instrument::DEFAULT_MAX_NOTIONAL,
    };

    Ok((min, max))
}

fn text<'a>(entry: &'a Value, key: &str) -> std::result::Result<&'a str, String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {}", key))
}

fn precision(entry: &Value, key: &str) -> std::result::Result<u32, String> {
    entry
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok())
        .ok_or_else(|| format!("missing or invalid {}", key))
}

fn decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
