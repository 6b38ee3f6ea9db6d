pub mod catalog;
pub mod kline;

use crate::clock::{Clock, SystemClock};
use crate::config::{BinanceConfig, Market};
use crate::executor::Executor;
use crate::planner::{self, RequestDescriptor};
use crate::transport::{send_checked, HttpRequest, HttpTransport, ReqwestTransport};
use crate::ExchangeConnector;
use async_trait::async_trait;
use common::{
    diagnostics::{DiagnosticsSink, TracingSink},
    models::{Candle, Catalog, Exchange, Instrument},
    Error, Result,
};
use kline::BinanceKlineNormalizer;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Binance spot or USDⓈ-M futures market-data client
pub struct BinanceConnector {
    market: Market,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    catalog: Catalog,
}

impl BinanceConnector {
    /// Build a connector with the reqwest transport and system clock. The
    /// catalog starts empty; see [`BinanceConnector::connect`].
    pub fn new(config: &BinanceConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let transport = ReqwestTransport::new(config, clock.clone())?;

        Ok(Self::with_parts(
            config.market,
            Arc::new(transport),
            clock,
            Arc::new(TracingSink),
        ))
    }

    pub fn with_parts(
        market: Market,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            market,
            transport,
            clock,
            diagnostics,
            catalog: Catalog::default(),
        }
    }

    /// Build a connector and load the instrument catalog.
    pub async fn connect(config: &BinanceConfig) -> Result<Self> {
        let mut connector = Self::new(config)?;
        connector.refresh_catalog().await?;
        Ok(connector)
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// Catalog from the last successful refresh
    pub fn instruments(&self) -> &Catalog {
        &self.catalog
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.catalog.get(symbol)
    }

    /// Re-fetch the catalog. The previous one is kept if the fetch fails.
    pub async fn refresh_catalog(&mut self) -> Result<&Catalog> {
        self.catalog = self.fetch_instrument_catalog().await?;
        Ok(&self.catalog)
    }
}

#[async_trait]
impl ExchangeConnector for BinanceConnector {
    fn exchange(&self) -> Exchange {
        self.market.exchange()
    }

    async fn fetch_instrument_catalog(&self) -> Result<Catalog> {
        let request = HttpRequest::get(self.market.exchange_info_path());
        debug!("Fetching exchange info from Binance {}", self.market);

        let raw = send_checked(self.transport.as_ref(), &request)
            .await
            .map_err(|e| {
                error!("Error while getting {} instruments: {}", self.market, e);
                Error::CatalogUnavailable(e.to_string())
            })?;

        catalog::load(self.market, &raw, self.diagnostics.as_ref())
    }

    async fn fetch_historical_candles(&self, descriptor: &RequestDescriptor) -> Result<Vec<Candle>> {
        let plan = planner::plan(descriptor, self.clock.now())?;
        let symbol = descriptor.symbol.to_uppercase();

        info!(
            "Fetching {} {} candles for {} in {} requests",
            plan.total(),
            plan.timeframe,
            symbol,
            plan.chunks.len()
        );

        let normalizer = BinanceKlineNormalizer::new(self.exchange());
        Executor::new(
            self.transport.as_ref(),
            &normalizer,
            self.diagnostics.as_ref(),
            self.market.klines_path(),
        )
        .execute(&plan, &symbol)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::transport::testing::{ScriptedTransport, SyntheticKlines};
    use crate::transport::HttpResponse;
    use chrono::{TimeZone, Utc};
    use common::diagnostics::CollectingSink;
    use common::models::Timeframe;
    use serde_json::json;

    fn connector(market: Market, transport: Arc<dyn HttpTransport>) -> BinanceConnector {
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        BinanceConnector::with_parts(
            market,
            transport,
            Arc::new(FixedClock(now)),
            Arc::new(CollectingSink::new()),
        )
    }

    #[tokio::test]
    async fn input_errors_skip_the_network() {
        let transport = Arc::new(SyntheticKlines::new(60_000));
        let connector = connector(Market::Spot, transport.clone());

        let descriptor = RequestDescriptor::new("BTCUSDT", Timeframe::OneMinute);
        let err = connector.fetch_historical_candles(&descriptor).await.unwrap_err();

        assert!(matches!(err, Error::InsufficientParameters));
        assert!(err.is_input_error());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn futures_candles_use_fapi_path_and_uppercase_symbol() {
        let transport = Arc::new(SyntheticKlines::new(Timeframe::OneHour.duration_millis()));
        let connector = connector(Market::UsdFutures, transport.clone());

        let descriptor = RequestDescriptor::new("btcusdt", Timeframe::OneHour).count(1500);
        let candles = connector.fetch_historical_candles(&descriptor).await.unwrap();

        assert_eq!(candles.len(), 1500);
        assert!(candles.iter().all(|c| c.exchange == Exchange::BinanceUsdFutures));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.path == "/fapi/v1/klines"));
        assert!(calls.iter().all(|c| c.query_value("symbol") == Some("BTCUSDT")));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_catalog() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok(json!({"symbols": [{
                "symbol": "BTCUSDT", "baseAsset": "BTC", "quoteAsset": "USDT",
                "baseAssetPrecision": 8, "quoteAssetPrecision": 8,
                "filters": [{"filterType": "NOTIONAL", "minNotional": "5", "maxNotional": "100"}]
            }]})),
            Ok(HttpResponse {
                status: 503,
                body: json!({"code": -1008, "msg": "Server is currently overloaded"}),
            }),
        ]));
        let mut connector = connector(Market::Spot, transport.clone());

        assert_eq!(connector.refresh_catalog().await.unwrap().len(), 1);

        let err = connector.refresh_catalog().await.unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
        assert_eq!(connector.instrument("BTCUSDT").unwrap().max_notional, 100.0);

        let calls = transport.calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.path == "/api/v3/exchangeInfo"));
    }
}
