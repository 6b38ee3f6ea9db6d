pub mod binance;
pub mod clock;
pub mod config;
pub mod executor;
pub mod planner;
pub mod signing;
pub mod transport;

use async_trait::async_trait;
use common::{
    models::{Candle, Catalog, Exchange},
    Result,
};

pub use binance::BinanceConnector;
pub use config::{BinanceConfig, Market};
pub use planner::{RequestDescriptor, SubRequestPlan};

/// Trait defining the interface for exchange market-data clients
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Fetch every tradable instrument with its precision and notional rules
    async fn fetch_instrument_catalog(&self) -> Result<Catalog>;

    /// Fetch the candles described by `descriptor`, oldest first, paginating
    /// as needed
    async fn fetch_historical_candles(&self, descriptor: &RequestDescriptor) -> Result<Vec<Candle>>;
}
