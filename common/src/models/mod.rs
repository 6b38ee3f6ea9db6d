pub mod candle;
pub mod instrument;
pub mod timeframe;

pub use candle::{Candle, KlineDetail};
pub use instrument::{Catalog, Exchange, Instrument};
pub use timeframe::{duration_seconds, Timeframe};
