use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Exchange API error while making {method} request to {endpoint}: {message} (status {status})")]
    ExchangeError {
        method: String,
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Parsing error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("Insufficient parameters: supply start and end, start and count, end and count, or count")]
    InsufficientParameters,

    #[error("Inverted window: start {start_ms} is after end {end_ms}")]
    InvertedWindow { start_ms: i64, end_ms: i64 },

    #[error("Invalid count: {0}")]
    InvalidCount(u32),

    #[error("Empty window: {start_ms}..{end_ms} holds no full {timeframe} candle")]
    EmptyWindow {
        start_ms: i64,
        end_ms: i64,
        timeframe: String,
    },

    #[error("Malformed candle: {0}")]
    MalformedCandle(String),

    #[error("Instrument catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Fetch failed at chunk {chunk_index} after {retrieved} candles (resume from {resume_from_ms}): {source}")]
    PartialFetchFailed {
        chunk_index: usize,
        retrieved: usize,
        resume_from_ms: i64,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Input errors are raised before any network call is made.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownTimeframe(_)
                | Error::InsufficientParameters
                | Error::InvertedWindow { .. }
                | Error::InvalidCount(_)
                | Error::EmptyWindow { .. }
        )
    }
}
