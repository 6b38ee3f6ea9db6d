use crate::planner::SubRequestPlan;
use crate::transport::{send_checked, HttpRequest, HttpTransport};
use common::{
    diagnostics::{Diagnostic, DiagnosticsSink},
    models::{Candle, Exchange, Timeframe},
    Error, Result,
};
use serde_json::Value;
use tracing::{debug, error, info};

/// Turns one raw kline record into a [`Candle`]. Each exchange owns its
/// record layout.
pub trait CandleNormalizer: Send + Sync {
    fn exchange(&self) -> Exchange;

    fn normalize(&self, raw: &Value, timeframe: Timeframe) -> Result<Candle>;
}

/// Runs a [`SubRequestPlan`] one chunk at a time.
///
/// Chunks are awaited strictly in order, never concurrently, so results can
/// be appended without sorting and upstream request weight is spent serially.
pub struct Executor<'a> {
    transport: &'a dyn HttpTransport,
    normalizer: &'a dyn CandleNormalizer,
    diagnostics: &'a dyn DiagnosticsSink,
    klines_path: &'a str,
}

impl<'a> Executor<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        normalizer: &'a dyn CandleNormalizer,
        diagnostics: &'a dyn DiagnosticsSink,
        klines_path: &'a str,
    ) -> Self {
        Self {
            transport,
            normalizer,
            diagnostics,
            klines_path,
        }
    }

    pub async fn execute(&self, plan: &SubRequestPlan, symbol: &str) -> Result<Vec<Candle>> {
        let mut candles = Vec::new();
        let mut skipped = 0usize;
        let mut first_error: Option<Error> = None;

        for chunk in &plan.chunks {
            let request = HttpRequest::get(self.klines_path)
                .query("symbol", symbol)
                .query("interval", plan.timeframe)
                .query("startTime", chunk.start_time_ms)
                .query("limit", chunk.limit);

            debug!(
                "Fetching chunk {}/{} for {}: startTime={} limit={}",
                chunk.index + 1,
                plan.chunks.len(),
                symbol,
                chunk.start_time_ms,
                chunk.limit
            );

            let records = match self.fetch_records(&request).await {
                Ok(records) => records,
                Err(source) => {
                    error!(
                        "Klines chunk {} for {} failed after {} candles: {}",
                        chunk.index,
                        symbol,
                        candles.len(),
                        source
                    );
                    if let Some(err) = &first_error {
                        self.report_malformed(symbol, skipped, err);
                    }
                    return Err(Error::PartialFetchFailed {
                        chunk_index: chunk.index,
                        retrieved: candles.len(),
                        resume_from_ms: chunk.start_time_ms,
                        source: Box::new(source),
                    });
                }
            };

            if records.len() < chunk.limit as usize {
                debug!(
                    "Chunk {} returned {} of {} requested candles",
                    chunk.index,
                    records.len(),
                    chunk.limit
                );
            }

            candles.reserve(records.len());
            for raw in &records {
                match self.normalizer.normalize(raw, plan.timeframe) {
                    Ok(candle) => candles.push(candle),
                    Err(e) => {
                        skipped += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            if candles.is_empty() {
                return Err(err);
            }
            self.report_malformed(symbol, skipped, &err);
        }

        info!(
            "Fetched {} {} candles for {} from {}",
            candles.len(),
            plan.timeframe,
            symbol,
            self.normalizer.exchange()
        );

        Ok(candles)
    }

    fn report_malformed(&self, symbol: &str, skipped: usize, first_error: &Error) {
        self.diagnostics.report(Diagnostic::MalformedCandles {
            symbol: symbol.to_string(),
            skipped,
            first_error: first_error.to_string(),
        });
    }

    async fn fetch_records(&self, request: &HttpRequest) -> Result<Vec<Value>> {
        match send_checked(self.transport, request).await? {
            Value::Array(records) => Ok(records),
            other => Err(Error::ParseError(format!(
                "Expected an array of klines, got {}",
                other
            ))),
        }
    }
}
