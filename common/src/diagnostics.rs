//! Recoverable data problems reported while loading catalogs or candles.
//!
//! A sink is handed to each connector when it is built, so reports stay
//! scoped to that connector instead of going through a process-wide logger.

use serde::Serialize;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    /// The notional filter was absent or unreadable and defaults were used.
    NotionalDefaulted {
        symbol: String,
        reason: String,
        min_notional: f64,
        max_notional: f64,
    },
    /// A catalog entry lacked a required field and was left out.
    InstrumentSkipped { symbol: Option<String>, reason: String },
    /// Some kline records of a fetch could not be normalized.
    MalformedCandles {
        symbol: String,
        skipped: usize,
        first_error: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::NotionalDefaulted {
                symbol,
                reason,
                min_notional,
                max_notional,
            } => write!(
                f,
                "notional filter unusable for {}: {} (defaulted to {}..{})",
                symbol, reason, min_notional, max_notional
            ),
            Diagnostic::InstrumentSkipped { symbol, reason } => write!(
                f,
                "skipped instrument {}: {}",
                symbol.as_deref().unwrap_or("<unnamed>"),
                reason
            ),
            Diagnostic::MalformedCandles {
                symbol,
                skipped,
                first_error,
            } => write!(
                f,
                "skipped {} malformed candles for {}: {}",
                skipped, symbol, first_error
            ),
        }
    }
}

pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// Keeps diagnostics in memory so callers can inspect them after a call.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Diagnostic> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.reports().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        match self.reports.lock() {
            Ok(mut reports) => reports.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());

        sink.report(Diagnostic::InstrumentSkipped {
            symbol: None,
            reason: "missing symbol".into(),
        });
        sink.report(Diagnostic::MalformedCandles {
            symbol: "BTCUSDT".into(),
            skipped: 3,
            first_error: "open is not numeric".into(),
        });

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert!(matches!(reports[0], Diagnostic::InstrumentSkipped { .. }));
        assert_eq!(
            reports[1].to_string(),
            "skipped 3 malformed candles for BTCUSDT: open is not numeric"
        );
    }
}
