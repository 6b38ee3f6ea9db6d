//! Splits a historical candle request into bounded klines calls.
//!
//! The upstream returns at most [`MAX_CANDLES_PER_REQUEST`] candles per call,
//! so a window of `total` candles becomes `ceil(total / 1000)` chunks. Every
//! chunk but the last asks for exactly 1000 candles and chunk `i` starts
//! `i * 1000` candle widths after the window start. Chunks are emitted in
//! ascending start order and the executor concatenates their results as-is.

use chrono::{DateTime, Utc};
use common::{models::Timeframe, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MAX_CANDLES_PER_REQUEST: u32 = 1000;

/// What the caller wants: a symbol, a timeframe and any two of
/// start / end / count (or count alone, meaning "ending now").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub count: Option<u32>,
}

impl RequestDescriptor {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            start_time: None,
            end_time: None,
            count: None,
        }
    }

    /// Like [`RequestDescriptor::new`], parsing the timeframe label.
    pub fn parse(symbol: impl Into<String>, timeframe: &str) -> Result<Self> {
        Ok(Self::new(symbol, timeframe.parse()?))
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

/// One upstream klines call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: usize,
    /// `startTime` parameter, milliseconds since the Unix epoch
    pub start_time_ms: i64,
    /// `limit` parameter, 1..=1000
    pub limit: u32,
}

/// Ordered chunks covering `[window_start_ms, window_end_ms)` without gap or overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubRequestPlan {
    pub timeframe: Timeframe,
    pub window_start_ms: i64,
    /// Exclusive end, aligned to a whole number of candles after the start
    pub window_end_ms: i64,
    pub chunks: Vec<Chunk>,
}

impl SubRequestPlan {
    /// Number of candles the plan asks for.
    pub fn total(&self) -> u64 {
        self.chunks.iter().map(|c| u64::from(c.limit)).sum()
    }

    /// End of the span the last chunk covers.
    pub fn coverage_end_ms(&self) -> i64 {
        self.chunks
            .last()
            .map(|c| c.start_time_ms + i64::from(c.limit) * self.timeframe.duration_millis())
            .unwrap_or(self.window_start_ms)
    }
}

struct Window {
    start_ms: i64,
    total: u64,
}

fn checked_count(count: u32) -> Result<u32> {
    if count == 0 {
        return Err(Error::InvalidCount(count));
    }
    Ok(count)
}

fn span_ms(count: u32, timeframe: Timeframe) -> Result<i64> {
    i64::from(count)
        .checked_mul(timeframe.duration_millis())
        .ok_or(Error::InvalidCount(count))
}

fn resolve(descriptor: &RequestDescriptor, now: DateTime<Utc>) -> Result<Window> {
    let timeframe = descriptor.timeframe;
    let step = timeframe.duration_millis();

    match (descriptor.start_time, descriptor.end_time, descriptor.count) {
        (Some(start), Some(end), count) => {
            if let Some(count) = count {
                debug!("start and end both given, ignoring count {}", count);
            }

            let (start_ms, end_ms) = (start.timestamp_millis(), end.timestamp_millis());
            if start_ms > end_ms {
                return Err(Error::InvertedWindow { start_ms, end_ms });
            }

            let total = (end_ms - start_ms) / step;
            if total == 0 {
                return Err(Error::EmptyWindow {
                    start_ms,
                    end_ms,
                    timeframe: timeframe.to_string(),
                });
            }

            Ok(Window {
                start_ms,
                total: total as u64,
            })
        }
        (Some(start), None, Some(count)) => {
            let count = checked_count(count)?;
            span_ms(count, timeframe)?;
            Ok(Window {
                start_ms: start.timestamp_millis(),
                total: u64::from(count),
            })
        }
        (None, Some(end), Some(count)) => {
            let count = checked_count(count)?;
            Ok(Window {
                start_ms: end.timestamp_millis() - span_ms(count, timeframe)?,
                total: u64::from(count),
            })
        }
        (None, None, Some(count)) => {
            let count = checked_count(count)?;
            Ok(Window {
                start_ms: now.timestamp_millis() - span_ms(count, timeframe)?,
                total: u64::from(count),
            })
        }
        _ => Err(Error::InsufficientParameters),
    }
}

/// Compute the klines calls needed to satisfy `descriptor`.
///
/// `now` anchors count-only requests; the result is fully determined by
/// the descriptor and `now`.
pub fn plan(descriptor: &RequestDescriptor, now: DateTime<Utc>) -> Result<SubRequestPlan> {
    let window = resolve(descriptor, now)?;
    let step = descriptor.timeframe.duration_millis();
    let per_chunk = u64::from(MAX_CANDLES_PER_REQUEST);

    let chunk_count = (window.total + per_chunk - 1) / per_chunk;
    let chunks = (0..chunk_count)
        .map(|i| {
            let limit = if i + 1 == chunk_count {
                window.total - per_chunk * (chunk_count - 1)
            } else {
                per_chunk
            };
            Chunk {
                index: i as usize,
                start_time_ms: window.start_ms + (i * per_chunk) as i64 * step,
                limit: limit as u32,
            }
        })
        .collect::<Vec<_>>();

    let plan = SubRequestPlan {
        timeframe: descriptor.timeframe,
        window_start_ms: window.start_ms,
        window_end_ms: window.start_ms + window.total as i64 * step,
        chunks,
    };

    debug!(
        "Planned {} candles of {} for {} in {} chunks",
        window.total,
        descriptor.timeframe,
        descriptor.symbol,
        plan.chunks.len()
    );

    Ok(plan)
}
