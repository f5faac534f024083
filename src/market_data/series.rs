// =============================================================================
// Price Series — ordered OHLC bars with bounds-checked windowing
// =============================================================================
//
// A `PriceSeries` is built once per request from whatever the series source
// returned and is never mutated afterwards.  Construction enforces strictly
// increasing timestamps; every window is resolved against the actual length so
// out-of-range requests clamp instead of wrapping around.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BarInterval;

/// Failures raised while assembling a series.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} is not after the previous bar at {previous}")]
    NotIncreasing {
        index: usize,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
}

/// A single OHLC bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

/// Ordered bars for one symbol at one interval.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    symbol: String,
    interval: BarInterval,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order timestamps.
    pub fn new(
        symbol: impl Into<String>,
        interval: BarInterval,
        bars: Vec<PriceBar>,
    ) -> Result<Self, SeriesError> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NotIncreasing {
                    index: i + 1,
                    previous: pair[0].timestamp,
                    timestamp: pair[1].timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            interval,
            bars,
        })
    }

    /// A series with no bars; callers treat it as "nothing to compute".
    pub fn empty(symbol: impl Into<String>, interval: BarInterval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> BarInterval {
        self.interval
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices in bar order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Bars selected by `window`, clamped to the series length.
    pub fn window(&self, window: LookbackWindow) -> &[PriceBar] {
        &self.bars[window.resolve(self.bars.len())]
    }
}

/// Trailing slice of a series: the last `length` bars, minus the most recent
/// `exclude` of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub length: usize,
    pub exclude: usize,
}

impl LookbackWindow {
    pub fn new(length: usize, exclude: usize) -> Self {
        Self { length, exclude }
    }

    /// Resolve against a series of `len` bars. `length` clamps to `len` and
    /// `exclude` clamps to the clamped length, so the range is always valid.
    pub fn resolve(self, len: usize) -> Range<usize> {
        let length = self.length.min(len);
        let exclude = self.exclude.min(length);
        (len - length)..(len - exclude)
    }
}
