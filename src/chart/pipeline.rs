// =============================================================================
// Chart Pipeline — one request, one pass over the indicator table
// =============================================================================
//
// Input:  the asset series, an optional benchmark series, the request, and
//         the dashboard config.
// Output: a `ChartPayload` the renderer draws without further computation.
//
// The trend fit, its bands and the benchmark comparison are computed at most
// once per request and shared by every table entry that needs them.
// =============================================================================

use std::cell::OnceCell;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::table::{IndicatorKind, LineStyle, Pane, INDICATOR_TABLE};
use crate::comparator::{self, Comparison};
use crate::indicators::{calculate_bands, fit_trend, fit_window, DispersionBands, TrendResult, MIN_TREND_BARS};
use crate::market_data::{LookbackWindow, PriceBar, PriceSeries};
use crate::runtime_config::{DashboardConfig, IndicatorParams};
use crate::types::BarInterval;

// =============================================================================
// Request / payload types
// =============================================================================

/// What the user asked to see.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub symbol: String,
    pub interval: BarInterval,
    /// Regression lookback in bars; `None` means the largest allowed.
    pub lookback: Option<usize>,
    /// Most recent bars left out of the regression.
    pub exclude: usize,
    pub indicators: Vec<IndicatorKind>,
}

/// Benchmark trend fitted over the same dates as the asset's regression window.
#[derive(Debug, Clone)]
pub struct BenchmarkTrend {
    pub symbol: String,
    pub trend: TrendResult,
}

impl BenchmarkTrend {
    /// Fit `series` over the calendar span of `asset_window`.
    ///
    /// Bars are matched by date. `None` when the benchmark does not have
    /// exactly one bar per asset bar in that span.
    pub fn fit(series: &PriceSeries, asset_window: &[PriceBar]) -> Option<Self> {
        let first = asset_window.first()?.timestamp.date_naive();
        let last = asset_window.last()?.timestamp.date_naive();

        let closes: Vec<f64> = series
            .bars()
            .iter()
            .filter(|b| (first..=last).contains(&b.timestamp.date_naive()))
            .map(|b| b.close)
            .collect();

        if closes.len() < MIN_TREND_BARS || closes.len() != asset_window.len() {
            debug!(
                benchmark = series.symbol(),
                %first,
                %last,
                asset_bars = asset_window.len(),
                benchmark_bars = closes.len(),
                "benchmark bars do not line up with the asset window"
            );
            return None;
        }

        Some(Self {
            symbol: series.symbol().to_string(),
            trend: fit_trend(&closes, closes.len()),
        })
    }
}

/// A named, time-aligned line. `None` values are gaps.
#[derive(Debug, Clone, Serialize)]
pub struct ChartLine {
    pub indicator: IndicatorKind,
    pub name: String,
    pub pane: Pane,
    pub style: LineStyle,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmaSignal {
    /// Short average above long.
    Bullish,
    Bearish,
}

/// Scalar results shown next to the chart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartSummary {
    pub slope_per_bar: Option<f64>,
    pub slope_pct_per_bar: Option<f64>,
    pub asset_growth: Option<f64>,
    pub std_dev: Option<f64>,
    pub sma_signal: Option<SmaSignal>,
    pub rsi: Option<(f64, String)>,
    pub comparison: Option<Comparison>,
}

/// Everything the renderer needs for one chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub symbol: String,
    pub interval: BarInterval,
    pub lookback: usize,
    pub exclude: usize,
    pub benchmark: Option<String>,
    pub candles: Vec<PriceBar>,
    pub lines: Vec<ChartLine>,
    pub summary: ChartSummary,
    /// Selected indicators whose prerequisites were not selected.
    pub skipped: Vec<IndicatorKind>,
}

// =============================================================================
// Context shared by table entries
// =============================================================================

pub struct ChartContext<'a> {
    series: &'a PriceSeries,
    window: LookbackWindow,
    params: &'a IndicatorParams,
    benchmark: Option<&'a BenchmarkTrend>,
    closes: Vec<f64>,
    trend: OnceCell<TrendResult>,
    bands: OnceCell<Option<DispersionBands>>,
    comparison: OnceCell<Option<Comparison>>,
}

impl<'a> ChartContext<'a> {
    pub fn new(
        series: &'a PriceSeries,
        window: LookbackWindow,
        params: &'a IndicatorParams,
        benchmark: Option<&'a BenchmarkTrend>,
    ) -> Self {
        Self {
            series,
            window,
            params,
            benchmark,
            closes: series.closes(),
            trend: OnceCell::new(),
            bands: OnceCell::new(),
            comparison: OnceCell::new(),
        }
    }

    pub fn params(&self) -> &IndicatorParams {
        self.params
    }

    /// Closes of the full series.
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn bars_per_year(&self) -> f64 {
        self.series.interval().bars_per_year()
    }

    pub fn trend(&self) -> &TrendResult {
        self.trend.get_or_init(|| fit_window(self.series, self.window))
    }

    pub fn bands(&self) -> Option<&DispersionBands> {
        self.bands
            .get_or_init(|| {
                let trend = self.trend();
                if !trend.is_renderable() {
                    return None;
                }
                let closes = &self.closes[self.window.resolve(self.closes.len())];
                match calculate_bands(closes, &trend.fitted, &self.params.band_multipliers) {
                    Ok(bands) => bands,
                    Err(e) => {
                        // Both slices come from the same window.
                        warn!(error = %e, "band computation rejected its input");
                        None
                    }
                }
            })
            .as_ref()
    }

    pub fn comparison(&self) -> Option<&Comparison> {
        self.comparison
            .get_or_init(|| {
                let benchmark = self.benchmark?;
                comparator::compare(
                    self.trend(),
                    &benchmark.trend,
                    &benchmark.symbol,
                    self.bars_per_year(),
                    self.params.projection,
                )
            })
            .as_ref()
    }

    /// A line over the regression window.
    pub fn window_line(&self, kind: IndicatorKind, style: usize, name: &str, values: &[f64]) -> ChartLine {
        let bars = self.series.window(self.window);
        let spec = kind.spec();
        ChartLine {
            indicator: kind,
            name: name.to_string(),
            pane: spec.pane,
            style: spec.style(style),
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            values: values.iter().map(|&v| v.is_finite().then_some(v)).collect(),
        }
    }

    /// A line over the full series.
    pub fn series_line(&self, kind: IndicatorKind, style: usize, name: &str, values: Vec<Option<f64>>) -> ChartLine {
        let spec = kind.spec();
        ChartLine {
            indicator: kind,
            name: name.to_string(),
            pane: spec.pane,
            style: spec.style(style),
            timestamps: self.series.timestamps(),
            values,
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Resolve the regression window for `request` against a series of `len` bars.
pub fn resolve_window(request: &ChartRequest, config: &DashboardConfig, len: usize) -> LookbackWindow {
    let lookback = config.clamp_lookback(request.lookback, len);
    LookbackWindow::new(lookback, request.exclude.min(lookback))
}

/// Run every selected indicator over `series`.
///
/// An empty series yields a payload with no candles and no lines.
pub fn build_chart(
    request: &ChartRequest,
    series: &PriceSeries,
    benchmark: Option<&BenchmarkTrend>,
    config: &DashboardConfig,
) -> ChartPayload {
    let window = resolve_window(request, config, series.len());
    let selected: HashSet<IndicatorKind> = request.indicators.iter().copied().collect();

    let mut payload = ChartPayload {
        symbol: series.symbol().to_string(),
        interval: series.interval(),
        lookback: window.length,
        exclude: window.exclude,
        benchmark: benchmark.map(|b| b.symbol.clone()),
        candles: series.bars().to_vec(),
        lines: Vec::new(),
        summary: ChartSummary::default(),
        skipped: Vec::new(),
    };

    if series.is_empty() {
        debug!(symbol = %request.symbol, "empty series, nothing to compute");
        return payload;
    }

    let ctx = ChartContext::new(series, window, &config.indicator_params, benchmark);

    for spec in INDICATOR_TABLE.iter().filter(|s| selected.contains(&s.kind)) {
        if let Some(missing) = spec.requires.iter().find(|r| !selected.contains(r)) {
            debug!(indicator = %spec.kind, requires = %missing, "indicator skipped");
            payload.skipped.push(spec.kind);
            continue;
        }
        let lines = (spec.compute)(&ctx, &mut payload.summary);
        debug!(indicator = %spec.kind, lines = lines.len(), "indicator computed");
        payload.lines.extend(lines);
    }

    payload
}
