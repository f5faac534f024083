// =============================================================================
// Indicator Table — identifier → {compute, prerequisites, display metadata}
// =============================================================================
//
// The chart pipeline walks `INDICATOR_TABLE` once, in order, and runs every
// entry the request selected.  An entry whose prerequisites were not selected
// is skipped.  Each compute function reads the shared `ChartContext` and may
// write scalar results into the `ChartSummary`.

use serde::{Deserialize, Serialize};

use super::pipeline::{ChartContext, ChartLine, ChartSummary, SmaSignal};
use crate::comparator::trend_growth;
use crate::indicators::{rsi, sma};

/// Selectable indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    LinearRegression,
    StandardDeviation,
    Sma,
    Rsi,
    MarketRegression,
}

impl IndicatorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::LinearRegression => "linear_regression",
            Self::StandardDeviation => "standard_deviation",
            Self::Sma => "sma",
            Self::Rsi => "rsi",
            Self::MarketRegression => "market_regression",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        INDICATOR_TABLE
            .iter()
            .map(|spec| spec.kind)
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
    }

    pub fn spec(self) -> &'static IndicatorSpec {
        // Every variant has exactly one table entry.
        INDICATOR_TABLE
            .iter()
            .find(|spec| spec.kind == self)
            .unwrap_or(&INDICATOR_TABLE[0])
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Chart area a line is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Price,
    Oscillator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dash {
    Solid,
    Dash,
    Dot,
}

/// Visual encoding handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    pub dash: Dash,
    pub width: f32,
}

impl LineStyle {
    const fn new(color: &'static str, dash: Dash, width: f32) -> Self {
        Self { color, dash, width }
    }
}

/// Signature shared by every table entry.
pub type ComputeFn = fn(&ChartContext<'_>, &mut ChartSummary) -> Vec<ChartLine>;

/// One row of the indicator table.
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub label: &'static str,
    pub pane: Pane,
    pub requires: &'static [IndicatorKind],
    /// Styles in the order the compute function emits lines; cycled.
    pub styles: &'static [LineStyle],
    pub compute: ComputeFn,
}

impl IndicatorSpec {
    pub fn style(&self, i: usize) -> LineStyle {
        self.styles[i % self.styles.len()]
    }
}

pub static INDICATOR_TABLE: [IndicatorSpec; 5] = [
    IndicatorSpec {
        kind: IndicatorKind::LinearRegression,
        label: "Linear Regression",
        pane: Pane::Price,
        requires: &[],
        styles: &[LineStyle::new("darkblue", Dash::Dash, 2.0)],
        compute: compute_regression,
    },
    IndicatorSpec {
        kind: IndicatorKind::StandardDeviation,
        label: "Standard Deviation",
        pane: Pane::Price,
        requires: &[IndicatorKind::LinearRegression],
        styles: &[
            LineStyle::new("orange", Dash::Dot, 1.0),
            LineStyle::new("orange", Dash::Dot, 1.0),
            LineStyle::new("purple", Dash::Dot, 1.0),
            LineStyle::new("purple", Dash::Dot, 1.0),
            LineStyle::new("lightblue", Dash::Dot, 1.0),
            LineStyle::new("lightblue", Dash::Dot, 1.0),
        ],
        compute: compute_bands,
    },
    IndicatorSpec {
        kind: IndicatorKind::Sma,
        label: "SMA",
        pane: Pane::Price,
        requires: &[],
        styles: &[
            LineStyle::new("blue", Dash::Solid, 1.5),
            LineStyle::new("green", Dash::Solid, 1.5),
        ],
        compute: compute_sma,
    },
    IndicatorSpec {
        kind: IndicatorKind::Rsi,
        label: "RSI",
        pane: Pane::Oscillator,
        requires: &[],
        styles: &[LineStyle::new("purple", Dash::Solid, 1.5)],
        compute: compute_rsi,
    },
    IndicatorSpec {
        kind: IndicatorKind::MarketRegression,
        label: "Market Linear Regression",
        pane: Pane::Price,
        requires: &[IndicatorKind::LinearRegression],
        styles: &[LineStyle::new("gray", Dash::Dash, 2.0)],
        compute: compute_market_regression,
    },
];

// =============================================================================
// Compute functions
// =============================================================================

fn compute_regression(ctx: &ChartContext<'_>, summary: &mut ChartSummary) -> Vec<ChartLine> {
    let trend = ctx.trend();
    if !trend.is_renderable() {
        return Vec::new();
    }

    summary.slope_per_bar = Some(trend.slope_per_bar);
    summary.slope_pct_per_bar = Some(trend.slope_pct_per_bar);
    summary.asset_growth = Some(trend_growth(trend, ctx.bars_per_year()));
    summary.comparison = ctx.comparison().cloned();

    vec![ctx.window_line(IndicatorKind::LinearRegression, 0, "Asset regression", &trend.fitted)]
}

fn compute_bands(ctx: &ChartContext<'_>, summary: &mut ChartSummary) -> Vec<ChartLine> {
    let Some(bands) = ctx.bands() else {
        return Vec::new();
    };
    summary.std_dev = Some(bands.std_dev);

    bands
        .bands
        .iter()
        .enumerate()
        .map(|(i, band)| {
            ctx.window_line(
                IndicatorKind::StandardDeviation,
                i,
                &format!("Std Dev {}", band.label),
                &band.values,
            )
        })
        .collect()
}

fn compute_sma(ctx: &ChartContext<'_>, summary: &mut ChartSummary) -> Vec<ChartLine> {
    let params = ctx.params();
    let closes = ctx.closes();
    let (short, long) = sma::calculate_sma_pair(closes, params.sma_short, params.sma_long);

    summary.sma_signal = sma::short_above_long(&short, &long).map(|above| {
        if above {
            SmaSignal::Bullish
        } else {
            SmaSignal::Bearish
        }
    });

    vec![
        ctx.series_line(IndicatorKind::Sma, 0, &format!("SMA {}", params.sma_short), short),
        ctx.series_line(IndicatorKind::Sma, 1, &format!("SMA {}", params.sma_long), long),
    ]
}

fn compute_rsi(ctx: &ChartContext<'_>, summary: &mut ChartSummary) -> Vec<ChartLine> {
    let period = ctx.params().rsi_period;
    let values = rsi::calculate_rsi(ctx.closes(), period);

    summary.rsi = rsi::current_rsi(ctx.closes(), period).map(|(value, label)| (value, label.to_string()));

    vec![ctx.series_line(IndicatorKind::Rsi, 0, &format!("RSI {period}"), values)]
}

fn compute_market_regression(ctx: &ChartContext<'_>, summary: &mut ChartSummary) -> Vec<ChartLine> {
    let Some(comparison) = ctx.comparison() else {
        return Vec::new();
    };
    summary.comparison = Some(comparison.clone());

    let name = format!("{} trend from asset start", comparison.benchmark);
    vec![ctx.window_line(IndicatorKind::MarketRegression, 0, &name, &comparison.projected)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_one_entry() {
        for kind in [
            IndicatorKind::LinearRegression,
            IndicatorKind::StandardDeviation,
            IndicatorKind::Sma,
            IndicatorKind::Rsi,
            IndicatorKind::MarketRegression,
        ] {
            assert_eq!(INDICATOR_TABLE.iter().filter(|s| s.kind == kind).count(), 1);
            assert_eq!(kind.spec().kind, kind);
        }
    }

    #[test]
    fn prerequisites_come_first_in_table() {
        for (i, spec) in INDICATOR_TABLE.iter().enumerate() {
            for req in spec.requires {
                let pos = INDICATOR_TABLE.iter().position(|s| s.kind == *req).unwrap();
                assert!(pos < i, "{} must follow {}", spec.kind, req);
            }
        }
    }

    #[test]
    fn codes_parse_case_insensitively() {
        assert_eq!(IndicatorKind::from_code("RSI"), Some(IndicatorKind::Rsi));
        assert_eq!(
            IndicatorKind::from_code(" linear_regression "),
            Some(IndicatorKind::LinearRegression)
        );
        assert_eq!(IndicatorKind::from_code("macd"), None);
    }

    #[test]
    fn band_styles_cycle() {
        let spec = IndicatorKind::StandardDeviation.spec();
        assert_eq!(spec.style(0).color, "orange");
        assert_eq!(spec.style(4).color, "lightblue");
        assert_eq!(spec.style(6).color, "orange");
    }
}
