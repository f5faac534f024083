// =============================================================================
// Cross-Asset Comparator — asset trend vs. benchmark trend
// =============================================================================
//
// Picks a benchmark index for a symbol, projects the benchmark's trend slope
// onto the asset's fitted starting value, and compares annualized growth:
//
//   projected_i = start + step * i                 i = 0 … L-1
//   growth      = (last / first)^(bars_per_year / L) - 1
//
// `step` is the benchmark's raw slope, or in relative mode its percent slope
// rescaled to the asset's starting value.  The benchmark's own fitted line is
// only used to report its native growth.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::indicators::TrendResult;
use crate::types::ProjectionMode;

/// Growth rates closer than this are a tie.
const TIE_TOLERANCE: f64 = 1e-9;

/// Benchmark for crypto assets.
pub const CRYPTO_BENCHMARK: &str = "BTC-USD";
/// Benchmark when no other rule matches.
pub const US_BENCHMARK: &str = "^GSPC";

const CRYPTO_QUOTE_SUFFIXES: &[&str] = &["-USD", "-USDT", "-EUR", "-BTC"];

/// Exchange suffix → regional index.
const EUROPEAN_EXCHANGES: &[(&str, &str)] = &[
    (".PA", "^FCHI"),
    (".DE", "^GDAXI"),
    (".AS", "^AEX"),
    (".MC", "^IBEX"),
    (".MI", "FTSEMIB.MI"),
    (".L", "^FTSE"),
    (".SW", "^SSMI"),
    (".BR", "^BFX"),
];

/// Broad asset class inferred from a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Crypto,
    European,
    Us,
}

/// Classify `symbol` by its suffix.
pub fn classify_symbol(symbol: &str) -> AssetClass {
    let upper = symbol.trim().to_uppercase();
    if CRYPTO_QUOTE_SUFFIXES.iter().any(|s| upper.ends_with(s)) {
        AssetClass::Crypto
    } else if EUROPEAN_EXCHANGES.iter().any(|(s, _)| upper.ends_with(s)) {
        AssetClass::European
    } else {
        AssetClass::Us
    }
}

/// Benchmark index symbol used to judge `symbol`.
pub fn benchmark_for(symbol: &str) -> &'static str {
    let upper = symbol.trim().to_uppercase();
    match classify_symbol(&upper) {
        AssetClass::Crypto => CRYPTO_BENCHMARK,
        AssetClass::European => EUROPEAN_EXCHANGES
            .iter()
            .find(|(s, _)| upper.ends_with(s))
            .map(|(_, index)| *index)
            .unwrap_or(US_BENCHMARK),
        AssetClass::Us => US_BENCHMARK,
    }
}

/// Compounded yearly growth between `first` and `last` over `bars` bars.
///
/// Callers pass the fitted line's length, so an excluded tail shortens the
/// span being annualized rather than the nominal lookback.
///
/// Returns 0.0 when `first` is not positive, `bars` is zero, or the result is
/// not finite.
pub fn annualized_growth(first: f64, last: f64, bars: usize, bars_per_year: f64) -> f64 {
    if first <= 0.0 || bars == 0 {
        return 0.0;
    }
    let growth = (last / first).powf(bars_per_year / bars as f64) - 1.0;
    if growth.is_finite() {
        growth
    } else {
        0.0
    }
}

/// Annualized growth of a fitted line, 0.0 when it is not renderable.
pub fn trend_growth(trend: &TrendResult, bars_per_year: f64) -> f64 {
    match (trend.first(), trend.last()) {
        (Some(first), Some(last)) if trend.is_renderable() => {
            annualized_growth(first, last, trend.len(), bars_per_year)
        }
        _ => 0.0,
    }
}

/// Outcome of the asset against its benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Outperformed,
    Underperformed,
    Matched,
}

impl Verdict {
    fn from_growth(asset: f64, benchmark: f64) -> Self {
        if (asset - benchmark).abs() <= TIE_TOLERANCE {
            Self::Matched
        } else if asset > benchmark {
            Self::Outperformed
        } else {
            Self::Underperformed
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outperformed => write!(f, "outperformed"),
            Self::Underperformed => write!(f, "underperformed"),
            Self::Matched => write!(f, "matched"),
        }
    }
}

/// Full comparison output.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub benchmark: String,
    pub mode: ProjectionMode,
    /// Asset start projected forward with the benchmark's slope.
    pub projected: Vec<f64>,
    pub asset_growth: f64,
    /// Growth of the projected line.
    pub projected_growth: f64,
    /// Growth of the benchmark's own fitted line.
    pub benchmark_growth: f64,
    pub verdict: Verdict,
    pub summary: String,
}

/// Build the projected benchmark line: `len` points from `start`.
pub fn project_line(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + step * i as f64).collect()
}

/// Compare the asset trend with the benchmark trend.
///
/// Returns `None` when either fit is not renderable; the caller shows the
/// chart without the comparison.
pub fn compare(
    asset: &TrendResult,
    benchmark: &TrendResult,
    benchmark_symbol: &str,
    bars_per_year: f64,
    mode: ProjectionMode,
) -> Option<Comparison> {
    if !asset.is_renderable() || !benchmark.is_renderable() {
        debug!(
            asset_bars = asset.len(),
            benchmark_bars = benchmark.len(),
            "comparison skipped: trend not renderable"
        );
        return None;
    }

    let start = asset.first()?;
    let step = match mode {
        ProjectionMode::RawSlope => benchmark.slope_per_bar,
        ProjectionMode::RelativeSlope => start * benchmark.slope_pct_per_bar / 100.0,
    };
    let projected = project_line(start, step, asset.len());

    let asset_growth = trend_growth(asset, bars_per_year);
    let projected_growth = match projected.last() {
        Some(&last) => annualized_growth(start, last, projected.len(), bars_per_year),
        None => 0.0,
    };
    let benchmark_growth = trend_growth(benchmark, bars_per_year);
    let verdict = Verdict::from_growth(asset_growth, projected_growth);
    let summary = summarize(verdict, benchmark_symbol, asset_growth, projected_growth);

    debug!(
        benchmark = benchmark_symbol,
        %mode,
        asset_growth = format!("{:.4}", asset_growth),
        projected_growth = format!("{:.4}", projected_growth),
        %verdict,
        "comparison complete"
    );

    Some(Comparison {
        benchmark: benchmark_symbol.to_string(),
        mode,
        projected,
        asset_growth,
        projected_growth,
        benchmark_growth,
        verdict,
        summary,
    })
}

fn summarize(verdict: Verdict, benchmark: &str, asset: f64, projected: f64) -> String {
    match verdict {
        Verdict::Matched => format!("The asset grew exactly in line with {benchmark}."),
        _ => format!(
            "Following the {benchmark} trend, the asset would have grown {:+.2}%/yr instead of {:+.2}%/yr ({verdict}).",
            projected * 100.0,
            asset * 100.0,
        ),
    }
}
