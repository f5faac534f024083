// =============================================================================
// Linear Trend — Ordinary Least Squares over a lookback window
// =============================================================================
//
// Fits close = intercept + slope * t with t = 0, 1, …, n-1 inside the window:
//
//   slope     = Σ((t - t̄)(y - ȳ)) / Σ((t - t̄)²)
//   intercept = ȳ - slope * t̄
//
// The slope is also reported as percent growth per bar relative to the first
// fitted value, which is what the annualization in the comparator consumes.
// =============================================================================

use serde::Serialize;
use tracing::trace;

use crate::market_data::{LookbackWindow, PriceSeries};

/// Minimum number of bars for a meaningful fit.
pub const MIN_TREND_BARS: usize = 2;

/// Fitted trend line over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    /// One fitted value per bar of the window, oldest first.
    pub fitted: Vec<f64>,
    /// Price units per bar.
    pub slope_per_bar: f64,
    /// Slope as a percentage of the first fitted value.
    pub slope_pct_per_bar: f64,
    pub intercept: f64,
}

impl TrendResult {
    /// The "insufficient data" result: nothing fitted, zero slope.
    pub fn insufficient() -> Self {
        Self {
            fitted: Vec::new(),
            slope_per_bar: 0.0,
            slope_pct_per_bar: 0.0,
            intercept: 0.0,
        }
    }

    /// Whether the fit produced a line worth rendering.
    pub fn is_renderable(&self) -> bool {
        self.fitted.len() >= MIN_TREND_BARS
    }

    pub fn len(&self) -> usize {
        self.fitted.len()
    }

    pub fn first(&self) -> Option<f64> {
        self.fitted.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.fitted.last().copied()
    }
}

/// Fit a trend line to the last `window` closes.
///
/// A window longer than the input is clamped to the input length. Fewer than
/// [`MIN_TREND_BARS`] points after clamping yield [`TrendResult::insufficient`].
pub fn fit_trend(closes: &[f64], window: usize) -> TrendResult {
    let window = window.min(closes.len());
    let recent = &closes[closes.len() - window..];

    if recent.len() < MIN_TREND_BARS {
        trace!(len = recent.len(), "trend: insufficient data");
        return TrendResult::insufficient();
    }

    let n = recent.len() as f64;
    let t_mean = (n - 1.0) / 2.0;
    let y_mean = recent.iter().sum::<f64>() / n;

    let mut numerator = 0.0_f64;
    let mut denominator = 0.0_f64;
    for (i, &y) in recent.iter().enumerate() {
        let dt = i as f64 - t_mean;
        numerator += dt * (y - y_mean);
        denominator += dt * dt;
    }

    // denominator > 0 for n >= 2, so this only trips on non-finite input.
    let slope = numerator / denominator;
    if !slope.is_finite() || !y_mean.is_finite() {
        trace!("trend: non-finite fit");
        return TrendResult::insufficient();
    }
    let intercept = y_mean - slope * t_mean;

    let fitted: Vec<f64> = (0..recent.len()).map(|i| intercept + slope * i as f64).collect();
    let slope_pct_per_bar = percent_per_bar(slope, fitted[0]);

    trace!(
        bars = fitted.len(),
        slope = format!("{:.6}", slope),
        slope_pct = format!("{:.6}", slope_pct_per_bar),
        "trend fitted"
    );

    TrendResult {
        fitted,
        slope_per_bar: slope,
        slope_pct_per_bar,
        intercept,
    }
}

/// Fit a trend line over the bars selected by `window`.
pub fn fit_window(series: &PriceSeries, window: LookbackWindow) -> TrendResult {
    let closes: Vec<f64> = series.window(window).iter().map(|b| b.close).collect();
    fit_trend(&closes, closes.len())
}

/// `slope / base * 100`, or 0 when `base` is not strictly positive.
fn percent_per_bar(slope: f64, base: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    let pct = slope / base * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::source::memory::series_from_closes;
    use crate::types::BarInterval;

    fn linear(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| a + b * i as f64).collect()
    }

    #[test]
    fn empty_input_is_insufficient() {
        let t = fit_trend(&[], 10);
        assert!(t.fitted.is_empty());
        assert_eq!(t.slope_per_bar, 0.0);
        assert!(!t.is_renderable());
    }

    #[test]
    fn single_point_is_insufficient() {
        let t = fit_trend(&[5.0, 6.0, 7.0], 1);
        assert!(t.fitted.is_empty());
        assert_eq!(t.slope_per_bar, 0.0);
    }

    #[test]
    fn window_clamps_to_series_length() {
        for (n, w) in [(5, 10), (10, 5), (2, 2), (3, 100)] {
            let closes = linear(10.0, 1.0, n);
            assert_eq!(fit_trend(&closes, w).len(), n.min(w));
        }
    }

    #[test]
    fn recovers_exact_linear_series() {
        let closes = linear(100.0, 2.0, 10);
        let t = fit_trend(&closes, 10);
        assert!((t.slope_per_bar - 2.0).abs() < 1e-10);
        assert!((t.intercept - 100.0).abs() < 1e-10);
        for (fit, close) in t.fitted.iter().zip(&closes) {
            assert!((fit - close).abs() < 1e-9, "fit {fit} vs close {close}");
        }
        assert!((t.slope_pct_per_bar - 2.0).abs() < 1e-10);
    }

    #[test]
    fn window_uses_most_recent_bars() {
        let mut closes = vec![500.0, 1.0, 900.0];
        closes.extend(linear(10.0, -0.5, 6));
        let t = fit_trend(&closes, 6);
        assert!((t.slope_per_bar + 0.5).abs() < 1e-10);
        assert!((t.fitted[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_start_reports_zero_percent() {
        let closes = linear(-4.0, 1.0, 8);
        let t = fit_trend(&closes, 8);
        assert!((t.slope_per_bar - 1.0).abs() < 1e-10);
        assert_eq!(t.slope_pct_per_bar, 0.0);
    }

    #[test]
    fn flat_series_has_zero_slope() {
        let t = fit_trend(&[42.0; 20], 20);
        assert!(t.slope_per_bar.abs() < 1e-12);
        assert!(t.fitted.iter().all(|v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn fit_window_respects_exclusion() {
        let mut closes = linear(50.0, 1.0, 8);
        closes.extend([1000.0, 2000.0]);
        let series = series_from_closes("X", BarInterval::Weekly, &closes);
        let t = fit_window(&series, LookbackWindow::new(10, 2));
        assert_eq!(t.len(), 8);
        assert!((t.slope_per_bar - 1.0).abs() < 1e-10);
    }
}
