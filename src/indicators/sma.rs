// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_i = (close_{i-w+1} + … + close_i) / w
//
// The output is aligned with the input: the first `w - 1` positions have no
// value (`None`), never zero, so a renderer cannot draw a false flat segment
// at the start of the series.
// =============================================================================

/// Default short (medium-term) window.
pub const SHORT_WINDOW: usize = 50;
/// Default long-term window.
pub const LONG_WINDOW: usize = 200;

/// Rolling mean of `closes` over `window`, aligned 1:1 with the input.
///
/// `window == 0` produces an all-`None` series.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    let w = window as f64;
    let mut sum: f64 = closes[..window].iter().sum();
    result[window - 1] = finite(sum / w);

    for i in window..closes.len() {
        sum += closes[i] - closes[i - window];
        result[i] = finite(sum / w);
    }

    result
}

/// Short and long SMAs in one pass over the configuration.
pub fn calculate_sma_pair(closes: &[f64], short: usize, long: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    (calculate_sma(closes, short), calculate_sma(closes, long))
}

/// Whether the short average sits above the long one at the last bar.
///
/// `None` until both averages are defined.
pub fn short_above_long(short: &[Option<f64>], long: &[Option<f64>]) -> Option<bool> {
    let s = (*short.last()?)?;
    let l = (*long.last()?)?;
    Some(s > l)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
