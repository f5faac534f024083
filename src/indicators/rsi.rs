// =============================================================================
// Relative Strength Index (RSI) — rolling simple means
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Split into gains (positive deltas) and losses (|negative deltas|).
// Step 3 — Rolling simple mean of gains and of losses over `period` deltas.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// A zero average loss saturates RSI at 100.
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

/// Default look-back period.
pub const DEFAULT_PERIOD: usize = 14;

/// Compute the RSI series for `closes`, aligned 1:1 with the input.
///
/// The first `period` positions are `None`: position `i` needs the `period`
/// deltas ending at `i`, and the first delta lands on index 1.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() <= period` => all `None`
/// - Average loss of zero => 100.0
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    // --- Split deltas into gains and losses ----------------------------------
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if d > 0.0 {
                (d, 0.0)
            } else {
                (0.0, d.abs())
            }
        })
        .unzip();

    // --- Rolling sums over `period` deltas -----------------------------------
    let period_f = period as f64;
    let mut sum_gain: f64 = gains[..period].iter().sum();
    let mut sum_loss: f64 = losses[..period].iter().sum();
    result[period] = rsi_from_averages(sum_gain / period_f, sum_loss / period_f);

    for d in period..gains.len() {
        sum_gain += gains[d] - gains[d - period];
        sum_loss += losses[d] - losses[d - period];
        // Rolling subtraction can leave tiny negative residue.
        let avg_gain = (sum_gain / period_f).max(0.0);
        let avg_loss = (sum_loss / period_f).max(0.0);
        result[d + 1] = rsi_from_averages(avg_gain, avg_loss);
    }

    result
}

/// Convenience function: return the most recent RSI value together with a
/// human-readable label.
///
/// Returns `None` when there is insufficient data.
pub fn current_rsi(closes: &[f64], period: usize) -> Option<(f64, &'static str)> {
    let value = (*calculate_rsi(closes, period).last()?)?;

    let label = if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    };

    Some((value, label))
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// A zero average loss (including a completely flat window) is reported as
/// 100.0. Non-finite results map to `None`.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss <= 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then(|| rsi.clamp(0.0, 100.0))
}
