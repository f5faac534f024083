// =============================================================================
// Dispersion Bands — residual σ around a fitted trend
// =============================================================================
//
// Residuals are the closes minus the fitted trend.  Their population standard
// deviation (divide by N) sets the band spacing:
//
//   band(k) = fitted ± k·σ      for each multiplier k (default 1, 2, 3)
//
// Bands are parallel to the trend line.  A zero σ (perfect fit) or a window
// shorter than two points yields no bands at all.

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Default band multipliers.
pub const DEFAULT_MULTIPLIERS: [f64; 3] = [1.0, 2.0, 3.0];

/// σ at or below this fraction of the mean absolute close counts as zero.
const DEGENERATE_STD_REL: f64 = 1e-10;

/// Caller misuse of the band estimator.
#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("window has {closes} closes but the trend has {fitted} fitted values")]
    LengthMismatch { closes: usize, fitted: usize },
}

/// One labelled band, e.g. `+2σ`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub label: String,
    /// Signed multiplier (`-2.0` for `-2σ`).
    pub multiplier: f64,
    pub values: Vec<f64>,
}

/// All bands derived from one trend fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispersionBands {
    pub std_dev: f64,
    /// Ordered `+1σ, -1σ, +2σ, -2σ, …`.
    pub bands: Vec<Band>,
}

/// Population standard deviation of `closes - fitted`.
///
/// Returns `Ok(None)` for windows shorter than two points.
pub fn residual_std_dev(closes: &[f64], fitted: &[f64]) -> Result<Option<f64>, IndicatorError> {
    if closes.len() != fitted.len() {
        return Err(IndicatorError::LengthMismatch {
            closes: closes.len(),
            fitted: fitted.len(),
        });
    }
    if closes.len() < 2 {
        return Ok(None);
    }

    let n = closes.len() as f64;
    let residuals: Vec<f64> = closes.iter().zip(fitted).map(|(c, f)| c - f).collect();
    let mean = residuals.iter().sum::<f64>() / n;
    let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    Ok(std_dev.is_finite().then_some(std_dev))
}

/// Compute bands at `±k·σ` for each multiplier in `multipliers`.
///
/// Returns `Ok(None)` when the bands are not computable (degenerate window or
/// zero σ) and `Err` when `closes` and `fitted` are not aligned.
pub fn calculate_bands(
    closes: &[f64],
    fitted: &[f64],
    multipliers: &[f64],
) -> Result<Option<DispersionBands>, IndicatorError> {
    let Some(std_dev) = residual_std_dev(closes, fitted)? else {
        trace!(len = closes.len(), "bands: window too short");
        return Ok(None);
    };

    let scale = closes.iter().map(|c| c.abs()).sum::<f64>() / closes.len() as f64;
    if std_dev <= DEGENERATE_STD_REL * scale.max(1.0) {
        trace!(std_dev, "bands: zero dispersion");
        return Ok(None);
    }

    let mut bands = Vec::with_capacity(multipliers.len() * 2);
    for k in usable_multipliers(multipliers) {
        for sign in [1.0, -1.0] {
            let offset = sign * k * std_dev;
            bands.push(Band {
                label: band_label(sign * k),
                multiplier: sign * k,
                values: fitted.iter().map(|f| f + offset).collect(),
            });
        }
    }

    Ok(Some(DispersionBands { std_dev, bands }))
}

/// Positive, finite multipliers in first-seen order, each at most once.
fn usable_multipliers(multipliers: &[f64]) -> Vec<f64> {
    let mut usable: Vec<f64> = Vec::with_capacity(multipliers.len());
    for &k in multipliers {
        if !k.is_finite() || k <= 0.0 {
            trace!(multiplier = k, "bands: multiplier ignored");
            continue;
        }
        if !usable.contains(&k) {
            usable.push(k);
        }
    }
    usable
}

/// `+1σ`, `-2σ`, `+1.5σ`.
fn band_label(multiplier: f64) -> String {
    let sign = if multiplier < 0.0 { '-' } else { '+' };
    let k = multiplier.abs();
    if k.fract() == 0.0 {
        format!("{sign}{}σ", k as i64)
    } else {
        format!("{sign}{k}σ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::trend::fit_trend;

    fn band<'a>(bands: &'a DispersionBands, label: &str) -> &'a [f64] {
        &bands.bands.iter().find(|b| b.label == label).expect("band").values
    }

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.8 * i as f64 + 5.0 * (i as f64 * 0.7).sin())
            .collect()
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = calculate_bands(&[1.0, 2.0, 3.0], &[1.0, 2.0], &DEFAULT_MULTIPLIERS).unwrap_err();
        assert_eq!(err, IndicatorError::LengthMismatch { closes: 3, fitted: 2 });
    }

    #[test]
    fn perfect_fit_has_no_bands() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + 2.0 * i as f64).collect();
        let trend = fit_trend(&closes, 10);
        assert!(calculate_bands(&closes, &trend.fitted, &DEFAULT_MULTIPLIERS)
            .unwrap()
            .is_none());
    }

    #[test]
    fn short_window_has_no_bands() {
        assert!(calculate_bands(&[5.0], &[5.0], &DEFAULT_MULTIPLIERS).unwrap().is_none());
        assert!(calculate_bands(&[], &[], &DEFAULT_MULTIPLIERS).unwrap().is_none());
    }

    #[test]
    fn population_std_dev_of_residuals() {
        // Residuals [1, -1, 1, -1] => population σ = 1 (sample σ would be 1.1547).
        let fitted = [10.0, 10.0, 10.0, 10.0];
        let closes = [11.0, 9.0, 11.0, 9.0];
        let sd = residual_std_dev(&closes, &fitted).unwrap().unwrap();
        assert!((sd - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bands_are_ordered_pointwise() {
        let closes = wavy(60);
        let trend = fit_trend(&closes, 60);
        let bands = calculate_bands(&closes, &trend.fitted, &DEFAULT_MULTIPLIERS)
            .unwrap()
            .expect("bands");
        assert_eq!(bands.bands.len(), 6);
        let p3 = band(&bands, "+3σ");
        let p2 = band(&bands, "+2σ");
        let p1 = band(&bands, "+1σ");
        let m1 = band(&bands, "-1σ");
        let m2 = band(&bands, "-2σ");
        let m3 = band(&bands, "-3σ");
        for i in 0..closes.len() {
            let f = trend.fitted[i];
            assert!(m3[i] <= m2[i] && m2[i] <= m1[i] && m1[i] <= f);
            assert!(f <= p1[i] && p1[i] <= p2[i] && p2[i] <= p3[i]);
        }
    }

    #[test]
    fn bands_are_parallel_to_trend() {
        let closes = wavy(40);
        let trend = fit_trend(&closes, 40);
        let bands = calculate_bands(&closes, &trend.fitted, &[2.0]).unwrap().unwrap();
        let upper = band(&bands, "+2σ");
        for (u, f) in upper.iter().zip(&trend.fitted) {
            assert!((u - f - 2.0 * bands.std_dev).abs() < 1e-9);
        }
    }

    #[test]
    fn std_dev_invariant_to_constant_offset() {
        let closes = wavy(50);
        let shifted: Vec<f64> = closes.iter().map(|c| c + 1234.5).collect();
        let a = fit_trend(&closes, 50);
        let b = fit_trend(&shifted, 50);
        let sd_a = residual_std_dev(&closes, &a.fitted).unwrap().unwrap();
        let sd_b = residual_std_dev(&shifted, &b.fitted).unwrap().unwrap();
        assert!((sd_a - sd_b).abs() < 1e-9, "{sd_a} vs {sd_b}");
    }

    #[test]
    fn invalid_and_repeated_multipliers_are_dropped() {
        let closes = wavy(40);
        let trend = fit_trend(&closes, 40);
        let bands = calculate_bands(&closes, &trend.fitted, &[0.0, 2.0, -1.0, 2.0, f64::NAN, 1.0])
            .unwrap()
            .unwrap();
        let labels: Vec<&str> = bands.bands.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["+2σ", "-2σ", "+1σ", "-1σ"]);
    }

    #[test]
    fn labels_format_fractional_multipliers() {
        assert_eq!(band_label(1.0), "+1σ");
        assert_eq!(band_label(-2.0), "-2σ");
        assert_eq!(band_label(1.5), "+1.5σ");
    }
}
