// =============================================================================
// Dashboard Configuration — indicator defaults and service settings
// =============================================================================
//
// Every tunable parameter of the dashboard lives here: default bar interval,
// lookback bounds, indicator windows, benchmark projection, cache lifetime.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chart::IndicatorKind;
use crate::indicators::{dispersion, rsi, sma};
use crate::types::{BarInterval, ProjectionMode};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_history_range() -> String {
    "15y".to_string()
}

fn default_max_lookback() -> usize {
    780
}

fn default_min_lookback() -> usize {
    50
}

fn default_lookback_step() -> usize {
    50
}

fn default_band_multipliers() -> Vec<f64> {
    dispersion::DEFAULT_MULTIPLIERS.to_vec()
}

fn default_sma_short() -> usize {
    sma::SHORT_WINDOW
}

fn default_sma_long() -> usize {
    sma::LONG_WINDOW
}

fn default_rsi_period() -> usize {
    rsi::DEFAULT_PERIOD
}

fn default_indicators() -> Vec<IndicatorKind> {
    vec![IndicatorKind::LinearRegression, IndicatorKind::StandardDeviation]
}

fn default_cache_ttl_secs() -> u64 {
    900
}

fn default_search_limit() -> usize {
    10
}

fn default_favorites_path() -> String {
    "favorites.json".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Window sizes and multipliers for the indicator estimators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// Standard-deviation multiples drawn around the trend line.
    #[serde(default = "default_band_multipliers")]
    pub band_multipliers: Vec<f64>,

    /// Short SMA window (bars).
    #[serde(default = "default_sma_short")]
    pub sma_short: usize,

    /// Long SMA window (bars).
    #[serde(default = "default_sma_long")]
    pub sma_long: usize,

    /// RSI look-back period (bars).
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// How the benchmark slope is projected onto the asset.
    #[serde(default)]
    pub projection: ProjectionMode,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            band_multipliers: default_band_multipliers(),
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
            rsi_period: default_rsi_period(),
            projection: ProjectionMode::default(),
        }
    }
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Data ----------------------------------------------------------------

    /// Bar interval used when a request does not name one.
    #[serde(default)]
    pub interval: BarInterval,

    /// History range requested from the data provider (e.g. `15y`).
    #[serde(default = "default_history_range")]
    pub history_range: String,

    /// Fetched series are reused for this many seconds. 0 disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of symbol suggestions returned by search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    // --- Regression window ---------------------------------------------------

    /// Upper bound on the regression lookback (bars).
    #[serde(default = "default_max_lookback")]
    pub max_lookback: usize,

    /// Lower bound on the regression lookback (bars).
    #[serde(default = "default_min_lookback")]
    pub min_lookback: usize,

    /// Granularity of the lookback selector (bars).
    #[serde(default = "default_lookback_step")]
    pub lookback_step: usize,

    // --- Indicators ----------------------------------------------------------

    /// Indicators drawn when a request does not list any.
    #[serde(default = "default_indicators")]
    pub default_indicators: Vec<IndicatorKind>,

    #[serde(default)]
    pub indicator_params: IndicatorParams,

    // --- Service -------------------------------------------------------------

    /// Favorites file location.
    #[serde(default = "default_favorites_path")]
    pub favorites_path: String,

    /// HTTP listen address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            interval: BarInterval::default(),
            history_range: default_history_range(),
            cache_ttl_secs: default_cache_ttl_secs(),
            search_limit: default_search_limit(),
            max_lookback: default_max_lookback(),
            min_lookback: default_min_lookback(),
            lookback_step: default_lookback_step(),
            default_indicators: default_indicators(),
            indicator_params: IndicatorParams::default(),
            favorites_path: default_favorites_path(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            interval = %config.interval,
            max_lookback = config.max_lookback,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise dashboard config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "dashboard config saved (atomic)");
        Ok(())
    }

    /// Clamp a requested lookback to `[min_lookback, min(max_lookback, len)]`.
    ///
    /// `None` picks the largest allowed value. A series shorter than
    /// `min_lookback` uses its full length.
    pub fn clamp_lookback(&self, requested: Option<usize>, len: usize) -> usize {
        let upper = self.max_lookback.min(len);
        let lower = self.min_lookback.min(upper);
        requested.unwrap_or(upper).clamp(lower, upper)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.interval, BarInterval::Weekly);
        assert_eq!(cfg.max_lookback, 780);
        assert_eq!(cfg.min_lookback, 50);
        assert_eq!(cfg.indicator_params.sma_short, 50);
        assert_eq!(cfg.indicator_params.sma_long, 200);
        assert_eq!(cfg.indicator_params.rsi_period, 14);
        assert_eq!(cfg.indicator_params.band_multipliers, vec![1.0, 2.0, 3.0]);
        assert_eq!(cfg.indicator_params.projection, ProjectionMode::RawSlope);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.interval, BarInterval::Weekly);
        assert_eq!(cfg.history_range, "15y");
        assert_eq!(cfg.favorites_path, "favorites.json");
        assert_eq!(cfg.indicator_params.rsi_period, 14);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "interval": "1d", "indicator_params": { "projection": "relative_slope" } }"#;
        let cfg: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.interval, BarInterval::Daily);
        assert_eq!(cfg.indicator_params.projection, ProjectionMode::RelativeSlope);
        assert_eq!(cfg.indicator_params.sma_long, 200);
        assert_eq!(cfg.max_lookback, 780);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("trendscope-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut cfg = DashboardConfig::default();
        cfg.max_lookback = 520;
        cfg.save(&path).unwrap();
        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded.max_lookback, 520);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(DashboardConfig::load("/definitely/not/here.json").is_err());
    }

    #[test]
    fn lookback_clamping() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.clamp_lookback(None, 1000), 780);
        assert_eq!(cfg.clamp_lookback(None, 300), 300);
        assert_eq!(cfg.clamp_lookback(Some(10), 300), 50);
        assert_eq!(cfg.clamp_lookback(Some(5000), 300), 300);
        assert_eq!(cfg.clamp_lookback(Some(100), 30), 30);
        assert_eq!(cfg.clamp_lookback(None, 0), 0);
    }
}
