// =============================================================================
// Central Application State — Trendscope
// =============================================================================
//
// Ties together the dashboard config, the favorites store and the series
// source, and runs the fetch-then-compute pipeline for one chart request.
//
// Thread safety:
//   - parking_lot::RwLock for the config, favorites and error log.
//   - The series source is shared behind `Arc<dyn SeriesSource>` and manages
//     its own interior mutability (cache).
//   - Lock guards are never held across an `.await`.
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart::{build_chart, resolve_window, BenchmarkTrend, ChartPayload, ChartRequest, IndicatorKind};
use crate::comparator;
use crate::favorites::FavoritesStore;
use crate::market_data::{PriceSeries, SeriesSource};
use crate::runtime_config::DashboardConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded fetch failure for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Symbol the failure relates to, if any.
    pub symbol: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// AppState
// =============================================================================

/// Shared across all handlers via `Arc<AppState>`.
pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: RwLock<DashboardConfig>,
    /// Where the config is saved on shutdown.
    pub config_path: PathBuf,

    // ── User data ───────────────────────────────────────────────────────
    pub favorites: RwLock<FavoritesStore>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub source: Arc<dyn SeriesSource>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: DashboardConfig,
        config_path: impl Into<PathBuf>,
        favorites: FavoritesStore,
        source: Arc<dyn SeriesSource>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            config_path: config_path.into(),
            favorites: RwLock::new(favorites),
            source,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record a failure. Oldest entries are evicted past
    /// [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, message: String, symbol: Option<&str>) {
        let mut errors = self.recent_errors.write();
        if errors.len() >= MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        errors.push(ErrorRecord {
            message,
            symbol: symbol.map(str::to_string),
            at: Utc::now().to_rfc3339(),
        });
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // ── Chart rendering ─────────────────────────────────────────────────

    /// Fetch the asset (and benchmark, if needed) and compute every selected
    /// indicator.
    ///
    /// A failed asset fetch answers with an empty payload. A failed benchmark
    /// fetch only drops the comparison.
    pub async fn render_chart(&self, request: ChartRequest) -> ChartPayload {
        let config = self.config.read().clone();

        let series = match self.source.fetch_series(&request.symbol, request.interval).await {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "series fetch failed");
                self.push_error(format!("{e:#}"), Some(&request.symbol));
                PriceSeries::empty(&request.symbol, request.interval)
            }
        };

        if series.is_empty() {
            info!(symbol = %request.symbol, interval = %request.interval, "no data for symbol");
            return build_chart(&request, &series, None, &config);
        }

        let benchmark = if wants_benchmark(&request) {
            self.fetch_benchmark(&request, &series, &config).await
        } else {
            None
        };

        let payload = build_chart(&request, &series, benchmark.as_ref(), &config);
        debug!(
            symbol = %payload.symbol,
            lookback = payload.lookback,
            exclude = payload.exclude,
            lines = payload.lines.len(),
            "chart rendered"
        );
        payload
    }

    async fn fetch_benchmark(
        &self,
        request: &ChartRequest,
        series: &PriceSeries,
        config: &DashboardConfig,
    ) -> Option<BenchmarkTrend> {
        let symbol = comparator::benchmark_for(&request.symbol);
        let window = resolve_window(request, config, series.len());

        match self.source.fetch_series(symbol, request.interval).await {
            Ok(bench) if !bench.is_empty() => {
                let fitted = BenchmarkTrend::fit(&bench, series.window(window));
                if fitted.is_none() {
                    warn!(benchmark = symbol, "benchmark dates do not cover the asset window, comparison unavailable");
                }
                fitted
            }
            Ok(_) => {
                warn!(benchmark = symbol, "benchmark returned no data, comparison unavailable");
                None
            }
            Err(e) => {
                warn!(benchmark = symbol, error = %e, "benchmark fetch failed, comparison unavailable");
                self.push_error(format!("{e:#}"), Some(symbol));
                None
            }
        }
    }

    /// Persist the current config to `config_path`.
    pub fn save_config(&self) -> anyhow::Result<()> {
        self.config.read().save(&self.config_path)
    }
}

fn wants_benchmark(request: &ChartRequest) -> bool {
    request.indicators.contains(&IndicatorKind::MarketRegression)
        && request.indicators.contains(&IndicatorKind::LinearRegression)
}
