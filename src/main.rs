// =============================================================================
// Trendscope — Main Entry Point
// =============================================================================
//
// Serves the trend dashboard API: historical series from Yahoo Finance,
// regression trend with dispersion bands, moving averages, RSI and a
// benchmark comparison, all computed per request.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod chart;
mod comparator;
mod favorites;
mod indicators;
mod market_data;
mod runtime_config;
mod types;
mod yahoo;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::favorites::FavoritesStore;
use crate::market_data::CachedSource;
use crate::runtime_config::DashboardConfig;
use crate::yahoo::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "trendscope_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Trendscope starting up");

    let config_path =
        std::env::var("TRENDSCOPE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        DashboardConfig::default()
    });

    if let Ok(addr) = std::env::var("TRENDSCOPE_BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Ok(path) = std::env::var("TRENDSCOPE_FAVORITES") {
        config.favorites_path = path;
    }

    info!(
        interval = %config.interval,
        range = %config.history_range,
        projection = %config.indicator_params.projection,
        "Dashboard configured"
    );

    // ── 2. Favorites ─────────────────────────────────────────────────────
    let favorites = FavoritesStore::load(&config.favorites_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load favorites, starting empty");
        FavoritesStore::new(&config.favorites_path)
    });

    // ── 3. Series source ─────────────────────────────────────────────────
    let yahoo = YahooClient::new(config.history_range.clone(), config.search_limit)?;
    let source = Arc::new(CachedSource::new(
        yahoo,
        Duration::from_secs(config.cache_ttl_secs),
    ));

    // Periodic eviction of expired series.
    if config.cache_ttl_secs > 0 {
        let purge_source = source.clone();
        let period = Duration::from_secs(config.cache_ttl_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let purged = purge_source.cache().purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = purge_source.cache().len(), "series cache purged");
                }
            }
        });
    }

    // ── 4. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, config_path, favorites, source));

    // ── 5. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    if let Err(e) = state.save_config() {
        error!(error = %e, "Failed to save dashboard config on shutdown");
    }

    info!("Trendscope shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C, serving until killed");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
