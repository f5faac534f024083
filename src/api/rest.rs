// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Every failure is answered with a JSON
// body of the form `{ "error": "..." }` and a matching status code.  A symbol
// with no data is not a failure: the chart endpoint returns an empty payload.
//
// CORS is configured permissively so the dashboard can be served from any
// origin during development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::{AppState, ErrorRecord};
use crate::chart::table::Pane;
use crate::chart::{ChartRequest, IndicatorKind, INDICATOR_TABLE};
use crate::comparator::{self, AssetClass};
use crate::favorites::FavoritesStore;
use crate::types::BarInterval;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/indicators", get(indicators))
        .route("/api/v1/search", get(search))
        .route("/api/v1/chart/:symbol", get(chart))
        .route("/api/v1/benchmark/:symbol", get(benchmark))
        .route("/api/v1/favorites", get(list_favorites))
        .route(
            "/api/v1/favorites/:symbol",
            post(add_favorite).delete(remove_favorite),
        )
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: i64,
    last_error: Option<ErrorRecord>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
        last_error: state.recent_errors.read().last().cloned(),
    };
    Json(resp)
}

// =============================================================================
// Config
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().clone();
    Json(config)
}

// =============================================================================
// Indicator catalogue
// =============================================================================

#[derive(Serialize)]
struct IndicatorInfo {
    code: &'static str,
    label: &'static str,
    pane: Pane,
    requires: Vec<&'static str>,
}

async fn indicators() -> impl IntoResponse {
    let list: Vec<IndicatorInfo> = INDICATOR_TABLE
        .iter()
        .map(|spec| IndicatorInfo {
            code: spec.kind.code(),
            label: spec.label,
            pane: spec.pane,
            requires: spec.requires.iter().map(|k| k.code()).collect(),
        })
        .collect();
    Json(list)
}

// =============================================================================
// Symbol search
// =============================================================================

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(Vec::<String>::new()));
    }

    match state.source.search_symbols(query).await {
        Ok(symbols) => Ok(Json(symbols)),
        Err(e) => {
            warn!(query, error = %e, "symbol search failed");
            state.push_error(format!("{e:#}"), None);
            Err(api_error(StatusCode::BAD_GATEWAY, "symbol search unavailable"))
        }
    }
}

// =============================================================================
// Chart
// =============================================================================

#[derive(Deserialize)]
struct ChartParams {
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    lookback: Option<usize>,
    #[serde(default)]
    exclude: Option<usize>,
    /// Comma-separated indicator codes.
    #[serde(default)]
    indicators: Option<String>,
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<ChartParams>,
) -> Result<impl IntoResponse, ApiError> {
    let request = chart_request(&state, &symbol, params)?;
    info!(
        symbol = %request.symbol,
        interval = %request.interval,
        lookback = ?request.lookback,
        exclude = request.exclude,
        "chart requested"
    );
    Ok(Json(state.render_chart(request).await))
}

fn chart_request(state: &AppState, symbol: &str, params: ChartParams) -> Result<ChartRequest, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "symbol must not be empty"));
    }

    let config = state.config.read();

    let interval = match params.interval.as_deref() {
        None => config.interval,
        Some(code) => BarInterval::from_code(code).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Invalid interval: '{code}'. Use '1d', '1wk' or '1mo'."),
            )
        })?,
    };

    let mut indicators = Vec::new();
    for code in params.indicators.as_deref().unwrap_or("").split(',') {
        if code.trim().is_empty() {
            continue;
        }
        let kind = IndicatorKind::from_code(code).ok_or_else(|| {
            api_error(StatusCode::BAD_REQUEST, format!("Unknown indicator: '{}'", code.trim()))
        })?;
        if !indicators.contains(&kind) {
            indicators.push(kind);
        }
    }
    if params.indicators.is_none() {
        indicators = config.default_indicators.clone();
    }

    Ok(ChartRequest {
        symbol,
        interval,
        lookback: params.lookback,
        exclude: params.exclude.unwrap_or(0),
        indicators,
    })
}

// =============================================================================
// Benchmark classification
// =============================================================================

#[derive(Serialize)]
struct BenchmarkResponse {
    symbol: String,
    asset_class: AssetClass,
    benchmark: &'static str,
}

async fn benchmark(Path(symbol): Path<String>) -> impl IntoResponse {
    let symbol = symbol.trim().to_uppercase();
    Json(BenchmarkResponse {
        asset_class: comparator::classify_symbol(&symbol),
        benchmark: comparator::benchmark_for(&symbol),
        symbol,
    })
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Serialize)]
struct FavoritesResponse {
    symbol: Option<String>,
    changed: bool,
    favorites: Vec<String>,
}

async fn list_favorites(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let favorites = state.favorites.read().list().to_vec();
    Json(favorites)
}

async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut store = state.favorites.write();
    let mut updated = store.clone();
    let changed = updated.add(&symbol);
    if changed {
        persist_favorites(&updated)?;
        *store = updated;
        info!(symbol = %symbol, "favorite added");
    }
    Ok(Json(FavoritesResponse {
        symbol: Some(symbol.trim().to_uppercase()),
        changed,
        favorites: store.list().to_vec(),
    }))
}

async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut store = state.favorites.write();
    let mut updated = store.clone();
    if !updated.remove(&symbol) {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("'{}' is not a favorite", symbol.trim().to_uppercase()),
        ));
    }
    persist_favorites(&updated)?;
    *store = updated;
    info!(symbol = %symbol, "favorite removed");
    Ok(Json(FavoritesResponse {
        symbol: Some(symbol.trim().to_uppercase()),
        changed: true,
        favorites: store.list().to_vec(),
    }))
}

/// Save a candidate favorites list. The shared store is only replaced once
/// this succeeds.
fn persist_favorites(updated: &FavoritesStore) -> Result<(), ApiError> {
    updated.save().map_err(|e| {
        warn!(error = %e, path = %updated.path().display(), "Failed to save favorites to disk");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to save favorites")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use crate::market_data::source::memory::MemorySource;
    use crate::runtime_config::DashboardConfig;

    fn wavy(start: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| start + 0.8 * i as f64 + 3.0 * (i as f64 * 0.4).sin())
            .collect()
    }

    fn test_state(favorites_name: &str) -> Arc<AppState> {
        let dir = std::env::temp_dir().join(format!(
            "trendscope-api-{}-{favorites_name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        state_with_favorites(FavoritesStore::new(dir.join("favorites.json")))
    }

    fn state_with_favorites(favorites: FavoritesStore) -> Arc<AppState> {
        let source = MemorySource::default()
            .with("AAPL", wavy(150.0, 300))
            .with("^GSPC", wavy(3000.0, 300))
            .with("MC.PA", wavy(500.0, 300));
        Arc::new(AppState::new(
            DashboardConfig::default(),
            std::env::temp_dir().join("trendscope-api-unused-config.json"),
            favorites,
            Arc::new(source),
        ))
    }

    async fn call(state: &Arc<AppState>, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let state = test_state("health");
        let (status, body) = call(&state, Method::GET, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["last_error"].is_null());
    }

    #[tokio::test]
    async fn config_exposes_lookback_bounds() {
        let state = test_state("config");
        let (status, body) = call(&state, Method::GET, "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["max_lookback"], 780);
        assert_eq!(body["interval"], "1wk");
    }

    #[tokio::test]
    async fn indicators_list_prerequisites() {
        let state = test_state("indicators");
        let (status, body) = call(&state, Method::GET, "/api/v1/indicators").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[1]["code"], "standard_deviation");
        assert_eq!(list[1]["requires"], json!(["linear_regression"]));
        assert_eq!(list[3]["pane"], "oscillator");
    }

    #[tokio::test]
    async fn chart_uses_default_indicators() {
        let state = test_state("chart-default");
        let (status, body) = call(&state, Method::GET, "/api/v1/chart/aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["candles"].as_array().unwrap().len(), 300);
        // Regression plus six bands.
        assert_eq!(body["lines"].as_array().unwrap().len(), 7);
        assert!(body["summary"]["std_dev"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn chart_with_comparison_and_window() {
        let state = test_state("chart-compare");
        let (status, body) = call(
            &state,
            Method::GET,
            "/api/v1/chart/AAPL?lookback=100&exclude=10&indicators=linear_regression,market_regression",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lookback"], 100);
        assert_eq!(body["exclude"], 10);
        assert_eq!(body["benchmark"], "^GSPC");
        let lines = body["lines"].as_array().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["values"].as_array().unwrap().len(), 90);
        assert!(body["summary"]["comparison"]["verdict"].is_string());
    }

    #[tokio::test]
    async fn chart_rejects_unknown_indicator_and_interval() {
        let state = test_state("chart-bad");
        let (status, body) = call(&state, Method::GET, "/api/v1/chart/AAPL?indicators=macd").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("macd"));

        let (status, _) = call(&state, Method::GET, "/api/v1/chart/AAPL?interval=5m").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chart_for_unknown_symbol_is_empty_not_error() {
        let state = test_state("chart-unknown");
        let (status, body) = call(&state, Method::GET, "/api/v1/chart/NOPE").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["candles"].as_array().unwrap().is_empty());
        assert!(body["lines"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_returns_matches() {
        let state = test_state("search");
        let (status, body) = call(&state, Method::GET, "/api/v1/search?q=aa").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["AAPL"]));

        let (_, body) = call(&state, Method::GET, "/api/v1/search?q=").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn benchmark_classifies_symbol() {
        let state = test_state("benchmark");
        let (_, body) = call(&state, Method::GET, "/api/v1/benchmark/mc.pa").await;
        assert_eq!(body["benchmark"], "^FCHI");
        assert_eq!(body["asset_class"], "european");
        let (_, body) = call(&state, Method::GET, "/api/v1/benchmark/BTC-USD").await;
        assert_eq!(body["benchmark"], "BTC-USD");
    }

    #[tokio::test]
    async fn favorites_add_list_remove() {
        let state = test_state("favorites");

        let (status, body) = call(&state, Method::POST, "/api/v1/favorites/aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);

        let (_, body) = call(&state, Method::POST, "/api/v1/favorites/AAPL").await;
        assert_eq!(body["changed"], false);

        let (_, body) = call(&state, Method::GET, "/api/v1/favorites").await;
        assert_eq!(body, json!(["AAPL"]));
        assert!(state.favorites.read().path().exists());

        let (status, _) = call(&state, Method::DELETE, "/api/v1/favorites/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&state, Method::DELETE, "/api/v1/favorites/AAPL").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn failed_favorite_save_leaves_list_unchanged() {
        let state = state_with_favorites(FavoritesStore::new("/nonexistent-dir/favorites.json"));

        let (status, body) = call(&state, Method::POST, "/api/v1/favorites/AAPL").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());

        let (status, body) = call(&state, Method::GET, "/api/v1/favorites").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn failed_favorite_removal_keeps_symbol() {
        let mut store = FavoritesStore::new("/nonexistent-dir/favorites.json");
        store.add("AAPL");
        let state = state_with_favorites(store);

        let (status, _) = call(&state, Method::DELETE, "/api/v1/favorites/AAPL").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, body) = call(&state, Method::GET, "/api/v1/favorites").await;
        assert_eq!(body, json!(["AAPL"]));
    }
}
