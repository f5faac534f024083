// =============================================================================
// Yahoo Finance Client — historical bars and symbol search
// =============================================================================
//
// Public endpoints only, no authentication.  The chart endpoint returns
// column arrays (timestamp, open, high, low, close) in which any entry may be
// null; such bars are dropped.  Weekly data sometimes repeats the current
// week's timestamp, in which case the later bar wins.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use tracing::{debug, instrument, warn};

use crate::market_data::{PriceBar, PriceSeries, SeriesSource};
use crate::types::BarInterval;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com";
const SEARCH_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Yahoo rejects requests without a browser-like agent.
const AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) trendscope/1.0";

/// Yahoo Finance REST client.
#[derive(Clone)]
pub struct YahooClient {
    chart_base: String,
    search_base: String,
    history_range: String,
    search_limit: usize,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client that downloads `history_range` (e.g. `15y`) of bars and
    /// returns at most `search_limit` search hits.
    pub fn new(history_range: impl Into<String>, search_limit: usize) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let history_range = history_range.into();
        debug!(range = %history_range, "YahooClient initialised");

        Ok(Self {
            chart_base: CHART_BASE_URL.to_string(),
            search_base: SEARCH_BASE_URL.to_string(),
            history_range,
            search_limit,
            client,
        })
    }

    // -------------------------------------------------------------------------
    // Historical bars
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{symbol}.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(&self, symbol: &str, interval: BarInterval) -> Result<PriceSeries> {
        let mut url = Url::parse(&self.chart_base).context("invalid chart base url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("chart base url cannot take a path"))?
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("interval", interval.as_code())
            .append_pair("range", &self.history_range)
            .append_pair("events", "history");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse chart response")?;

        let series = parse_chart(symbol, interval, &body)
            .with_context(|| format!("Yahoo chart for {symbol} returned {status}"))?;

        debug!(symbol, %interval, count = series.len(), "chart fetched");
        Ok(series)
    }

    // -------------------------------------------------------------------------
    // Symbol search
    // -------------------------------------------------------------------------

    /// GET /v1/finance/search.
    #[instrument(skip(self), name = "yahoo::search")]
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = Url::parse(&self.search_base).context("invalid search base url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("search base url cannot take a path"))?
            .extend(["v1", "finance", "search"]);
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("quotesCount", &self.search_limit.to_string())
            .append_pair("newsCount", "0");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v1/finance/search request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse search response")?;

        if !status.is_success() {
            anyhow::bail!("Yahoo GET /v1/finance/search returned {}: {}", status, body);
        }

        let symbols = parse_search(&body, self.search_limit);
        debug!(query, count = symbols.len(), "search completed");
        Ok(symbols)
    }
}

#[async_trait]
impl SeriesSource for YahooClient {
    async fn fetch_series(&self, symbol: &str, interval: BarInterval) -> Result<PriceSeries> {
        self.get_chart(symbol, interval).await
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<String>> {
        self.search(query).await
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("chart_base", &self.chart_base)
            .field("history_range", &self.history_range)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Parse a chart response body into a series.
///
/// A "Not Found" error from Yahoo maps to an empty series; any other error
/// payload is a failure.
fn parse_chart(symbol: &str, interval: BarInterval, body: &serde_json::Value) -> Result<PriceSeries> {
    let chart = &body["chart"];

    if let Some(err) = chart["error"].as_object() {
        let code = err.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
        let description = err.get("description").and_then(|v| v.as_str()).unwrap_or("");
        if code == "Not Found" {
            debug!(symbol, description, "symbol has no chart data");
            return Ok(PriceSeries::empty(symbol, interval));
        }
        anyhow::bail!("chart error {code}: {description}");
    }

    let Some(result) = chart["result"].as_array().and_then(|r| r.first()) else {
        return Ok(PriceSeries::empty(symbol, interval));
    };

    let Some(timestamps) = result["timestamp"].as_array() else {
        // Valid symbol with no bars in range.
        return Ok(PriceSeries::empty(symbol, interval));
    };

    let quote = &result["indicators"]["quote"][0];
    let open = quote_column(quote, "open")?;
    let high = quote_column(quote, "high")?;
    let low = quote_column(quote, "low")?;
    let close = quote_column(quote, "close")?;

    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, ts) in timestamps.iter().enumerate() {
        let fields = (
            ts.as_i64().and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
            value_at(open, i),
            value_at(high, i),
            value_at(low, i),
            value_at(close, i),
        );
        let (Some(t), Some(o), Some(h), Some(l), Some(c)) = fields else {
            skipped += 1;
            continue;
        };
        let bar = PriceBar::new(t, o, h, l, c);

        match bars.last().map(|prev| prev.timestamp) {
            Some(prev) if prev == t => {
                bars.pop();
                bars.push(bar);
            }
            Some(prev) if prev > t => skipped += 1,
            _ => bars.push(bar),
        }
    }

    if skipped > 0 {
        warn!(symbol, skipped, "dropped incomplete or out-of-order bars");
    }

    Ok(PriceSeries::new(symbol, interval, bars)?)
}

fn quote_column<'a>(quote: &'a serde_json::Value, name: &str) -> Result<&'a Vec<serde_json::Value>> {
    quote[name]
        .as_array()
        .with_context(|| format!("chart response missing quote column '{name}'"))
}

fn value_at(column: &[serde_json::Value], i: usize) -> Option<f64> {
    column.get(i)?.as_f64().filter(|v| v.is_finite() && *v > 0.0)
}

/// Extract up to `limit` ticker symbols from a search response.
fn parse_search(body: &serde_json::Value, limit: usize) -> Vec<String> {
    body["quotes"]
        .as_array()
        .map(|quotes| {
            quotes
                .iter()
                .filter_map(|q| q["symbol"].as_str())
                .map(str::to_string)
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
