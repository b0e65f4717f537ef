//! Dashboard HTTP surface. Every request re-reads the live feed in full.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

use crate::config::{clamp_window, DashboardConfig};
use crate::dashboard::{self, FeedView, TickerSeries};
use crate::live_feed::{read_feed, FeedRecord};

const INDEX_HTML: &str = include_str!("../assets/dashboard.html");

#[derive(Clone)]
pub struct AppState {
    live_feed_path: Arc<PathBuf>,
    cfg: Arc<DashboardConfig>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(live_feed_path: PathBuf, cfg: DashboardConfig) -> Self {
        Self {
            live_feed_path: Arc::new(live_feed_path),
            cfg: Arc::new(cfg),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/api/feed", get(feed))
        .route("/api/tickers", get(tickers))
        .route("/metrics", get(render_metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn load(state: &AppState) -> Result<Vec<FeedRecord>, (StatusCode, String)> {
    counter!("dashboard_polls_total").increment(1);
    read_feed(&state.live_feed_path).await.map_err(|e| {
        tracing::warn!(target: "dashboard", error = ?e, "live feed read failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })
}

#[derive(serde::Deserialize)]
struct FeedQuery {
    limit: Option<usize>,
}

async fn feed(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedView>, (StatusCode, String)> {
    let records = load(&state).await?;
    let limit = q.limit.unwrap_or(state.cfg.max_items).min(state.cfg.max_items);
    Ok(Json(dashboard::latest(&records, limit)))
}

#[derive(serde::Deserialize)]
struct TickersQuery {
    window: Option<usize>,
}

#[derive(serde::Serialize)]
struct TickersOut {
    window: usize,
    series: Vec<TickerSeries>,
}

async fn tickers(
    State(state): State<AppState>,
    Query(q): Query<TickersQuery>,
) -> Result<Json<TickersOut>, (StatusCode, String)> {
    let records = load(&state).await?;
    let window = clamp_window(q.window.unwrap_or(state.cfg.default_window));
    let series = dashboard::ticker_trends(
        &records,
        window,
        state.cfg.top_tickers,
        state.cfg.history_per_ticker,
    );
    Ok(Json(TickersOut { window, series }))
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(h) => h.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
