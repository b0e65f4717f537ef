// tests/api_http.rs
//
// HTTP-level tests for the dashboard Router without opening sockets.

use std::path::Path;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt as _;

use news_sentiment_stream::api::{create_router, AppState};
use news_sentiment_stream::config::DashboardConfig;

const BODY_LIMIT: usize = 1024 * 1024;

fn write_feed(path: &Path, rows: &[Value]) {
    let mut s = String::new();
    for r in rows {
        s.push_str(&r.to_string());
        s.push('\n');
    }
    s.push_str("not json at all\n");
    std::fs::write(path, s).unwrap();
}

fn sample_rows() -> Vec<Value> {
    vec![
        json!({"id": 1, "ticker": "ABC", "sentiment": 1.0, "text": "a1", "source": "wire",
               "summary": "s", "received_at": "2024-01-01T00:00:01+00:00"}),
        json!({"id": 2, "ticker": "XYZ", "sentiment": -1.0, "text": "x1", "source": "wire",
               "summary": "s", "received_at": "2024-01-01T00:00:02+00:00"}),
        json!({"id": 3, "ticker": "ABC", "sentiment": "oops", "text": "a2", "source": "wire",
               "summary": "s", "received_at": "2024-01-01T00:00:03+00:00"}),
        json!({"id": 4, "ticker": "ABC", "sentiment": 0.5, "text": "a3", "source": "wire",
               "summary": "s", "received_at": "2024-01-01T00:00:04+00:00"}),
    ]
}

fn router_over(dir: &TempDir, rows: Option<&[Value]>) -> Router {
    let path = dir.path().join("live_feed.jsonl");
    if let Some(rows) = rows {
        write_feed(&path, rows);
    }
    create_router(AppState::new(path, DashboardConfig::default()))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn get_json(app: Router, uri: &str) -> Value {
    let (status, bytes) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "GET {uri}");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_and_index_page() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(router_over(&dir, None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "ok");

    let (status, body) = get(router_over(&dir, None), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("/api/tickers"));
}

#[tokio::test]
async fn missing_live_feed_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let feed = get_json(router_over(&dir, None), "/api/feed").await;
    assert_eq!(feed["total"], 0);
    assert_eq!(feed["items"].as_array().unwrap().len(), 0);

    let ticks = get_json(router_over(&dir, None), "/api/tickers").await;
    assert!(ticks["series"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn feed_is_newest_first_and_skips_bad_lines() {
    let dir = tempfile::tempdir().unwrap();
    let rows = sample_rows();
    let feed = get_json(router_over(&dir, Some(&rows)), "/api/feed?limit=2").await;

    assert_eq!(feed["total"], 4);
    let items = feed["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 4);
    assert_eq!(items[1]["id"], 3);
    assert_eq!(items[1]["sentiment"], 0.0);
}

#[tokio::test]
async fn tickers_ranked_by_count_with_clamped_window() {
    let dir = tempfile::tempdir().unwrap();
    let rows = sample_rows();
    let ticks = get_json(router_over(&dir, Some(&rows)), "/api/tickers?window=1").await;

    assert_eq!(ticks["window"], 3);
    let series = ticks["series"].as_array().unwrap();
    assert_eq!(series[0]["ticker"], "ABC");
    assert_eq!(series[0]["count"], 3);
    assert_eq!(series[1]["ticker"], "XYZ");

    // ABC sentiments 1.0, 0.0, 0.5 over a window of 3: mean 0.5 everywhere.
    let abc: Vec<f64> = series[0]["rolling_mean"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(abc.len(), 3);
    for v in abc {
        assert!((v - 0.5).abs() < 1e-9);
    }
}

#[tokio::test]
async fn metrics_without_recorder_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = get(router_over(&dir, None), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
