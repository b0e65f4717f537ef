//! Wiring: build the collaborators, run one replay, shut them down.

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::api::{create_router, AppState};
use crate::config::PipelineConfig;
use crate::handler::EnrichHandler;
use crate::index::{HashingEmbedder, LocalVectorIndex, VectorIndex};
use crate::ingest::feed::JsonlFeed;
use crate::ingest::stream::{run_events, RunReport};
use crate::ingest::types::EventSource;
use crate::live_feed::FeedLog;
use crate::rag::RagSummarizer;
use crate::worker::WorkerPool;

/// Replay `cfg.feed_path` once through index → summarize → live feed.
///
/// The feed is loaded first, so an unreadable feed aborts before the index or the
/// live feed is touched. Both are flushed/closed after the run, whether or not it
/// succeeded.
pub async fn run_once(cfg: &PipelineConfig) -> Result<RunReport> {
    let source = JsonlFeed::new(&cfg.feed_path);
    let events = source
        .fetch_all()
        .await
        .with_context(|| format!("loading events from source `{}`", source.name()))?;

    let pool = WorkerPool::new(cfg.worker_threads);

    let index = {
        let dir = cfg.index.dir.clone();
        let collection = cfg.index.collection.clone();
        let embedder = Arc::new(HashingEmbedder::new(cfg.index.dimension));
        let idx = pool
            .run(move || LocalVectorIndex::open(&dir, &collection, embedder))
            .await
            .context("opening vector index")?;
        Arc::new(idx)
    };

    let llm = cfg
        .llm
        .clone()
        .resolve()
        .context("resolving llm config")?
        .build_client()?;
    let summarizer = RagSummarizer::new(index.clone(), pool.clone(), llm, cfg.index.top_k);
    let log = Arc::new(FeedLog::open(&cfg.live_feed_path).await?);
    tracing::info!(
        target: "pipeline",
        feed = %source.path().display(),
        events = events.len(),
        index = %index.path().display(),
        indexed = index.len(),
        live_feed = %log.path().display(),
        workers = pool.size(),
        summarizer = summarizer.provider_name(),
        "collaborators ready"
    );

    let handler = Arc::new(EnrichHandler::new(
        index.clone(),
        Arc::new(summarizer),
        log.clone(),
        pool.clone(),
    ));

    let report = run_events(events, handler, cfg.stream_config()).await;

    let idx = index.clone();
    if let Err(e) = pool.run(move || idx.flush()).await {
        tracing::warn!(target: "pipeline", error = ?e, "index flush failed");
    }
    if let Err(e) = log.close().await {
        tracing::warn!(target: "pipeline", error = ?e, "live feed close failed");
    }

    report
}

/// Serve the dashboard until the process is stopped.
pub async fn serve_dashboard(cfg: &PipelineConfig, metrics: Option<PrometheusHandle>) -> Result<()> {
    let mut state = AppState::new(cfg.live_feed_path.clone(), cfg.dashboard.clone());
    if let Some(h) = metrics {
        state = state.with_metrics(h);
    }
    let router = create_router(state);

    let listener = TcpListener::bind(&cfg.dashboard.bind)
        .await
        .with_context(|| format!("binding dashboard to {}", cfg.dashboard.bind))?;
    tracing::info!(
        target: "dashboard",
        addr = %cfg.dashboard.bind,
        live_feed = %cfg.live_feed_path.display(),
        "dashboard listening"
    );
    axum::serve(listener, router)
        .await
        .context("dashboard server")
}
