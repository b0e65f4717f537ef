//! Enrichment handler: index → summarize → append to the live feed.
//!
//! Collaborators are injected; the handler owns no global state. Blocking
//! index writes go through the worker pool. Any error propagates to the
//! consumer, which logs it and moves on.

use crate::index::VectorIndex;
use crate::ingest::stream::EventHandler;
use crate::ingest::types::NormalizedEvent;
use crate::live_feed::{EnrichedEvent, FeedLog};
use crate::rag::Summarizer;
use crate::worker::WorkerPool;
use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Characters of text used as the summary query when there is no ticker.
pub const QUERY_PREFIX_CHARS: usize = 80;

pub struct EnrichHandler {
    index: Arc<dyn VectorIndex>,
    summarizer: Arc<dyn Summarizer>,
    log: Arc<FeedLog>,
    pool: WorkerPool,
}

impl EnrichHandler {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        summarizer: Arc<dyn Summarizer>,
        log: Arc<FeedLog>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            index,
            summarizer,
            log,
            pool,
        }
    }
}

/// Index document id: the event id rendered as a string, or a short content
/// hash when the event has none. The record itself keeps its original id.
pub fn document_id(event: &NormalizedEvent) -> String {
    match &event.id {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) | None => content_hash(event),
        Some(other) => other.to_string(),
    }
}

fn content_hash(event: &NormalizedEvent) -> String {
    let mut h = Sha256::new();
    h.update(event.timestamp.as_bytes());
    h.update([0u8]);
    h.update(event.source.as_bytes());
    h.update([0u8]);
    h.update(event.text.as_bytes());
    let digest = h.finalize();
    let mut out = String::with_capacity(20);
    out.push_str("sha-");
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Ticker when present, else the first [`QUERY_PREFIX_CHARS`] characters of text.
pub fn summary_query(event: &NormalizedEvent) -> String {
    match &event.ticker {
        Some(t) => t.clone(),
        None => event.text.chars().take(QUERY_PREFIX_CHARS).collect(),
    }
}

#[async_trait::async_trait]
impl EventHandler for EnrichHandler {
    async fn handle(&self, event: NormalizedEvent) -> Result<()> {
        let doc_id = document_id(&event);

        // 1) index
        let index = self.index.clone();
        let (id, text) = (doc_id.clone(), event.text.clone());
        let metadata = serde_json::to_value(&event).context("encoding index metadata")?;
        self.pool
            .run(move || index.add(&id, &text, &metadata))
            .await
            .with_context(|| format!("indexing {doc_id}"))?;

        // 2) grounded summary
        let query = summary_query(&event);
        let summary = self
            .summarizer
            .summarize(&query)
            .await
            .with_context(|| format!("summarizing {doc_id}"))?;

        // 3) persist
        let enriched = EnrichedEvent {
            event,
            summary,
            received_at: chrono::Utc::now().to_rfc3339(),
        };
        self.log.append(&enriched).await?;

        let preview: String = enriched.summary.chars().take(80).collect();
        tracing::info!(
            target: "handler",
            doc_id = %doc_id,
            ticker = ?enriched.event.ticker,
            sentiment = enriched.event.sentiment,
            summary = %preview,
            "handled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(id: Option<Value>, ticker: Option<&str>, text: &str) -> NormalizedEvent {
        NormalizedEvent {
            id,
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            ticker: ticker.map(str::to_string),
            source: "wire".into(),
            text: text.into(),
            sentiment: 0.0,
        }
    }

    #[test]
    fn document_id_prefers_event_id() {
        assert_eq!(document_id(&ev(Some(json!("n-1")), None, "x")), "n-1");
        assert_eq!(document_id(&ev(Some(json!(7)), None, "x")), "7");
    }

    #[test]
    fn document_id_hash_fallback_is_stable() {
        let a = document_id(&ev(None, None, "same text"));
        let b = document_id(&ev(Some(json!("")), None, "same text"));
        let c = document_id(&ev(None, None, "other text"));
        assert!(a.starts_with("sha-"));
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn query_uses_ticker_or_text_prefix() {
        assert_eq!(summary_query(&ev(None, Some("ABC"), "whatever")), "ABC");
        let long = "y".repeat(200);
        assert_eq!(summary_query(&ev(None, None, &long)).len(), QUERY_PREFIX_CHARS);
        assert_eq!(summary_query(&ev(None, None, "short")), "short");
    }
}
