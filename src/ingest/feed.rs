// src/ingest/feed.rs
//! Static JSON-lines replay feed (one RawEvent object per line).

use crate::ingest::types::{EventSource, RawEvent};
use anyhow::{Context, Result};
use metrics::counter;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Parse JSON-lines content into raw events.
/// Returns the events in file order plus the number of skipped lines.
/// Blank lines are ignored; lines that are not JSON objects are skipped.
pub fn parse_jsonl(content: &str) -> (Vec<RawEvent>, usize) {
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(m)) => out.push(RawEvent(m)),
            Ok(_) => {
                skipped += 1;
                tracing::warn!(target: "feed", line = lineno + 1, "feed line is not a JSON object");
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(target: "feed", line = lineno + 1, error = %e, "malformed feed line");
            }
        }
    }
    (out, skipped)
}

/// Replays a JSON-lines file from disk.
pub struct JsonlFeed {
    path: PathBuf,
}

impl JsonlFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl EventSource for JsonlFeed {
    async fn fetch_all(&self) -> Result<Vec<RawEvent>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading feed from {}", self.path.display()))?;
        let (events, skipped) = parse_jsonl(&content);
        if skipped > 0 {
            counter!("feed_malformed_lines_total").increment(skipped as u64);
        }
        tracing::info!(
            target: "feed",
            path = %self.path.display(),
            events = events.len(),
            skipped,
            "feed loaded"
        );
        Ok(events)
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// In-memory source, handy for tests and demos.
pub struct VecSource {
    events: Vec<RawEvent>,
}

impl VecSource {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self { events }
    }
}

#[async_trait::async_trait]
impl EventSource for VecSource {
    async fn fetch_all(&self) -> Result<Vec<RawEvent>> {
        Ok(self.events.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
