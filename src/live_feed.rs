//! Append-only JSON-lines log of enriched events.
//!
//! The pipeline appends; the dashboard re-reads the whole file on every poll.
//! Readers and writers race on the same file, so readers skip lines that do
//! not parse and coerce odd field types instead of failing.

use crate::ingest::types::NormalizedEvent;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// A normalized event plus the enrichment appended by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: NormalizedEvent,
    pub summary: String,
    /// ISO-8601 time the enrichment completed.
    pub received_at: String,
}

/// Writer side. Opened once per run, closed at shutdown.
pub struct FeedLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FeedLog {
    /// Open `path` for appending, creating parent directories as needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening live feed {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub async fn append(&self, record: &EnrichedEvent) -> Result<()> {
        let mut line = serde_json::to_string(record).context("encoding live feed record")?;
        line.push('\n');
        let mut guard = self.file.lock().await;
        let f = guard
            .as_mut()
            .ok_or_else(|| anyhow!("live feed {} already closed", self.path.display()))?;
        f.write_all(line.as_bytes())
            .await
            .with_context(|| format!("appending to {}", self.path.display()))?;
        f.flush().await?;
        Ok(())
    }

    /// Flush to disk and release the handle. Later appends fail.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.file.lock().await;
        if let Some(mut f) = guard.take() {
            f.flush().await?;
            f.sync_all()
                .await
                .with_context(|| format!("syncing {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Reader-side view of one log line. Every field is optional or defaulted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedRecord {
    pub id: Option<Value>,
    pub timestamp: Option<String>,
    pub ticker: Option<String>,
    pub source: String,
    pub text: String,
    /// Non-numeric or missing values read as 0.0.
    pub sentiment: f64,
    pub summary: String,
    pub received_at: Option<String>,
}

fn lenient_f64(v: Option<&Value>) -> f64 {
    let x = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    x.filter(|f| f.is_finite()).unwrap_or(0.0)
}

fn opt_string(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl FeedRecord {
    /// `None` unless `v` is a JSON object.
    pub fn from_value(v: &Value) -> Option<Self> {
        let m = v.as_object()?;
        Some(Self {
            id: m.get("id").filter(|v| !v.is_null()).cloned(),
            timestamp: opt_string(m.get("timestamp")),
            ticker: opt_string(m.get("ticker")),
            source: opt_string(m.get("source")).unwrap_or_default(),
            text: opt_string(m.get("text")).unwrap_or_default(),
            sentiment: lenient_f64(m.get("sentiment")),
            summary: opt_string(m.get("summary")).unwrap_or_default(),
            received_at: opt_string(m.get("received_at")),
        })
    }

    /// Sort key: `received_at`, falling back to `timestamp`.
    pub fn sort_key(&self) -> &str {
        self.received_at
            .as_deref()
            .or(self.timestamp.as_deref())
            .unwrap_or("")
    }
}

/// Parse log content, returning records in file order and the number of skipped lines.
pub fn parse_feed(content: &str) -> (Vec<FeedRecord>, usize) {
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line)
            .ok()
            .as_ref()
            .and_then(FeedRecord::from_value)
        {
            Some(r) => out.push(r),
            None => skipped += 1,
        }
    }
    (out, skipped)
}

/// Read the whole log. A missing file reads as empty.
pub async fn read_feed(path: &Path) -> Result<Vec<FeedRecord>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading live feed {}", path.display()));
        }
    };
    let (records, skipped) = parse_feed(&content);
    if skipped > 0 {
        tracing::debug!(target: "feed", skipped, "live feed lines skipped");
    }
    Ok(records)
}
