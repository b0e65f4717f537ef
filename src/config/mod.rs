// src/config/mod.rs
//! Pipeline configuration (TOML) with env-path override and sane defaults.

pub mod llm;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use llm::LlmConfig;

use crate::ingest::stream::StreamConfig;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

pub const MIN_WINDOW: usize = 3;
pub const MAX_WINDOW: usize = 100;

fn default_feed_path() -> PathBuf {
    PathBuf::from("data/sample_news.jsonl")
}
fn default_live_feed_path() -> PathBuf {
    PathBuf::from("data/live_feed.jsonl")
}
fn default_replay_delay_ms() -> u64 {
    1000
}
fn default_queue_capacity() -> usize {
    100
}
fn default_worker_threads() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_feed_path")]
    pub feed_path: PathBuf,
    #[serde(default = "default_live_feed_path")]
    pub live_feed_path: PathBuf,
    #[serde(default = "default_replay_delay_ms")]
    pub replay_delay_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Max concurrent blocking jobs (index writes/queries).
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed_path: default_feed_path(),
            live_feed_path: default_live_feed_path(),
            replay_delay_ms: default_replay_delay_ms(),
            queue_capacity: default_queue_capacity(),
            worker_threads: default_worker_threads(),
            index: IndexConfig::default(),
            llm: LlmConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: PathBuf,
    pub collection: String,
    pub dimension: usize,
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("index_db"),
            collection: "news".into(),
            dimension: 256,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    /// Items listed in the feed view.
    pub max_items: usize,
    /// Rolling window (events) when the request does not specify one.
    pub default_window: usize,
    pub top_tickers: usize,
    /// Most recent items per ticker fed into the rolling mean.
    pub history_per_ticker: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".into(),
            max_items: 50,
            default_window: 10,
            top_tickers: 4,
            history_per_ticker: 200,
        }
    }
}

/// Clamp a rolling window size into the supported range.
pub fn clamp_window(n: usize) -> usize {
    n.clamp(MIN_WINDOW, MAX_WINDOW)
}

impl PipelineConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) $PIPELINE_CONFIG_PATH (must exist)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    /// Bump zero sizes to one and clamp the dashboard window.
    pub fn sanitized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self.worker_threads = self.worker_threads.max(1);
        self.index.top_k = self.index.top_k.max(1);
        if self.index.dimension == 0 {
            self.index.dimension = IndexConfig::default().dimension;
        }
        if self.index.collection.trim().is_empty() {
            self.index.collection = IndexConfig::default().collection;
        }
        self.dashboard.default_window = clamp_window(self.dashboard.default_window);
        self.dashboard.max_items = self.dashboard.max_items.max(1);
        self.dashboard.history_per_ticker = self.dashboard.history_per_ticker.max(1);
        self
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            capacity: self.queue_capacity,
            delay: Duration::from_millis(self.replay_delay_ms),
        }
    }
}
