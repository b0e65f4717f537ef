// src/index/mod.rs
//! Vector index collaborator: documents in, nearest neighbours out.
//!
//! All methods are blocking (embedding + disk I/O). Call them through
//! [`crate::worker::WorkerPool`] from async code.

pub mod embedder;
pub mod local;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use embedder::{Embedder, HashingEmbedder};
pub use local::LocalVectorIndex;

/// One query result, best match first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: Value,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

pub trait VectorIndex: Send + Sync {
    /// Add (or replace) a document.
    fn add(&self, id: &str, text: &str, metadata: &Value) -> Result<()>;
    /// Top `k` documents by similarity to `text`.
    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>>;
    /// Push buffered writes to durable storage.
    fn flush(&self) -> Result<()>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
