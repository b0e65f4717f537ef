// src/index/local.rs
//! Single-collection vector index kept in memory and persisted as JSON lines.
//!
//! Every `add` appends one line to `<dir>/<collection>.jsonl`. On open the file
//! is replayed; a later line with the same id replaces the earlier document.
//! Growth is unbounded; there is no compaction or eviction.

use super::embedder::{cosine, Embedder};
use super::{SearchHit, VectorIndex};
use anyhow::{anyhow, Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDoc {
    id: String,
    text: String,
    #[serde(default)]
    metadata: Value,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct Docs {
    items: Vec<StoredDoc>,
    by_id: HashMap<String, usize>,
}

impl Docs {
    fn upsert(&mut self, doc: StoredDoc) {
        match self.by_id.get(&doc.id) {
            Some(&i) => self.items[i] = doc,
            None => {
                self.by_id.insert(doc.id.clone(), self.items.len());
                self.items.push(doc);
            }
        }
    }
}

pub struct LocalVectorIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    docs: RwLock<Docs>,
    file: Mutex<File>,
}

impl LocalVectorIndex {
    /// Open (or create) `collection` under `dir`.
    pub fn open(dir: &Path, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating index dir {}", dir.display()))?;
        let path = dir.join(format!("{collection}.jsonl"));

        let mut docs = Docs::default();
        let mut skipped = 0usize;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading index {}", path.display()))?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<StoredDoc>(line) {
                    Ok(d) if d.embedding.len() == embedder.dimension() => docs.upsert(d),
                    _ => skipped += 1,
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening index {} for append", path.display()))?;

        tracing::info!(
            target: "index",
            path = %path.display(),
            docs = docs.items.len(),
            skipped,
            "vector index opened"
        );

        Ok(Self {
            path,
            embedder,
            docs: RwLock::new(docs),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VectorIndex for LocalVectorIndex {
    fn add(&self, id: &str, text: &str, metadata: &Value) -> Result<()> {
        let doc = StoredDoc {
            id: id.to_string(),
            text: text.to_string(),
            metadata: metadata.clone(),
            embedding: self.embedder.embed(text),
        };
        let mut line = serde_json::to_string(&doc).context("encoding index document")?;
        line.push('\n');

        {
            let mut f = self
                .file
                .lock()
                .map_err(|_| anyhow!("index file lock poisoned"))?;
            f.write_all(line.as_bytes())
                .with_context(|| format!("appending to {}", self.path.display()))?;
        }

        self.docs
            .write()
            .map_err(|_| anyhow!("index docs lock poisoned"))?
            .upsert(doc);
        counter!("index_documents_total").increment(1);
        Ok(())
    }

    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let q = self.embedder.embed(text);
        let docs = self
            .docs
            .read()
            .map_err(|_| anyhow!("index docs lock poisoned"))?;

        let mut scored: Vec<(f32, &StoredDoc)> = docs
            .items
            .iter()
            .map(|d| (cosine(&q, &d.embedding), d))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, d)| SearchHit {
                id: d.id.clone(),
                text: d.text.clone(),
                metadata: d.metadata.clone(),
                score,
            })
            .collect())
    }

    fn flush(&self) -> Result<()> {
        let f = self
            .file
            .lock()
            .map_err(|_| anyhow!("index file lock poisoned"))?;
        f.sync_all()
            .with_context(|| format!("syncing {}", self.path.display()))
    }

    fn len(&self) -> usize {
        self.docs.read().map(|d| d.items.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::HashingEmbedder;
    use serde_json::json;

    fn open(dir: &Path) -> LocalVectorIndex {
        LocalVectorIndex::open(dir, "news", Arc::new(HashingEmbedder::new(128))).unwrap()
    }

    #[test]
    fn add_then_query_ranks_relevant_first() {
        let tmp = tempfile::tempdir().unwrap();
        let idx = open(tmp.path());
        idx.add("1", "Tesla announces vehicle recall", &json!({"ticker": "TSLA"}))
            .unwrap();
        idx.add("2", "Bank lifts dividend on strong quarter", &json!({}))
            .unwrap();
        idx.add("3", "Oil prices drop on supply glut", &json!({}))
            .unwrap();

        let hits = idx.query("tesla recall", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[0].metadata["ticker"], "TSLA");
        assert!(hits[0].score >= hits[1].score);
        assert!(idx.query("anything", 0).unwrap().is_empty());
    }

    #[test]
    fn reopen_restores_documents_and_last_write_wins() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let idx = open(tmp.path());
            idx.add("a", "first version", &json!({})).unwrap();
            idx.add("b", "other doc", &json!({})).unwrap();
            idx.add("a", "second version", &json!({})).unwrap();
            assert_eq!(idx.len(), 2);
            idx.flush().unwrap();
        }
        // junk line appended by hand is skipped
        let path = tmp.path().join("news.jsonl");
        assert_eq!(open(tmp.path()).path(), path.as_path());
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{not json").unwrap();

        let idx = open(tmp.path());
        assert_eq!(idx.len(), 2);
        let hits = idx.query("second version", 1).unwrap();
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].text, "second version");
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let tmp = tempfile::tempdir().unwrap();
        let idx = open(tmp.path());
        assert!(idx.is_empty());
        assert!(idx.query("x", 3).unwrap().is_empty());
    }
}
