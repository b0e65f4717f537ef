// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unvalidated input record as read from the feed. Any JSON object is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RawEvent(pub Map<String, Value>);

impl RawEvent {
    /// String field, `None` when absent or not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Opaque id; `None` when absent or explicitly null.
    pub fn id(&self) -> Option<Value> {
        match self.0.get("id") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.clone()),
        }
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Value> for RawEvent {
    fn from(v: Value) -> Self {
        match v {
            Value::Object(m) => RawEvent(m),
            _ => RawEvent::default(),
        }
    }
}

/// Canonical record produced by normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedEvent {
    pub id: Option<Value>,
    /// ISO-8601 (RFC 3339, UTC).
    pub timestamp: String,
    pub ticker: Option<String>,
    pub source: String,
    pub text: String,
    /// Always within `[-1.0, 1.0]`.
    pub sentiment: f64,
}

/// A finite, ordered source of raw events, consumed once per run.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<RawEvent>>;
    fn name(&self) -> &str;
}
