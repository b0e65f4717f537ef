// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod handler;
pub mod index;
pub mod ingest;
pub mod live_feed;
pub mod rag;
pub mod sentiment;
pub mod telemetry;
pub mod ticker;
pub mod worker;

// ---- Re-exports for stable public API ----
pub use crate::ingest::stream::{
    consume, run_events, run_pipeline, ConsumerStats, EventHandler, PipelineState, RunReport,
    StreamConfig,
};
pub use crate::ingest::types::{EventSource, NormalizedEvent, RawEvent};
pub use crate::ingest::{normalize_event, normalize_event_at};
