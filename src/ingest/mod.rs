// src/ingest/mod.rs
pub mod feed;
pub mod stream;
pub mod types;

use crate::ingest::types::{NormalizedEvent, RawEvent};
use crate::sentiment::score_text;
use crate::ticker::extract_ticker;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_published_total",
            "Normalized events published by the producer."
        );
        describe_counter!(
            "pipeline_handled_total",
            "Events acknowledged by the consumer after a successful handler run."
        );
        describe_counter!(
            "pipeline_handler_errors_total",
            "Handler invocations that returned an error or panicked."
        );
        describe_counter!(
            "feed_malformed_lines_total",
            "JSON-lines records skipped because they did not parse."
        );
        describe_counter!(
            "index_documents_total",
            "Documents written to the vector index."
        );
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last finished a run."
        );
    });
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse an ISO-8601 timestamp. Offset-less values are taken as UTC,
/// bare dates as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize with an injected clock. `now` is only used when the event's
/// timestamp is missing or unparsable.
pub fn normalize_event_at(raw: &RawEvent, now: DateTime<Utc>) -> NormalizedEvent {
    let text = raw.str_field("text").unwrap_or_default().to_string();
    let timestamp = raw
        .str_field("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or(now)
        .to_rfc3339();

    NormalizedEvent {
        id: raw.id(),
        timestamp,
        ticker: extract_ticker(&text, raw.metadata()),
        source: raw.str_field("source").unwrap_or_default().to_string(),
        sentiment: score_text(&text),
        text,
    }
}

/// Normalize using the wall clock for the timestamp fallback.
pub fn normalize_event(raw: &RawEvent) -> NormalizedEvent {
    normalize_event_at(raw, Utc::now())
}
