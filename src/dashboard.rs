//! # Dashboard
//! Pure views over the live feed: latest items and per-ticker rolling sentiment.
//!
//! The HTTP layer (see `api`) re-reads the whole log on each poll and feeds
//! the records through these functions; nothing is cached between polls.

use crate::ingest::parse_timestamp;
use crate::live_feed::FeedRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Most recent items first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedView {
    pub total: usize,
    pub items: Vec<FeedRecord>,
}

/// Rolling sentiment trend for one ticker, oldest point first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TickerSeries {
    pub ticker: String,
    /// Items for this ticker across the whole feed.
    pub count: usize,
    pub window: usize,
    pub received_at: Vec<String>,
    pub rolling_mean: Vec<f64>,
}

fn event_time(r: &FeedRecord) -> Option<DateTime<Utc>> {
    parse_timestamp(r.sort_key())
}

/// Records ordered oldest → newest. Undated records sort first; ties keep file order.
fn chronological(records: &[FeedRecord]) -> Vec<&FeedRecord> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &FeedRecord)> =
        records.iter().map(|r| (event_time(r), r)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, r)| r).collect()
}

/// Latest `max_items` records, newest first.
pub fn latest(records: &[FeedRecord], max_items: usize) -> FeedView {
    let mut ordered = chronological(records);
    ordered.reverse();
    FeedView {
        total: records.len(),
        items: ordered.into_iter().take(max_items).cloned().collect(),
    }
}

/// Trailing mean over `window` points (shrunk to `values.len()` when larger).
/// Leading positions without a full window take the first full-window mean.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let w = window.clamp(1, values.len());
    let mut out = vec![0.0; values.len()];
    let mut sum: f64 = values[..w].iter().sum();
    out[w - 1] = sum / w as f64;
    for i in w..values.len() {
        sum += values[i] - values[i - w];
        out[i] = sum / w as f64;
    }
    let first = out[w - 1];
    out[..w - 1].iter_mut().for_each(|x| *x = first);
    out
}

/// Tickers ranked by item count (ties by name), at most `top_n`.
pub fn top_tickers(records: &[FeedRecord], top_n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        if let Some(t) = r.ticker.as_deref() {
            *counts.entry(t).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(t, n)| (t.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

/// Rolling sentiment for the `top_n` busiest tickers, using each ticker's
/// last `history` items in time order.
pub fn ticker_trends(
    records: &[FeedRecord],
    window: usize,
    top_n: usize,
    history: usize,
) -> Vec<TickerSeries> {
    let ordered = chronological(records);
    top_tickers(records, top_n)
        .into_iter()
        .map(|(ticker, count)| {
            let rows: Vec<&FeedRecord> = ordered
                .iter()
                .copied()
                .filter(|r| r.ticker.as_deref() == Some(ticker.as_str()))
                .collect();
            let rows = &rows[rows.len().saturating_sub(history)..];
            let values: Vec<f64> = rows.iter().map(|r| r.sentiment).collect();
            TickerSeries {
                window: window.min(values.len()),
                received_at: rows.iter().map(|r| r.sort_key().to_string()).collect(),
                rolling_mean: rolling_mean(&values, window),
                ticker,
                count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ticker: Option<&str>, sentiment: f64, received_at: &str) -> FeedRecord {
        FeedRecord {
            id: None,
            timestamp: None,
            ticker: ticker.map(str::to_string),
            source: String::new(),
            text: String::new(),
            sentiment,
            summary: String::new(),
            received_at: Some(received_at.to_string()),
        }
    }

    #[test]
    fn rolling_mean_backfills_leading_points() {
        let out = rolling_mean(&[1.0, 0.0, -1.0, 1.0], 2);
        assert_eq!(out, vec![0.5, 0.5, -0.5, 0.0]);
    }

    #[test]
    fn rolling_window_shrinks_to_series_length() {
        let out = rolling_mean(&[1.0, 0.0, 0.5], 10);
        assert_eq!(out, vec![0.5, 0.5, 0.5]);
        assert!(rolling_mean(&[], 3).is_empty());
    }

    #[test]
    fn latest_is_newest_first_and_capped() {
        let recs = vec![
            rec(Some("A"), 0.0, "2024-01-01T00:00:02+00:00"),
            rec(Some("B"), 0.0, "2024-01-01T00:00:01Z"),
            rec(Some("C"), 0.0, "2024-01-01T00:00:03+00:00"),
        ];
        let view = latest(&recs, 2);
        assert_eq!(view.total, 3);
        let tickers: Vec<_> = view.items.iter().map(|r| r.ticker.clone().unwrap()).collect();
        assert_eq!(tickers, vec!["C", "A"]);
    }

    #[test]
    fn top_tickers_by_count_then_name() {
        let recs = vec![
            rec(Some("B"), 0.0, "2024-01-01T00:00:01Z"),
            rec(Some("A"), 0.0, "2024-01-01T00:00:02Z"),
            rec(Some("B"), 0.0, "2024-01-01T00:00:03Z"),
            rec(None, 0.0, "2024-01-01T00:00:04Z"),
            rec(Some("C"), 0.0, "2024-01-01T00:00:05Z"),
        ];
        let top = top_tickers(&recs, 2);
        assert_eq!(top, vec![("B".to_string(), 2), ("A".to_string(), 1)]);
    }

    #[test]
    fn trends_follow_time_order_and_history_cap() {
        let recs = vec![
            rec(Some("X"), 1.0, "2024-01-01T00:00:03Z"),
            rec(Some("X"), -1.0, "2024-01-01T00:00:01Z"),
            rec(Some("X"), 0.0, "2024-01-01T00:00:02Z"),
        ];
        let trends = ticker_trends(&recs, 3, 4, 2);
        assert_eq!(trends.len(), 1);
        let t = &trends[0];
        assert_eq!(t.count, 3);
        // last two by time: 0.0 then 1.0; window shrinks to 2
        assert_eq!(t.window, 2);
        assert_eq!(t.rolling_mean, vec![0.5, 0.5]);
        assert_eq!(t.received_at[1], "2024-01-01T00:00:03Z");
    }
}
