//! Ticker extraction from headline text and event metadata.
//!
//! Resolution order, first match wins:
//! 1. explicit `ticker` in metadata (upper-cased, trusted)
//! 2. cashtag in text: `$` followed by 1-5 uppercase letters
//! 3. first bare 2-5 letter all-caps token
//! 4. none

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static RE_CASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Z]{1,5})").expect("valid cashtag regex"));

static RE_CAPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2,5})\b").expect("valid caps regex"));

/// Metadata override: a non-empty string `ticker` field.
fn metadata_ticker(meta: &Map<String, Value>) -> Option<String> {
    let t = meta.get("ticker")?.as_str()?.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_uppercase())
    }
}

/// First cashtag symbol in `text`, without the `$`.
pub fn cashtag(text: &str) -> Option<String> {
    RE_CASHTAG
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First bare all-caps token (2-5 ASCII letters) in `text`.
pub fn caps_token(text: &str) -> Option<String> {
    RE_CAPS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolve the ticker for an event. Never fails; returns `None` when nothing matches.
pub fn extract_ticker(text: &str, meta: &Map<String, Value>) -> Option<String> {
    metadata_ticker(meta)
        .or_else(|| cashtag(text))
        .or_else(|| caps_token(text))
}
