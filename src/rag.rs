//! Retrieval-augmented summaries: top-k documents from the vector index
//! are stuffed into a prompt and sent to a completion provider.
//!
//! Without a provider the summary is extractive (best matching document).

use crate::index::{SearchHit, VectorIndex};
use crate::worker::WorkerPool;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on summary length (ASCII chars, single line).
pub const MAX_SUMMARY_CHARS: usize = 240;

const SYSTEM_PROMPT: &str = "You summarize financial news. Use only the provided context. \
Answer on a single line, neutral tone, no emojis.";

/// Produces a grounded one-line summary for a query.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, query: &str) -> Result<String>;
}

/// Low-level LLM call.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
    fn provider_name(&self) -> &'static str;
}

/// OpenAI-compatible Chat Completions provider.
pub struct OpenAiCompletion {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiCompletion {
    pub fn new(
        api_key: String,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        max_tokens: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-sentiment-stream/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let body: Resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("completion request")?
            .error_for_status()
            .context("completion non-2xx")?
            .json()
            .await
            .context("decoding completion response")?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .context("completion returned no content")
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Prompt asking for a one-sentence summary plus up to two grounded reasons.
pub fn build_prompt(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!(
        "Summarize the latest information about '{query}' in one short sentence. \
Then list up to 2 brief grounded reasons (cite source ids).\n\nContext:\n"
    );
    for h in hits {
        out.push_str(&format!("[{}] {}\n", h.id, h.text));
    }
    out
}

/// Reduce model or document text to one ASCII line of at most [`MAX_SUMMARY_CHARS`].
///
/// Non-printable and non-ASCII characters become spaces and whitespace runs collapse.
/// Overlong text is cut after the last complete sentence when that keeps at least half
/// the budget, else at the last word boundary, else hard.
pub fn sanitize_summary(input: &str) -> String {
    let printable: String = input
        .chars()
        .map(|c| if c.is_ascii_graphic() { c } else { ' ' })
        .collect();
    let flat = printable.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() <= MAX_SUMMARY_CHARS {
        return flat;
    }

    // ASCII only from here on, so byte offsets are char offsets.
    let bytes = flat.as_bytes();
    let sentence_end = (MAX_SUMMARY_CHARS / 2..MAX_SUMMARY_CHARS)
        .rev()
        .find(|&i| matches!(bytes[i], b'.' | b'!' | b'?') && bytes[i + 1] == b' ');
    if let Some(i) = sentence_end {
        return flat[..=i].to_string();
    }
    match flat[..=MAX_SUMMARY_CHARS].rfind(' ') {
        Some(i) if i > 0 => flat[..i].to_string(),
        _ => flat[..MAX_SUMMARY_CHARS].to_string(),
    }
}

/// Summary built straight from the best hit, used when no LLM is configured.
pub fn extractive_summary(query: &str, hits: &[SearchHit]) -> String {
    match hits.first() {
        Some(top) => sanitize_summary(&format!("{query}: {} [{}]", top.text, top.id)),
        None => sanitize_summary(&format!("No indexed context for '{query}'")),
    }
}

/// Retrieval + (optional) generation over a shared vector index.
pub struct RagSummarizer {
    index: Arc<dyn VectorIndex>,
    pool: WorkerPool,
    llm: Option<Arc<dyn CompletionClient>>,
    top_k: usize,
}

impl RagSummarizer {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        pool: WorkerPool,
        llm: Option<Arc<dyn CompletionClient>>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            pool,
            llm,
            top_k: top_k.max(1),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.llm.as_ref().map_or("extractive", |c| c.provider_name())
    }
}

#[async_trait::async_trait]
impl Summarizer for RagSummarizer {
    async fn summarize(&self, query: &str) -> Result<String> {
        let index = self.index.clone();
        let q = query.to_string();
        let k = self.top_k;
        let hits = self
            .pool
            .run(move || index.query(&q, k))
            .await
            .context("retrieving context")?;

        let Some(llm) = &self.llm else {
            return Ok(extractive_summary(query, &hits));
        };
        if hits.is_empty() {
            return Ok(extractive_summary(query, &hits));
        }

        let prompt = build_prompt(query, &hits);
        let raw = llm.complete(SYSTEM_PROMPT, &prompt).await?;
        let cleaned = sanitize_summary(&raw);
        anyhow::ensure!(!cleaned.is_empty(), "completion was empty after sanitizing");
        Ok(cleaned)
    }
}
