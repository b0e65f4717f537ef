// src/config/llm.rs
use crate::rag::{CompletionClient, OpenAiCompletion};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_api_key() -> String {
    "ENV".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_tokens() -> u32 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Off means extractive summaries only.
    #[serde(default)]
    pub enabled: bool,
    /// Only "openai" (any OpenAI-compatible endpoint) is supported.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// Normalize provider and resolve an "ENV" api key.
    pub fn resolve(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();
        if !self.enabled {
            return Ok(self);
        }
        if self.provider != "openai" {
            anyhow::bail!("Unsupported llm provider in config: {}", self.provider);
        }
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        Ok(self)
    }

    /// Build the completion client, or `None` when disabled.
    pub fn build_client(&self) -> anyhow::Result<Option<Arc<dyn CompletionClient>>> {
        if !self.enabled {
            return Ok(None);
        }
        let client = OpenAiCompletion::new(
            self.api_key.clone(),
            self.model.clone(),
            self.base_url.clone(),
            Duration::from_secs(self.timeout_secs),
            self.max_tokens,
        )?;
        Ok(Some(Arc::new(client)))
    }
}
