//! OpenAI-compatible API backend for conversational replies.
//!
//! Supports any server implementing the OpenAI chat completions API:
//! - OpenAI (`https://api.openai.com`)
//! - Ollama (`http://localhost:11434`)
//! - vLLM, llama.cpp server, etc.

use super::Completion;
use crate::config::LlmConfig;
use crate::error::{Result, SpeechError};
use crate::pipeline::messages::Turn;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::info;

/// Completion backend using an OpenAI-compatible HTTP API (non-streaming).
pub struct ApiCompletion {
    client: reqwest::Client,
    url: String,
    api_model: String,
    api_key: String,
    system_prompt: Option<String>,
}

impl ApiCompletion {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_s.max(1)))
            .build()
            .map_err(|e| SpeechError::Llm(format!("cannot build HTTP client: {e}")))?;

        let base = match config.api_url.strip_suffix("/v1") {
            Some(u) => u,
            None => &config.api_url,
        };
        let base = base.trim_end_matches('/');
        let url = format!("{base}/v1/chat/completions");

        info!("API LLM configured: {url} model={}", config.api_model);

        Ok(Self {
            client,
            url,
            api_model: config.api_model.clone(),
            api_key: config.api_key.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn messages(&self, context: &[Turn]) -> Vec<serde_json::Value> {
        let system = self.system_prompt.iter().map(|prompt| {
            serde_json::json!({
                "role": "system",
                "content": prompt,
            })
        });
        let turns = context.iter().map(|t| {
            serde_json::json!({
                "role": t.speaker.role(),
                "content": t.text,
            })
        });
        system.chain(turns).collect()
    }
}

#[async_trait]
impl Completion for ApiCompletion {
    async fn complete(&self, context: &[Turn], max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.api_model,
            "messages": self.messages(context),
            "max_tokens": max_tokens,
        });

        let start = Instant::now();
        let mut req = self.client.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| SpeechError::Llm(format!("API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SpeechError::Llm(format!("API returned HTTP {status}: {detail}")));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SpeechError::Llm(format!("JSON parse error: {e}")))?;

        let text = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| SpeechError::Llm("reply has no message content".to_owned()))?
            .trim()
            .to_owned();

        info!(
            "API replied in {:.0}ms ({} chars)",
            start.elapsed().as_millis(),
            text.len()
        );
        Ok(text)
    }
}
