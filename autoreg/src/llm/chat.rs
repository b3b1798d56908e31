//! Chat-completion backend abstraction.
//!
//! [`ChatModel`] decouples the pipeline from the actual completion service
//! (an OpenAI-compatible HTTP endpoint in production). Tests use scripted
//! models that return predetermined responses without network access.
//!
//! The client is constructed from explicit [`ChatSettings`] threaded in by
//! the caller; there is no process-global model state.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

/// Connection settings for the production chat backend.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Model identifier passed to the completions endpoint.
    pub model: String,
    /// Base URL of an OpenAI-compatible API (no trailing slash).
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Abstraction over chat-completion backends.
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    /// Send one prompt, return the completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Production backend: POST `{base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    settings: ChatSettings,
}

impl OpenAiChat {
    pub fn new(settings: ChatSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client, settings })
    }
}

impl ChatModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        debug!(model = %self.settings.model, prompt_bytes = prompt.len(), "chat request");

        let body = json!({
            "model": self.settings.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response: Value = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .context("send chat request")?
            .error_for_status()
            .context("chat request status")?
            .json()
            .await
            .context("parse chat response body")?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("chat response missing choices[0].message.content"))?;
        Ok(content.to_string())
    }
}

/// Pull the JSON object out of a completion, tolerating fenced code blocks
/// and prose around the payload.
pub fn extract_json(text: &str) -> &str {
    static FENCE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence regex")
    });
    if let Some(caps) = FENCE_RE.captures(text) {
        return caps.get(1).map_or(text, |m| m.as_str());
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Request a completion and parse it into `T`. A malformed payload is an
/// error the caller's retry policy handles.
pub async fn complete_parsed<C: ChatModel, T: DeserializeOwned>(
    chat: &C,
    prompt: &str,
) -> Result<T> {
    let completion = chat.complete(prompt).await?;
    let payload = extract_json(&completion);
    serde_json::from_str(payload).with_context(|| {
        format!(
            "completion did not match the expected schema: {}",
            truncate(payload, 200)
        )
    })
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
