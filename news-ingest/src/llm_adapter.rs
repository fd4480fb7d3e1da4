use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A single prompt sent to a text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Stable per-article identifier the provider can use to group calls.
    pub session_id: String,
    pub system: String,
    pub prompt: String,
}

/// Trait for text-generation services the summarizer can hand articles to
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    fn adapter_name(&self) -> String;

    /// Free-form completion text for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            max_tokens: 1024,
            timeout_seconds: 60,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("anthropic_version", &self.anthropic_version)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    client: Client,
    config: LlmConfig,
}

impl AnthropicAdapter {
    pub fn new(client: Client, config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Llm("LLM API key is required".to_string()));
        }
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    fn adapter_name(&self) -> String {
        format!("Anthropic ({})", self.config.model)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
            "metadata": { "user_id": request.session_id },
        });

        debug!("Sending generation request for session {}", request.session_id);

        let response = self
            .client
            .post(self.endpoint())
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.anthropic_version)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Generation request for {} failed with HTTP {}", request.session_id, status);
            return Err(PipelineError::Llm(format!("HTTP {}: {}", status.as_u16(), detail)));
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(PipelineError::Llm("empty completion".to_string()));
        }

        info!("Received {} chars for session {}", text.len(), request.session_id);
        Ok(text)
    }
}

/// What a [`MockLlmAdapter`] answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(String),
}

/// Scripted adapter for development and testing
pub struct MockLlmAdapter {
    name: String,
    reply: MockReply,
    response_delay_ms: u64,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockLlmAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: MockReply::Text(
                r#"{"executive_summary": "Mock summary.", "key_points": ["Mock point"], "analysis": "Mock analysis.", "takeaways": ["Mock takeaway"]}"#
                    .to_string(),
            ),
            response_delay_ms: 0,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_reply(mut self, reply: MockReply) -> Self {
        self.reply = reply;
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(MockReply::Text(text.into()))
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }

        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Error(message) => Err(PipelineError::Llm(message.clone())),
        }
    }
}
