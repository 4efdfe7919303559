use crate::models::{Interaction, Message, ModelMetrics};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub const PLACEHOLDER_REPLY: &str = "LLM não configurada ainda. Por favor, aguarde.";

/// Last-resort responder used when neither intent nor pattern matched.
#[async_trait]
pub trait FallbackResponder: Send + Sync {
    fn name(&self) -> &str;
    async fn respond(&self, text: &str, context: &[Interaction]) -> Result<String>;

    async fn test_connection(&self) -> bool {
        true
    }

    fn status(&self) -> Value {
        json!({ "status": "ok", "description": self.name() })
    }
}

/// Stands in for an external LLM that is not configured.
pub struct PlaceholderResponder;

#[async_trait]
impl FallbackResponder for PlaceholderResponder {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn respond(&self, _text: &str, _context: &[Interaction]) -> Result<String> {
        info!("Fallback responder called, but no LLM is configured");
        Ok(PLACEHOLDER_REPLY.to_string())
    }

    fn status(&self) -> Value {
        json!({
            "status": "placeholder",
            "description": "Not connected to any external LLM service."
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub system_prompt: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client. The bounded context window
/// is replayed as alternating user/assistant messages.
pub struct ChatCompletionResponder {
    config: ChatCompletionConfig,
    client: Client,
    metrics: Mutex<ModelMetrics>,
}

impl ChatCompletionResponder {
    pub fn new(config: ChatCompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            client,
            metrics: Mutex::new(ModelMetrics::default()),
        })
    }

    pub fn build_messages(&self, text: &str, context: &[Interaction]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(context.len() * 2 + 2);
        if let Some(system) = &self.config.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        for turn in context {
            messages.push(Message::user(turn.user_input.clone()));
            messages.push(Message::assistant(turn.agent_response.clone()));
        }
        messages.push(Message::user(text));
        messages
    }

    pub async fn metrics(&self) -> ModelMetrics {
        self.metrics.lock().await.clone()
    }
}

#[async_trait]
impl FallbackResponder for ChatCompletionResponder {
    fn name(&self) -> &str {
        "chat-completion"
    }

    async fn respond(&self, text: &str, context: &[Interaction]) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("LLM API key not configured"))?;

        let start = Instant::now();
        debug!("Sending fallback request to {}", self.config.base_url);

        let payload = json!({
            "model": self.config.model,
            "messages": self.build_messages(text, context),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        });

        let result = async {
            let resp = self
                .client
                .post(format!("{}/chat/completions", self.config.base_url))
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&payload)
                .send()
                .await
                .map_err(|e| anyhow!("LLM request failed: {}", e))?;

            if !resp.status().is_success() {
                return Err(anyhow!("LLM API error: {}", resp.status()));
            }

            let body: Value = resp.json().await?;
            body["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("LLM response has no content"))
        }
        .await;

        let mut metrics = self.metrics.lock().await;
        match &result {
            Ok(_) => metrics.record_success(start.elapsed().as_millis() as u64),
            Err(e) => {
                error!("{}", e);
                metrics.record_failure(e.to_string());
            }
        }
        result
    }

    async fn test_connection(&self) -> bool {
        self.respond("ping", &[]).await.is_ok()
    }

    fn status(&self) -> Value {
        json!({
            "status": if self.config.api_key.is_some() { "configured" } else { "missing_api_key" },
            "description": format!("{} via {}", self.config.model, self.config.base_url)
        })
    }
}
