use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tradingagents_models::{LlmConfig, LlmProvider};

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse, ModelSelection};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// LLM capability speaking the OpenAI chat-completions protocol
/// (OpenAI, OpenRouter, Ollama).
pub struct OpenAiCompatClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<String>,
    models: ModelSelection,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(
        provider: LlmProvider,
        base_url: &str,
        api_key: Option<String>,
        models: ModelSelection,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            models,
            timeout,
        })
    }

    /// Build from configuration, reading the key from `api_key_env`.
    /// Ollama runs without a key; the hosted providers require one.
    pub fn from_config(config: &LlmConfig) -> Result<Self, AgentError> {
        let api_key = match &config.api_key_env {
            Some(var) => {
                let key = std::env::var(var).ok().filter(|k| !k.trim().is_empty());
                if key.is_none() && config.provider != LlmProvider::Ollama {
                    return Err(AgentError::MissingCredentials(var.clone()));
                }
                key
            }
            None => None,
        };
        Self::new(
            config.provider,
            &config.backend_url,
            api_key,
            ModelSelection::from_config(config),
            Duration::from_secs(config.timeout_seconds),
        )
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider(&self) -> &str {
        self.provider.as_str()
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
        let model = self.models.model_for(request.tier);
        let system_prompt = request.full_system_prompt();
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.context,
                },
            ],
        };
        debug!(provider = self.provider(), model, role = %request.role, "Chat completion request");

        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout(self.timeout.as_secs())
            } else {
                AgentError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, provider = self.provider(), "Chat completion failed");
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AgentError::EmptyResponse)?;

        Ok(LlmResponse::from_raw(content, !request.tools.is_empty()))
    }
}
