use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tradingagents_dataflows::DataTool;
use tradingagents_models::{AgentRole, LlmConfig, ModelTier};

use crate::error::AgentError;
use crate::parser::parse_tool_calls;
use crate::prompts::tool_protocol;

/// A tool the model may call during this invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

impl From<DataTool> for ToolSpec {
    fn from(tool: DataTool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One agent invocation against the LLM capability.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub role: AgentRole,
    pub tier: ModelTier,
    pub system_prompt: String,
    pub context: String,
    pub tools: Vec<ToolSpec>,
}

impl LlmRequest {
    /// System prompt with the tool-calling protocol appended when tools are offered.
    pub fn full_system_prompt(&self) -> String {
        if self.tools.is_empty() {
            self.system_prompt.clone()
        } else {
            format!("{}\n\n{}", self.system_prompt, tool_protocol(&self.tools))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LlmResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Interpret raw model output. Tool calls are only recognised when tools were offered.
    pub fn from_raw(raw: String, tools_offered: bool) -> Self {
        if tools_offered {
            if let Some(tool_calls) = parse_tool_calls(&raw) {
                return Self {
                    text: String::new(),
                    tool_calls,
                };
            }
        }
        Self::text(raw.trim())
    }
}

/// The LLM capability. Mockable for testing.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name recorded in logs and failure entries.
    fn provider(&self) -> &str;

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError>;
}

/// Quick/deep model names.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    pub quick: String,
    pub deep: String,
}

impl ModelSelection {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            quick: config.quick_think_llm.clone(),
            deep: config.deep_think_llm.clone(),
        }
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Quick => &self.quick,
            ModelTier::Deep => &self.deep,
        }
    }
}
