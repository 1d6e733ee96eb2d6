use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse, ModelSelection};

const CLAUDE_BIN: &str = "claude";

/// LLM capability backed by the local `claude` CLI in print mode.
#[derive(Debug, Clone)]
pub struct ClaudeCliClient {
    binary: String,
    models: ModelSelection,
    timeout: Duration,
}

impl ClaudeCliClient {
    pub fn new(models: ModelSelection, timeout: Duration) -> Self {
        Self {
            binary: CLAUDE_BIN.to_string(),
            models,
            timeout,
        }
    }

    /// Use a different executable (a wrapper script, or a stub in tests).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn args(&self, request: &LlmRequest) -> Vec<String> {
        vec![
            "-p".to_string(),
            request.context.clone(),
            "--system-prompt".to_string(),
            request.full_system_prompt(),
            "--model".to_string(),
            self.models.model_for(request.tier).to_string(),
            "--output-format".to_string(),
            "text".to_string(),
        ]
    }

    /// Run the CLI once and return its stdout.
    async fn exec(&self, args: &[String]) -> Result<String, AgentError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| AgentError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| AgentError::Cli(format!("Failed to spawn {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr, "Claude CLI failed");
            return Err(AgentError::Cli(format!(
                "{} exited {}: {}",
                self.binary, output.status, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        Ok(stdout)
    }

    /// Check if the CLI is available on the system.
    pub async fn is_available(&self) -> bool {
        match Command::new(&self.binary).arg("--version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LlmClient for ClaudeCliClient {
    fn provider(&self) -> &str {
        "claude_cli"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
        let args = self.args(request);
        debug!(model = %args[5], role = %request.role, "Invoking claude CLI");
        let raw = self.exec(&args).await?;
        Ok(LlmResponse::from_raw(raw, !request.tools.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradingagents_models::{AgentRole, ModelTier};

    fn client() -> ClaudeCliClient {
        ClaudeCliClient::new(
            ModelSelection {
                quick: "claude-3-5-haiku-latest".into(),
                deep: "claude-sonnet-4-5".into(),
            },
            Duration::from_secs(10),
        )
    }

    fn request(role: AgentRole) -> LlmRequest {
        LlmRequest {
            role,
            tier: role.tier(),
            system_prompt: "judge".into(),
            context: "transcript".into(),
            tools: vec![],
        }
    }

    #[test]
    fn tier_picks_model_argument() {
        let deep = client().args(&request(AgentRole::RiskManager));
        assert_eq!(deep[5], "claude-sonnet-4-5");
        assert_eq!(deep[1], "transcript");
        assert_eq!(deep[3], "judge");

        let quick = client().args(&request(AgentRole::Neutral));
        assert_eq!(quick[5], "claude-3-5-haiku-latest");
        assert_eq!(request(AgentRole::Neutral).tier, ModelTier::Quick);
    }

    #[tokio::test]
    async fn missing_binary_is_cli_error() {
        let client = client().with_binary("tradingagents-no-such-binary");
        assert!(!client.is_available().await);
        let err = client.generate(&request(AgentRole::Bull)).await.unwrap_err();
        assert!(matches!(err, AgentError::Cli(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_and_empty_output() {
        let err = client()
            .with_binary("false")
            .generate(&request(AgentRole::Bull))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cli(_)));

        let err = client()
            .with_binary("true")
            .generate(&request(AgentRole::Bull))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_becomes_response_text() {
        let response = client()
            .with_binary("echo")
            .generate(&request(AgentRole::Bear))
            .await
            .unwrap();
        assert!(response.text.starts_with("-p transcript --system-prompt judge"));
        assert!(response.tool_calls.is_empty());
    }
}
