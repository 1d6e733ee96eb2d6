use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tradingagents_models::{AgentRole, RecursionGuard};

use crate::error::{AgentError, Interrupt};
use crate::llm::{LlmClient, LlmRequest, LlmResponse, ToolSpec};

/// Everything a stage needs to invoke an agent: the LLM capability, the
/// run's invocation budget, and its cancellation signal. Cheap to clone into
/// spawned analyst tasks.
#[derive(Clone)]
pub struct AgentRunner {
    llm: Arc<dyn LlmClient>,
    guard: Arc<RecursionGuard>,
    cancel: CancellationToken,
}

impl AgentRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        guard: Arc<RecursionGuard>,
        cancel: CancellationToken,
    ) -> Self {
        Self { llm, guard, cancel }
    }

    pub fn provider(&self) -> &str {
        self.llm.provider()
    }

    pub fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// One agent invocation. Cancellation and the recursion guard are both
    /// checked before the model is called, so a refused invocation never runs.
    pub(crate) async fn invoke(
        &self,
        role: AgentRole,
        system_prompt: String,
        context: String,
        tools: Vec<ToolSpec>,
    ) -> Result<LlmResponse, Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled { stage: role.stage() });
        }

        let count = self.guard.try_acquire().map_err(|e| {
            warn!(role = %role, limit = e.limit, "Recursion limit reached");
            Interrupt::Exhausted {
                role,
                limit: e.limit,
            }
        })?;

        let request = LlmRequest {
            role,
            tier: role.tier(),
            system_prompt,
            context,
            tools,
        };

        let start = Instant::now();
        let response = self
            .llm
            .generate(&request)
            .await
            .and_then(|r| {
                if r.text.trim().is_empty() && r.tool_calls.is_empty() {
                    Err(AgentError::EmptyResponse)
                } else {
                    Ok(r)
                }
            })
            .map_err(|source| Interrupt::Model { role, source })?;

        debug!(
            role = %role,
            invocation = count,
            tool_calls = response.tool_calls.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Agent invocation complete"
        );
        Ok(response)
    }
}
