//! Deterministic collaborators for driving whole runs in tests.
//!
//! `ScriptedLlm` answers every role with a fixed reply (analysts first request
//! one tool, then report) and records each request it sees. A role can instead
//! be scripted to keep requesting tools whenever any are offered, or to panic. `StaticVendor`
//! serves canned payloads for every tool, optionally failing chosen ones.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tradingagents_dataflows::{
    DataFetchError, DataInterface, DataTool, DataVendor, FetchRequest, ToolCategory, VendorRouter,
};
use tradingagents_models::AgentRole;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse, ToolCall};
use crate::prompts::TOOL_RESULT_HEADER;

pub const SCRIPTED_PROVIDER: &str = "scripted";

/// An LLM capability with one scripted answer per role.
#[derive(Default)]
pub struct ScriptedLlm {
    calls: Mutex<Vec<LlmRequest>>,
    failing: HashSet<AgentRole>,
    responses: HashMap<AgentRole, String>,
    delays: HashMap<AgentRole, Duration>,
    tool_requests: HashMap<AgentRole, Vec<ToolCall>>,
    panicking: HashSet<AgentRole>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation of `role` fails with an API error.
    pub fn failing_on(mut self, role: AgentRole) -> Self {
        self.failing.insert(role);
        self
    }

    /// Replace the scripted reply for `role`.
    pub fn with_response(mut self, role: AgentRole, text: &str) -> Self {
        self.responses.insert(role, text.to_string());
        self
    }

    /// Sleep before answering `role`. Used to make analysts finish out of order.
    pub fn with_delay(mut self, role: AgentRole, delay: Duration) -> Self {
        self.delays.insert(role, delay);
        self
    }

    /// Answer `role` with `calls` every time it is offered tools. Once the
    /// tool budget is spent it falls back to its written reply.
    pub fn requesting_tools(mut self, role: AgentRole, calls: Vec<ToolCall>) -> Self {
        self.tool_requests.insert(role, calls);
        self
    }

    /// Panic inside `generate` for `role`.
    pub fn panicking_on(mut self, role: AgentRole) -> Self {
        self.panicking.insert(role);
        self
    }

    /// All requests seen so far, in call order.
    pub async fn calls(&self) -> Vec<LlmRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn roles_called(&self) -> Vec<AgentRole> {
        self.calls.lock().await.iter().map(|r| r.role).collect()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    fn default_reply(role: AgentRole) -> String {
        match role {
            AgentRole::Analyst(kind) => format!(
                "{kind} report: conditions are constructive with identifiable risks.\n\n\
                 | point | view |\n|---|---|\n| overall | positive |"
            ),
            AgentRole::Bull => "Revenue growth is accelerating and margins are expanding.".into(),
            AgentRole::Bear => "Valuation already prices in years of growth.".into(),
            AgentRole::ResearchManager => serde_json::json!({
                "stance": "BUY",
                "plan": "Accumulate a starter position and add on pullbacks.",
                "rationale": ["Growth outpaces peers", "Balance sheet is strong"],
                "confidence": "0.70"
            })
            .to_string(),
            AgentRole::Trader => serde_json::json!({
                "action": "BUY",
                "rationale": "Follow the plan with a starter position.",
                "position_size_pct": "5"
            })
            .to_string(),
            AgentRole::Aggressive => "Size up; momentum favours the bold.".into(),
            AgentRole::Conservative => "Keep the position small and set a stop.".into(),
            AgentRole::Neutral => "A starter position with a stop balances both views.".into(),
            AgentRole::RiskManager => {
                "FINAL DECISION: BUY. Enter a 5% position with a stop 8% below entry.".into()
            }
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider(&self) -> &str {
        SCRIPTED_PROVIDER
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
        self.calls.lock().await.push(request.clone());

        if let Some(delay) = self.delays.get(&request.role) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&request.role) {
            return Err(AgentError::Api {
                status: 500,
                body: format!("scripted failure for {}", request.role),
            });
        }

        if self.panicking.contains(&request.role) {
            panic!("scripted panic for {}", request.role);
        }
        if let Some(calls) = self.tool_requests.get(&request.role) {
            if !request.tools.is_empty() {
                return Ok(LlmResponse {
                    text: String::new(),
                    tool_calls: calls.clone(),
                });
            }
        }

        if matches!(request.role, AgentRole::Analyst(_))
            && !request.tools.is_empty()
            && !request.context.contains(TOOL_RESULT_HEADER)
        {
            return Ok(LlmResponse {
                text: String::new(),
                tool_calls: vec![ToolCall {
                    name: request.tools[0].name.clone(),
                    arguments: serde_json::json!({}),
                }],
            });
        }

        let text = self
            .responses
            .get(&request.role)
            .cloned()
            .unwrap_or_else(|| Self::default_reply(request.role));
        Ok(LlmResponse::text(text))
    }
}

pub const STATIC_VENDOR: &str = "static";

/// In-memory vendor returning a small payload per tool.
#[derive(Debug, Default)]
pub struct StaticVendor {
    failing: HashSet<DataTool>,
}

impl StaticVendor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, tool: DataTool) -> Self {
        self.failing.insert(tool);
        self
    }
}

#[async_trait]
impl DataVendor for StaticVendor {
    fn name(&self) -> &str {
        STATIC_VENDOR
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, DataFetchError> {
        if self.failing.contains(&request.tool) {
            return Err(DataFetchError::Vendor {
                vendor: STATIC_VENDOR.to_string(),
                message: format!("{} is down", request.tool.name()),
            });
        }
        Ok(serde_json::json!({
            "tool": request.tool.name(),
            "ticker": request.ticker,
            "as_of": request.date.to_string(),
            "rows": [{"value": 1}],
        }))
    }
}

/// Router sending every category to `vendor`.
pub fn single_vendor_router(vendor: &str) -> VendorRouter {
    VendorRouter::new(
        ToolCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), vendor.to_string()))
            .collect(),
        BTreeMap::new(),
    )
}

/// A data interface backed by `vendor` for every tool.
pub fn static_data(vendor: StaticVendor) -> Arc<DataInterface> {
    Arc::new(
        DataInterface::new(single_vendor_router(STATIC_VENDOR), 100, Duration::from_secs(60))
            .with_vendor(Arc::new(vendor)),
    )
}
