//! Live checks against the installed `claude` binary.
//!
//! Ignored unless asked for; they need the CLI on PATH and a logged-in account:
//! ```bash
//! cargo test -p tradingagents-agents --test cli_integration -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use tradingagents_agents::parser::parse_tool_calls;
use tradingagents_agents::test_support::{static_data, StaticVendor};
use tradingagents_agents::{
    ClaudeCliClient, LlmClient, LlmRequest, ModelSelection, ToolSpec, TradingGraph,
};
use tradingagents_dataflows::DataTool;
use tradingagents_models::{AgentRole, AnalystKind, GraphConfig, ModelTier};

fn cli_client() -> ClaudeCliClient {
    ClaudeCliClient::new(
        ModelSelection {
            quick: "claude-3-5-haiku-latest".into(),
            deep: "claude-3-5-haiku-latest".into(),
        },
        Duration::from_secs(60),
    )
}

async fn skip_without_cli() -> bool {
    let missing = !cli_client().is_available().await;
    if missing {
        eprintln!("claude binary unavailable, skipping");
    }
    missing
}

/// `claude --version` succeeds.
#[tokio::test]
#[ignore]
async fn cli_is_available() {
    assert!(
        cli_client().is_available().await,
        "claude CLI not found on PATH"
    );
}

/// The model must follow the tool-call protocol well enough for the parser.
#[tokio::test]
#[ignore]
async fn cli_follows_tool_protocol() {
    if skip_without_cli().await {
        return;
    }

    let request = LlmRequest {
        role: AgentRole::Analyst(AnalystKind::Market),
        tier: ModelTier::Quick,
        system_prompt: "You are a market analyst. Always request price data before answering."
            .into(),
        context: "Company of interest: NVDA\nCurrent trading date: 2024-05-10".into(),
        tools: vec![ToolSpec::from(DataTool::GetStockData)],
    };

    let response = cli_client()
        .generate(&request)
        .await
        .expect("Claude CLI invocation failed");
    assert!(
        !response.tool_calls.is_empty() || parse_tool_calls(&response.text).is_some(),
        "Expected a tool call, got: {}",
        response.text
    );
}

/// An unknown model name surfaces as an error rather than an empty reply.
#[tokio::test]
#[ignore]
async fn cli_reports_errors_for_invalid_model() {
    if skip_without_cli().await {
        return;
    }

    let client = ClaudeCliClient::new(
        ModelSelection {
            quick: "nonexistent-model-12345".into(),
            deep: "nonexistent-model-12345".into(),
        },
        Duration::from_secs(15),
    );
    let request = LlmRequest {
        role: AgentRole::Bull,
        tier: ModelTier::Quick,
        system_prompt: "You are a test.".into(),
        context: "hello".into(),
        tools: vec![],
    };

    match client.generate(&request).await {
        Ok(response) => panic!("unknown model answered: {}", response.text),
        Err(err) => eprintln!("rejected as expected: {err}"),
    }
}

/// A whole run against the real model with canned market data.
#[tokio::test]
#[ignore]
async fn cli_full_run_produces_decision() {
    if skip_without_cli().await {
        return;
    }

    let config = GraphConfig {
        analysts: vec![AnalystKind::Market],
        max_tool_iterations: 1,
        ..GraphConfig::default()
    };
    let graph = TradingGraph::new(Arc::new(cli_client()), static_data(StaticVendor::new()), config)
        .unwrap();

    let (state, decision) = graph.propagate("NVDA", "2024-05-10").await.unwrap();
    assert!(!decision.trim().is_empty());
    assert_eq!(state.research_debate().len(), 2);
    assert_eq!(state.risk_debate().len(), 3);
}
