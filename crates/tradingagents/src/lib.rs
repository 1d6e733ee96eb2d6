//! Multi-agent trading decision engine.
//!
//! Given a ticker and a date, a fixed pipeline of analyst agents gathers
//! market data, bull and bear researchers debate, a trader proposes an action
//! and a risk panel reviews it before the risk manager decides.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tradingagents::models::{TradeAction, TradingAgentsConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = TradingAgentsConfig::default();
//! let (state, decision) = tradingagents::run("NVDA", "2024-05-10", &config).await?;
//! println!("{} -> {:?}", state.ticker(), TradeAction::classify(&decision));
//! # Ok(())
//! # }
//! ```

pub use tradingagents_agents as agents;
pub use tradingagents_dataflows as dataflows;
pub use tradingagents_models as models;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tradingagents_agents::{
    graph_from_config, ClaudeCliClient, LlmClient, ModelSelection, OpenAiCompatClient,
    TradingGraph,
};
use tradingagents_dataflows::{AlphaVantageVendor, DataInterface, LocalVendor};
use tradingagents_models::{DataConfig, LlmConfig, LlmProvider, TradingAgentsConfig, TradingState};

/// Build the LLM capability selected by `llm.provider`.
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, anyhow::Error> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::ClaudeCli => Arc::new(ClaudeCliClient::new(
            ModelSelection::from_config(config),
            std::time::Duration::from_secs(config.timeout_seconds),
        )),
        _ => Arc::new(
            OpenAiCompatClient::from_config(config)
                .with_context(|| format!("Failed to build {} client", config.provider.as_str()))?,
        ),
    };
    Ok(client)
}

/// Build the data interface with every vendor that can be constructed.
pub fn build_data(config: &DataConfig) -> Result<DataInterface, anyhow::Error> {
    let mut data = DataInterface::from_config(config);

    if let Some(path) = &config.local_db_path {
        let local = LocalVendor::open(path)
            .with_context(|| format!("Failed to open local vendor store: {path}"))?;
        data = data.with_vendor(Arc::new(local));
    }

    let alpha = AlphaVantageVendor::from_env(
        &config.alpha_vantage_base_url,
        &config.alpha_vantage_key_env,
    )
    .context("Failed to build Alpha Vantage vendor")?;
    data = data.with_vendor(Arc::new(alpha));

    info!(vendors = ?data.vendor_names(), "Data vendors registered");
    Ok(data)
}

/// Build a TradingGraph from configuration.
pub fn build_graph(config: &TradingAgentsConfig) -> Result<TradingGraph, anyhow::Error> {
    let llm = build_llm(&config.llm)?;
    let data = Arc::new(build_data(&config.data)?);
    graph_from_config(config, llm, data).context("Invalid configuration")
}

/// Run one analysis for `(ticker, date)`.
pub async fn run(
    ticker: &str,
    date: &str,
    config: &TradingAgentsConfig,
) -> Result<(TradingState, String), anyhow::Error> {
    run_with_cancel(ticker, date, config, CancellationToken::new()).await
}

pub async fn run_with_cancel(
    ticker: &str,
    date: &str,
    config: &TradingAgentsConfig,
    cancel: CancellationToken,
) -> Result<(TradingState, String), anyhow::Error> {
    let graph = build_graph(config)?;
    let result = graph
        .propagate_with_cancel(ticker, date, cancel)
        .await
        .with_context(|| format!("Run failed for {ticker} on {date}"))?;
    Ok(result)
}
