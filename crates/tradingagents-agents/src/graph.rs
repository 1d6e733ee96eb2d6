use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use tradingagents_dataflows::{tools_for, DataInterface};
use tradingagents_models::{
    ConfigError, GraphConfig, RecursionGuard, Stage, TradingAgentsConfig, TradingState,
};

use crate::analysts::run_analyst_stage;
use crate::error::{GraphError, Interrupt};
use crate::llm::LlmClient;
use crate::research::run_research_stage;
use crate::risk::run_risk_stage;
use crate::runner::AgentRunner;
use crate::trader::run_trading_stage;

/// Cancels the run token when the run outlives its wall-clock budget.
struct RunTimer(JoinHandle<()>);

impl RunTimer {
    fn start(after: Duration, token: CancellationToken) -> Self {
        Self(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            warn!(timeout_secs = after.as_secs(), "Run timeout reached, cancelling");
            token.cancel();
        }))
    }
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The orchestration controller. Holds only immutable collaborators, so one
/// graph can serve many concurrent runs; each run gets its own state and guard.
pub struct TradingGraph {
    llm: Arc<dyn LlmClient>,
    data: Arc<DataInterface>,
    config: GraphConfig,
}

impl TradingGraph {
    /// Validate limits and vendor resolution for every analyst's tools.
    /// Nothing is invoked if this fails.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        data: Arc<DataInterface>,
        config: GraphConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        data.validate_tools(
            config
                .analysts
                .iter()
                .flat_map(|kind| tools_for(*kind).iter().copied()),
        )?;
        Ok(Self { llm, data, config })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub async fn propagate(
        &self,
        ticker: &str,
        date: &str,
    ) -> Result<(TradingState, String), GraphError> {
        self.propagate_with_cancel(ticker, date, CancellationToken::new())
            .await
    }

    /// Run the full pipeline. Cancelling `cancel` stops the run at the next
    /// stage or turn boundary with the partial state.
    pub async fn propagate_with_cancel(
        &self,
        ticker: &str,
        date: &str,
        cancel: CancellationToken,
    ) -> Result<(TradingState, String), GraphError> {
        let mut state = TradingState::parse(ticker, date)?;
        let span = info_span!(
            "run",
            run_id = %state.run_id(),
            ticker = state.ticker(),
            date = %state.date()
        );

        async move {
            let start = Instant::now();
            let token = cancel.child_token();
            let _timer = self
                .config
                .run_timeout_seconds
                .map(|secs| RunTimer::start(Duration::from_secs(secs), token.clone()));

            let guard = Arc::new(RecursionGuard::new(self.config.max_recur_limit));
            let runner = AgentRunner::new(Arc::clone(&self.llm), Arc::clone(&guard), token);
            info!(limit = guard.limit(), "Run started");

            let outcome = self.drive(&runner, &mut state).await;
            state.record_invocations(guard.count());

            let decision = match outcome {
                Ok(decision) => decision,
                Err(interrupt) => {
                    warn!(invocations = guard.count(), error = ?interrupt, "Run aborted");
                    return Err(interrupt.into_graph_error(state));
                }
            };
            if let Err(source) = state.set_final_decision(decision.clone()) {
                let interrupt = Interrupt::State {
                    stage: Stage::RiskDebate,
                    source,
                };
                return Err(interrupt.into_graph_error(state));
            }

            info!(
                invocations = guard.count(),
                elapsed_ms = start.elapsed().as_millis(),
                "Run complete"
            );
            Ok((state, decision))
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        runner: &AgentRunner,
        state: &mut TradingState,
    ) -> Result<String, Interrupt> {
        let config = &self.config;
        let analysts = config.analysts.as_slice();

        checkpoint(runner, Stage::Analysts)?;
        run_analyst_stage(runner, &self.data, state, analysts, config.max_tool_iterations).await?;

        checkpoint(runner, Stage::ResearchDebate)?;
        run_research_stage(runner, state, config.max_debate_rounds, analysts).await?;

        checkpoint(runner, Stage::Trading)?;
        run_trading_stage(runner, state, analysts).await?;

        checkpoint(runner, Stage::RiskDebate)?;
        run_risk_stage(runner, state, config.max_risk_discuss_rounds, analysts).await
    }
}

fn checkpoint(runner: &AgentRunner, stage: Stage) -> Result<(), Interrupt> {
    if runner.is_cancelled() {
        return Err(Interrupt::Cancelled { stage });
    }
    info!(stage = %stage, invocations = runner.guard().count(), "Stage started");
    Ok(())
}

/// Build a graph straight from a full configuration with the given collaborators.
pub fn graph_from_config(
    config: &TradingAgentsConfig,
    llm: Arc<dyn LlmClient>,
    data: Arc<DataInterface>,
) -> Result<TradingGraph, ConfigError> {
    config.validate()?;
    TradingGraph::new(llm, data, config.graph.clone())
}
