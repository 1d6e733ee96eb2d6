use tradingagents_models::{AnalystKind, DebateKind, TradingState};

use crate::debate::run_debate;
use crate::error::Interrupt;
use crate::runner::AgentRunner;

/// Aggressive/conservative/neutral debate over the proposal. Returns the risk
/// manager's verdict; recording it as the final decision is left to the graph.
pub(crate) async fn run_risk_stage(
    runner: &AgentRunner,
    state: &mut TradingState,
    max_rounds: u32,
    analysts: &[AnalystKind],
) -> Result<String, Interrupt> {
    run_debate(runner, state, DebateKind::Risk, max_rounds, analysts).await
}
