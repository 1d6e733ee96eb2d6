use tracing::info;
use tradingagents_models::{AnalystKind, DebateKind, Stage, TradingState};

use crate::debate::run_debate;
use crate::error::Interrupt;
use crate::parser::parse_investment_plan;
use crate::runner::AgentRunner;

/// Bull/bear debate followed by the research manager's plan.
pub(crate) async fn run_research_stage(
    runner: &AgentRunner,
    state: &mut TradingState,
    max_rounds: u32,
    analysts: &[AnalystKind],
) -> Result<(), Interrupt> {
    let verdict = run_debate(runner, state, DebateKind::Research, max_rounds, analysts).await?;
    let plan = parse_investment_plan(&verdict);
    info!(
        stance = plan.stance.as_str(),
        confidence = ?plan.confidence,
        "Investment plan set"
    );
    state
        .set_investment_plan(plan)
        .map_err(|source| Interrupt::State {
            stage: Stage::ResearchDebate,
            source,
        })
}
