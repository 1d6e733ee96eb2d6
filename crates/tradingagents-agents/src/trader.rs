use tracing::info;
use tradingagents_models::{AgentRole, AnalystKind, Stage, TradingState};

use crate::error::Interrupt;
use crate::parser::parse_proposed_action;
use crate::prompts::{system_prompt, trader_context};
use crate::runner::AgentRunner;

/// Turn the investment plan into a concrete proposed action. No tools.
pub(crate) async fn run_trading_stage(
    runner: &AgentRunner,
    state: &mut TradingState,
    analysts: &[AnalystKind],
) -> Result<(), Interrupt> {
    let role = AgentRole::Trader;
    let response = runner
        .invoke(
            role,
            system_prompt(role),
            trader_context(state, analysts),
            Vec::new(),
        )
        .await?;

    let action = parse_proposed_action(&response.text);
    info!(
        action = action.action.as_str(),
        position_size_pct = ?action.position_size_pct,
        "Proposed action set"
    );
    state
        .set_proposed_action(action)
        .map_err(|source| Interrupt::State {
            stage: Stage::Trading,
            source,
        })
}
