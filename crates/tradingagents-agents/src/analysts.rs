use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, warn, Instrument};
use tradingagents_dataflows::{tools_for, DataInterface, DataTool};
use tradingagents_models::{
    AgentRole, AnalystKind, AnalystReport, Stage, ToolInvocation, TradingState,
};

use crate::error::Interrupt;
use crate::llm::ToolSpec;
use crate::prompts::{analyst_context, system_prompt, TOOL_RESULT_HEADER};
use crate::runner::AgentRunner;

/// Longest tool result (in bytes) pasted back into an analyst's context.
const MAX_TOOL_RESULT_BYTES: usize = 8_000;

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Run one analyst: let it call its data tools for up to `max_tool_iterations`
/// rounds, then require a written report.
///
/// Data-fetch failures are recorded and the analyst carries on. A model
/// failure yields a `Missing` report. Only cancellation and the recursion
/// guard stop the run.
pub(crate) async fn run_analyst(
    runner: AgentRunner,
    data: Arc<DataInterface>,
    kind: AnalystKind,
    ticker: String,
    date: NaiveDate,
    max_tool_iterations: u32,
) -> Result<AnalystReport, Interrupt> {
    let start = Instant::now();
    let role = AgentRole::Analyst(kind);
    let allowed = tools_for(kind);
    let specs: Vec<ToolSpec> = allowed.iter().copied().map(ToolSpec::from).collect();
    let system = system_prompt(role);

    let mut context = analyst_context(&ticker, &date.to_string());
    let mut log: Vec<ToolInvocation> = Vec::new();
    let mut iteration = 0;

    loop {
        let tools = if iteration < max_tool_iterations {
            specs.clone()
        } else {
            Vec::new()
        };
        let response = match runner.invoke(role, system.clone(), context.clone(), tools).await {
            Ok(r) => r,
            Err(Interrupt::Model { source, .. }) => {
                warn!(analyst = %kind, error = %source, "Analyst model call failed");
                let failure =
                    ToolInvocation::failed("llm.generate", runner.provider(), source.to_string());
                return Ok(AnalystReport::missing(
                    kind,
                    log,
                    failure,
                    start.elapsed().as_millis() as u64,
                ));
            }
            Err(fatal) => return Err(fatal),
        };

        if response.tool_calls.is_empty() {
            let report = AnalystReport::new(
                kind,
                response.text,
                log,
                start.elapsed().as_millis() as u64,
            );
            info!(
                analyst = %kind,
                status = ?report.status,
                tool_calls = report.tool_calls.len(),
                elapsed_ms = report.elapsed_ms,
                "Analyst report ready"
            );
            return Ok(report);
        }

        iteration += 1;
        for call in response.tool_calls {
            let permitted = DataTool::parse(&call.name).is_some_and(|t| allowed.contains(&t));
            if !permitted {
                warn!(
                    analyst = %kind,
                    tool = %call.name,
                    "Analyst requested a tool it was not offered"
                );
                log.push(ToolInvocation::failed(
                    call.name.clone(),
                    "none",
                    format!("tool {} is not available to the {kind} analyst", call.name),
                ));
                context.push_str(&format!(
                    "\n\n{TOOL_RESULT_HEADER} {}\nERROR: tool not available\n",
                    call.name
                ));
                continue;
            }

            let outcome = data.call(&call.name, &ticker, date, call.arguments).await;
            let body = match &outcome.result {
                Ok(value) => {
                    log.push(ToolInvocation::succeeded(&outcome.tool, &outcome.vendor));
                    let rendered = serde_json::to_string(value).unwrap_or_default();
                    truncate(&rendered, MAX_TOOL_RESULT_BYTES).to_string()
                }
                Err(e) => {
                    log.push(ToolInvocation::failed(
                        &outcome.tool,
                        &outcome.vendor,
                        e.to_string(),
                    ));
                    format!("ERROR: {e}")
                }
            };
            context.push_str(&format!(
                "\n\n{TOOL_RESULT_HEADER} {}\n{body}\n",
                outcome.tool
            ));
        }
    }
}

/// Run every configured analyst concurrently and append their reports in
/// configured order, regardless of completion order.
///
/// Analyst tasks are aborted if this future is dropped, so an abandoned run
/// makes no further model or vendor calls.
pub(crate) async fn run_analyst_stage(
    runner: &AgentRunner,
    data: &Arc<DataInterface>,
    state: &mut TradingState,
    analysts: &[AnalystKind],
    max_tool_iterations: u32,
) -> Result<(), Interrupt> {
    let mut handles = Vec::with_capacity(analysts.len());
    for &kind in analysts {
        let task = run_analyst(
            runner.clone(),
            Arc::clone(data),
            kind,
            state.ticker().to_string(),
            state.date(),
            max_tool_iterations,
        );
        let handle = AbortOnDropHandle::new(tokio::spawn(task.in_current_span()));
        handles.push((kind, handle));
    }

    let mut fatal: Option<Interrupt> = None;
    for (kind, handle) in handles {
        let report = match handle.await {
            Ok(Ok(report)) => report,
            Ok(Err(interrupt)) => {
                fatal.get_or_insert(interrupt);
                continue;
            }
            Err(e) => {
                error!(analyst = %kind, error = %e, "Analyst task panicked");
                AnalystReport::missing(
                    kind,
                    Vec::new(),
                    ToolInvocation::failed("analyst.task", "none", e.to_string()),
                    0,
                )
            }
        };
        state
            .push_analyst_report(report)
            .map_err(|source| Interrupt::State {
                stage: Stage::Analysts,
                source,
            })?;
    }

    match fatal {
        Some(interrupt) => Err(interrupt),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "ééé";
        assert_eq!(truncate(text, 3), "é");
        assert_eq!(truncate(text, 100), text);
    }
}
