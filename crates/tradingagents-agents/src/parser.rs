use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use tradingagents_models::{InvestmentPlan, ProposedAction, TradeAction};

use crate::llm::ToolCall;
use crate::prompts::PROPOSAL_MARKER;

/// The first JSON object in a model reply.
///
/// Models wrap JSON in prose or Markdown fences, so the candidates tried are:
/// the whole reply, each fenced block, then the first balanced `{...}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    std::iter::once(text)
        .chain(fenced_blocks(text))
        .chain(first_balanced_object(text))
        .filter(|candidate| candidate.starts_with('{'))
        .find_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .filter(Value::is_object)
}

/// Contents of each ``` fenced block, with any language tag dropped.
fn fenced_blocks(text: &str) -> impl Iterator<Item = &str> {
    text.split("```")
        .skip(1)
        .step_by(2)
        .map(|block| match block.find('\n') {
            Some(nl) if !block[..nl].trim_start().starts_with('{') => block[nl + 1..].trim(),
            _ => block.trim(),
        })
}

/// The first `{...}` whose braces balance, ignoring braces inside strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        match (in_string, escaped, ch) {
            (true, true, _) => escaped = false,
            (true, false, '\\') => escaped = true,
            (true, false, '"') => in_string = false,
            (true, false, _) => {}
            (false, _, '"') => in_string = true,
            (false, _, '{') => depth += 1,
            (false, _, '}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Tool calls in the `{"tool_calls": [...]}` envelope, if the text is one.
pub fn parse_tool_calls(raw: &str) -> Option<Vec<ToolCall>> {
    let value = extract_json(raw)?;
    let calls = value.get("tool_calls")?.clone();
    let calls: Vec<ToolCall> = serde_json::from_value(calls).ok()?;
    (!calls.is_empty()).then_some(calls)
}

/// Read a decimal that the model may have written as a string or a number.
fn decimal_field(value: &Value, field: &str) -> Option<Decimal> {
    match value.get(field)? {
        Value::String(s) => Decimal::from_str(s.trim().trim_end_matches('%')).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Find an explicit `FINAL TRANSACTION PROPOSAL: **BUY**` style label.
pub fn extract_proposal_label(text: &str) -> Option<TradeAction> {
    let upper = text.to_uppercase();
    let idx = upper.rfind(PROPOSAL_MARKER)?;
    upper[idx + PROPOSAL_MARKER.len()..]
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|w| !w.is_empty())
        .and_then(TradeAction::parse_label)
}

/// Build the research manager's plan. Structured JSON is preferred; plain
/// prose is accepted with the stance taken from an explicit label or the text.
pub fn parse_investment_plan(raw: &str) -> InvestmentPlan {
    let structured = extract_json(raw).filter(|v| v.get("plan").is_some());

    match structured {
        Some(v) => {
            let plan = string_field(&v, "plan").unwrap_or_else(|| raw.trim().to_string());
            let stance = v
                .get("stance")
                .and_then(Value::as_str)
                .and_then(TradeAction::parse_label)
                .unwrap_or_else(|| TradeAction::classify(&plan));
            let rationale = v
                .get("rationale")
                .map(|r| match r {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    Value::String(s) => vec![s.clone()],
                    _ => Vec::new(),
                })
                .unwrap_or_default();
            InvestmentPlan {
                stance,
                plan,
                rationale,
                confidence: decimal_field(&v, "confidence"),
            }
        }
        None => InvestmentPlan {
            stance: extract_proposal_label(raw).unwrap_or_else(|| TradeAction::classify(raw)),
            plan: raw.trim().to_string(),
            rationale: Vec::new(),
            confidence: None,
        },
    }
}

/// Build the trader's proposal from JSON or from prose ending in a proposal label.
pub fn parse_proposed_action(raw: &str) -> ProposedAction {
    let structured = extract_json(raw).filter(|v| v.get("action").is_some());

    if let Some(v) = structured {
        if let Some(action) = v
            .get("action")
            .and_then(Value::as_str)
            .and_then(TradeAction::parse_label)
        {
            return ProposedAction {
                action,
                rationale: string_field(&v, "rationale").unwrap_or_else(|| raw.trim().to_string()),
                position_size_pct: decimal_field(&v, "position_size_pct"),
            };
        }
    }

    ProposedAction {
        action: extract_proposal_label(raw).unwrap_or_else(|| TradeAction::classify(raw)),
        rationale: raw.trim().to_string(),
        position_size_pct: None,
    }
}
