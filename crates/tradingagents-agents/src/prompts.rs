use std::fmt::Write;

use tradingagents_models::{
    AgentRole, AnalystKind, DebateKind, DebateRole, DebateTranscript, TradingState,
};

use crate::llm::ToolSpec;

/// Header placed above every tool result appended to an analyst's context.
pub const TOOL_RESULT_HEADER: &str = "### Tool result:";

/// Label the trader ends its proposal with.
pub const PROPOSAL_MARKER: &str = "FINAL TRANSACTION PROPOSAL:";

/// Tool-calling protocol appended to the system prompt when tools are offered.
pub fn tool_protocol(tools: &[ToolSpec]) -> String {
    let mut listing = String::new();
    for tool in tools {
        let _ = writeln!(listing, "- `{}`: {}", tool.name, tool.description);
    }
    format!(
        "## TOOLS\n\n\
         You may request data before writing your report. Available tools:\n\
         {listing}\n\
         To call tools, reply with ONLY a JSON object of this shape and nothing else:\n\
         {{\"tool_calls\": [{{\"name\": \"<tool name>\", \"arguments\": {{}}}}]}}\n\n\
         Results are returned under a `{TOOL_RESULT_HEADER}` heading. When you have \
         enough data, reply with your report as plain text instead of JSON."
    )
}

pub fn analyst_system_prompt(kind: AnalystKind) -> String {
    let focus = match kind {
        AnalystKind::Market => {
            "You are a market analyst. Study recent price action and technical indicators \
             (moving averages, MACD, RSI, Bollinger Bands, ATR). Pick the indicators that \
             complement each other rather than repeating the same signal. Describe trend, \
             momentum, volatility and key levels with concrete numbers."
        }
        AnalystKind::Social => {
            "You are a social media and sentiment analyst. Use company-specific news and \
             public discussion from the past week to gauge how investors feel about the \
             company, and explain what that sentiment implies for traders."
        }
        AnalystKind::News => {
            "You are a news analyst. Review company news, global macroeconomic news and \
             insider activity from the past week. Explain which events matter for trading \
             the company and why."
        }
        AnalystKind::Fundamentals => {
            "You are a fundamentals analyst. Review the company profile, balance sheet, cash \
             flow and income statement. Assess financial health, profitability, leverage and \
             valuation in detail."
        }
    };
    format!(
        "{focus}\n\n\
         Write a detailed report for the trading team. Do not just say that trends are \
         mixed; give fine-grained insight. Finish with a Markdown table summarising the key \
         points."
    )
}

/// System prompt for any role in the pipeline.
pub fn system_prompt(role: AgentRole) -> String {
    match role {
        AgentRole::Analyst(kind) => analyst_system_prompt(kind),
        AgentRole::Bull => "You are a Bull Analyst advocating for investing in the stock. \
             Build a strong, evidence-based case emphasising growth potential, competitive \
             advantages and positive indicators from the analyst reports. Address the bear's \
             latest argument directly and explain why the bull view holds stronger merit. \
             Argue conversationally, as in a live debate."
            .to_string(),
        AgentRole::Bear => "You are a Bear Analyst making the case against investing in the \
             stock. Emphasise risks, challenges and negative indicators from the analyst \
             reports. Rebut the bull's latest argument with specific data and expose \
             over-optimistic assumptions. Argue conversationally, as in a live debate."
            .to_string(),
        AgentRole::ResearchManager => format!(
            "You are the portfolio manager and debate facilitator. Critically evaluate the \
             bull/bear debate and commit to a clear stance: BUY, SELL, or HOLD only when \
             strongly justified by the strongest arguments. Do not default to HOLD because \
             both sides have valid points.\n\n\
             Reply with ONLY a JSON object:\n\
             {example}",
            example = plan_example()
        ),
        AgentRole::Trader => format!(
            "You are a trader. Turn the investment plan and the analyst reports into a \
             concrete trading decision: buy, sell, or hold, with sizing and rationale tied to \
             the plan.\n\n\
             Reply with ONLY a JSON object:\n\
             {example}\n\n\
             If you cannot produce JSON, end your reply with `{PROPOSAL_MARKER} **BUY/HOLD/SELL**`.",
            example = proposal_example()
        ),
        AgentRole::Aggressive => "You are the Aggressive Risk Analyst. Champion high-reward, \
             high-risk opportunities. Respond to the trader's proposal and to the conservative \
             and neutral analysts point by point, highlighting where their caution misses \
             upside."
            .to_string(),
        AgentRole::Conservative => "You are the Conservative Risk Analyst. Protect assets, \
             minimise volatility and favour steady growth. Challenge the trader's proposal and \
             counter the aggressive and neutral analysts where they overlook threats."
            .to_string(),
        AgentRole::Neutral => "You are the Neutral Risk Analyst. Weigh upside and downside \
             evenly. Challenge both the aggressive and the conservative analyst where they are \
             too optimistic or too cautious, and argue for a balanced, sustainable approach."
            .to_string(),
        AgentRole::RiskManager => "You are the Risk Management Judge. Evaluate the debate \
             between the aggressive, conservative and neutral analysts and decide the best \
             course of action for the trader. Your recommendation must be clear and \
             actionable: Buy, Sell, or Hold. Refine the trader's plan using the strongest \
             points of the debate and explain the decision."
            .to_string(),
    }
}

fn plan_example() -> String {
    let example = serde_json::json!({
        "stance": "BUY | SELL | HOLD",
        "plan": "<detailed investment plan for the trader>",
        "rationale": ["<strongest supporting argument>", "<next argument>"],
        "confidence": "0.70"
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

fn proposal_example() -> String {
    let example = serde_json::json!({
        "action": "BUY | SELL | HOLD",
        "rationale": "<how the action follows from the plan>",
        "position_size_pct": "5"
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

/// Initial context handed to every analyst. Analysts see nothing but the ticker and date.
pub fn analyst_context(ticker: &str, date: &str) -> String {
    format!(
        "Company of interest: {ticker}\n\
         Current trading date: {date}\n\n\
         Use only data available on or before the trading date."
    )
}

/// Analyst reports in configured order, with a marker for any that are missing.
pub fn render_reports(state: &TradingState, analysts: &[AnalystKind]) -> String {
    let mut out = String::new();
    for kind in analysts {
        let _ = writeln!(out, "## {} report", kind);
        match state.report(*kind) {
            Some(report) if !report.is_missing() => {
                let _ = writeln!(out, "{}", report.body.trim());
                let failed: Vec<&str> = report.failed_calls().map(|c| c.tool.as_str()).collect();
                if !failed.is_empty() {
                    let _ = writeln!(out, "(data unavailable from: {})", failed.join(", "));
                }
            }
            _ => {
                let _ = writeln!(out, "[MISSING: the {} analyst produced no report]", kind);
            }
        }
        out.push('\n');
    }
    out
}

/// The transcript so far, one speaker per paragraph.
pub fn render_transcript(transcript: &DebateTranscript) -> String {
    if transcript.is_empty() {
        return "(no arguments yet)".to_string();
    }
    let mut out = String::new();
    for turn in transcript.turns() {
        let _ = writeln!(
            out,
            "[round {}] {}: {}\n",
            turn.round,
            turn.role.as_str(),
            turn.text.trim()
        );
    }
    out
}

fn latest_from_others(transcript: &DebateTranscript, role: DebateRole) -> String {
    let mut out = String::new();
    for other in transcript.kind().roles().iter().filter(|r| **r != role) {
        let text = transcript
            .last_by(*other)
            .map(|t| t.text.trim())
            .unwrap_or("(has not spoken yet)");
        let _ = writeln!(out, "Last argument from {}: {}", other.as_str(), text);
    }
    out
}

fn plan_section(state: &TradingState) -> String {
    match state.investment_plan() {
        Some(plan) => format!(
            "Stance: {}\n{}",
            plan.stance.as_str().to_uppercase(),
            plan.plan.trim()
        ),
        None => "(no investment plan)".to_string(),
    }
}

fn proposal_section(state: &TradingState) -> String {
    match state.proposed_action() {
        Some(action) => {
            let size = action
                .position_size_pct
                .map(|p| format!(" (position size {p}%)"))
                .unwrap_or_default();
            format!(
                "Action: {}{size}\n{}",
                action.action.as_str().to_uppercase(),
                action.rationale.trim()
            )
        }
        None => "(no proposed action)".to_string(),
    }
}

/// Context for a debater's turn.
pub fn debate_turn_context(
    state: &TradingState,
    kind: DebateKind,
    role: DebateRole,
    round: u32,
    analysts: &[AnalystKind],
) -> String {
    let transcript = match kind {
        DebateKind::Research => state.research_debate(),
        DebateKind::Risk => state.risk_debate(),
    };
    let mut out = format!(
        "Ticker: {} | Date: {} | You speak as {} in round {}.\n\n",
        state.ticker(),
        state.date(),
        role.as_str(),
        round
    );
    if kind == DebateKind::Risk {
        let _ = write!(
            out,
            "# Trader's proposal\n{}\n\n# Investment plan\n{}\n\n",
            proposal_section(state),
            plan_section(state)
        );
    }
    let _ = write!(
        out,
        "# Analyst reports\n{}# Debate so far\n{}\n{}",
        render_reports(state, analysts),
        render_transcript(transcript),
        latest_from_others(transcript, role)
    );
    out
}

/// Context for the judge closing a debate.
pub fn judge_context(state: &TradingState, kind: DebateKind, analysts: &[AnalystKind]) -> String {
    match kind {
        DebateKind::Research => format!(
            "Ticker: {} | Date: {}\n\n# Analyst reports\n{}# Bull/bear debate\n{}",
            state.ticker(),
            state.date(),
            render_reports(state, analysts),
            render_transcript(state.research_debate())
        ),
        DebateKind::Risk => format!(
            "Ticker: {} | Date: {}\n\n# Trader's proposal\n{}\n\n# Investment plan\n{}\n\n\
             # Risk debate\n{}",
            state.ticker(),
            state.date(),
            proposal_section(state),
            plan_section(state),
            render_transcript(state.risk_debate())
        ),
    }
}

pub fn trader_context(state: &TradingState, analysts: &[AnalystKind]) -> String {
    format!(
        "Ticker: {} | Date: {}\n\n# Investment plan\n{}\n\n# Analyst reports\n{}",
        state.ticker(),
        state.date(),
        plan_section(state),
        render_reports(state, analysts)
    )
}
