use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, StateError};
use crate::roles::{AnalystKind, DebateKind, DebateRole};

/// A directional recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Hold => "hold",
        }
    }

    /// Parse an exact label such as `"BUY"` or `"hold"`.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(TradeAction::Buy),
            "sell" => Some(TradeAction::Sell),
            "hold" => Some(TradeAction::Hold),
            _ => None,
        }
    }

    /// Presentation-layer classification of free text: any "buy" wins,
    /// then any "sell", otherwise hold.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("buy") {
            TradeAction::Buy
        } else if lower.contains("sell") {
            TradeAction::Sell
        } else {
            TradeAction::Hold
        }
    }
}

/// One data-tool call made by an analyst (or a failed model call standing in for one).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    /// Vendor the call was routed to.
    pub vendor: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ToolInvocation {
    pub fn succeeded(tool: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            vendor: vendor.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        tool: impl Into<String>,
        vendor: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            vendor: vendor.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Every tool call succeeded.
    Complete,
    /// The analyst produced a report but at least one tool call failed.
    Degraded,
    /// The analyst produced no report at all.
    Missing,
}

/// Output of one analyst for one run. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalystReport {
    pub analyst: AnalystKind,
    pub body: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub status: ReportStatus,
    pub elapsed_ms: u64,
}

impl AnalystReport {
    pub fn new(
        analyst: AnalystKind,
        body: String,
        tool_calls: Vec<ToolInvocation>,
        elapsed_ms: u64,
    ) -> Self {
        let status = if tool_calls.iter().all(|t| t.success) {
            ReportStatus::Complete
        } else {
            ReportStatus::Degraded
        };
        Self {
            analyst,
            body,
            tool_calls,
            status,
            elapsed_ms,
        }
    }

    /// Marker for an analyst that failed outright. The failure is logged as a failed call.
    pub fn missing(
        analyst: AnalystKind,
        mut tool_calls: Vec<ToolInvocation>,
        failure: ToolInvocation,
        elapsed_ms: u64,
    ) -> Self {
        tool_calls.push(failure);
        Self {
            analyst,
            body: String::new(),
            tool_calls,
            status: ReportStatus::Missing,
            elapsed_ms,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.status == ReportStatus::Missing
    }

    pub fn failed_calls(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.tool_calls.iter().filter(|t| !t.success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateTurn {
    pub role: DebateRole,
    /// 1-based round number.
    pub round: u32,
    pub text: String,
}

/// Ordered turns of one debate. Turns can only be appended in the debate's
/// fixed speaking order, so every round is fully populated before the next begins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateTranscript {
    kind: DebateKind,
    turns: Vec<DebateTurn>,
}

impl DebateTranscript {
    pub fn new(kind: DebateKind) -> Self {
        Self {
            kind,
            turns: Vec::new(),
        }
    }

    pub fn kind(&self) -> DebateKind {
        self.kind
    }

    pub fn turns(&self) -> &[DebateTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of fully populated rounds.
    pub fn completed_rounds(&self) -> u32 {
        (self.turns.len() / self.kind.roles().len()) as u32
    }

    /// The (round, role) that must speak next.
    pub fn next_slot(&self) -> (u32, DebateRole) {
        let roles = self.kind.roles();
        let n = self.turns.len();
        ((n / roles.len()) as u32 + 1, roles[n % roles.len()])
    }

    /// Most recent turn by `role`, if any.
    pub fn last_by(&self, role: DebateRole) -> Option<&DebateTurn> {
        self.turns.iter().rev().find(|t| t.role == role)
    }

    pub fn push(&mut self, role: DebateRole, text: String) -> Result<&DebateTurn, StateError> {
        if !self.kind.roles().contains(&role) {
            return Err(StateError::ForeignRole(role));
        }
        let (round, expected) = self.next_slot();
        if role != expected {
            return Err(StateError::OutOfOrderTurn {
                expected,
                round,
                got: role,
            });
        }
        self.turns.push(DebateTurn { role, round, text });
        Ok(&self.turns[self.turns.len() - 1])
    }
}

/// The Research Manager's synthesized plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentPlan {
    pub stance: TradeAction,
    pub plan: String,
    pub rationale: Vec<String>,
    pub confidence: Option<Decimal>,
}

/// The Trader's concrete proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedAction {
    pub action: TradeAction,
    pub rationale: String,
    /// Suggested position size as a percentage of the portfolio.
    pub position_size_pct: Option<Decimal>,
}

/// The context threaded through one run. Every field is append-only or write-once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingState {
    run_id: Uuid,
    ticker: String,
    date: NaiveDate,
    analyst_reports: Vec<AnalystReport>,
    research_debate: DebateTranscript,
    investment_plan: Option<InvestmentPlan>,
    proposed_action: Option<ProposedAction>,
    risk_debate: DebateTranscript,
    final_decision: Option<String>,
    agent_invocations: u32,
}

impl TradingState {
    pub fn new(ticker: &str, date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            date,
            analyst_reports: Vec::new(),
            research_debate: DebateTranscript::new(DebateKind::Research),
            investment_plan: None,
            proposed_action: None,
            risk_debate: DebateTranscript::new(DebateKind::Risk),
            final_decision: None,
            agent_invocations: 0,
        }
    }

    /// Validate raw `(ticker, "YYYY-MM-DD")` inputs and build a fresh state.
    pub fn parse(ticker: &str, date: &str) -> Result<Self, ConfigError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(ConfigError::InvalidTicker(ticker.to_string()));
        }
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidDate(date.to_string()))?;
        Ok(Self::new(&ticker.to_uppercase(), date))
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn analyst_reports(&self) -> &[AnalystReport] {
        &self.analyst_reports
    }

    pub fn report(&self, analyst: AnalystKind) -> Option<&AnalystReport> {
        self.analyst_reports.iter().find(|r| r.analyst == analyst)
    }

    pub fn research_debate(&self) -> &DebateTranscript {
        &self.research_debate
    }

    pub fn risk_debate(&self) -> &DebateTranscript {
        &self.risk_debate
    }

    pub fn investment_plan(&self) -> Option<&InvestmentPlan> {
        self.investment_plan.as_ref()
    }

    pub fn proposed_action(&self) -> Option<&ProposedAction> {
        self.proposed_action.as_ref()
    }

    pub fn final_decision(&self) -> Option<&str> {
        self.final_decision.as_deref()
    }

    pub fn agent_invocations(&self) -> u32 {
        self.agent_invocations
    }

    pub fn push_analyst_report(&mut self, report: AnalystReport) -> Result<(), StateError> {
        if self.report(report.analyst).is_some() {
            return Err(StateError::DuplicateReport(report.analyst.to_string()));
        }
        self.analyst_reports.push(report);
        Ok(())
    }

    pub fn record_research_turn(
        &mut self,
        role: DebateRole,
        text: String,
    ) -> Result<&DebateTurn, StateError> {
        self.research_debate.push(role, text)
    }

    pub fn record_risk_turn(
        &mut self,
        role: DebateRole,
        text: String,
    ) -> Result<&DebateTurn, StateError> {
        self.risk_debate.push(role, text)
    }

    pub fn set_investment_plan(&mut self, plan: InvestmentPlan) -> Result<(), StateError> {
        if self.investment_plan.is_some() {
            return Err(StateError::AlreadySet("investment_plan"));
        }
        self.investment_plan = Some(plan);
        Ok(())
    }

    pub fn set_proposed_action(&mut self, action: ProposedAction) -> Result<(), StateError> {
        if self.proposed_action.is_some() {
            return Err(StateError::AlreadySet("proposed_action"));
        }
        self.proposed_action = Some(action);
        Ok(())
    }

    pub fn set_final_decision(&mut self, decision: String) -> Result<(), StateError> {
        if self.final_decision.is_some() {
            return Err(StateError::AlreadySet("final_decision"));
        }
        if decision.trim().is_empty() {
            return Err(StateError::EmptyDecision);
        }
        self.final_decision = Some(decision);
        Ok(())
    }

    /// Record the run's total agent invocation count. Counts only ever grow.
    pub fn record_invocations(&mut self, count: u32) {
        self.agent_invocations = self.agent_invocations.max(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn state() -> TradingState {
        TradingState::parse("nvda", "2024-05-10").unwrap()
    }

    #[test]
    fn parse_normalizes_ticker() {
        let s = state();
        assert_eq!(s.ticker(), "NVDA");
        assert_eq!(s.date().to_string(), "2024-05-10");
        assert!(s.final_decision().is_none());
    }

    #[test]
    fn parse_rejects_bad_inputs() {
        assert!(matches!(
            TradingState::parse("  ", "2024-05-10"),
            Err(ConfigError::InvalidTicker(_))
        ));
        assert!(matches!(
            TradingState::parse("NVDA", "2024-13-40"),
            Err(ConfigError::InvalidDate(_))
        ));
        assert!(matches!(
            TradingState::parse("NVDA", "05/10/2024"),
            Err(ConfigError::InvalidDate(_))
        ));
    }

    #[test]
    fn classify_prefers_buy_then_sell() {
        assert_eq!(TradeAction::classify("Strong BUY signal"), TradeAction::Buy);
        assert_eq!(TradeAction::classify("We should sell."), TradeAction::Sell);
        assert_eq!(TradeAction::classify("Wait and see"), TradeAction::Hold);
        assert_eq!(TradeAction::parse_label(" Hold "), Some(TradeAction::Hold));
        assert_eq!(TradeAction::parse_label("maybe"), None);
    }

    #[test]
    fn research_transcript_enforces_order() {
        let mut t = DebateTranscript::new(DebateKind::Research);
        assert_eq!(t.next_slot(), (1, DebateRole::Bull));

        let err = t.push(DebateRole::Bear, "first".into()).unwrap_err();
        assert_eq!(
            err,
            StateError::OutOfOrderTurn {
                expected: DebateRole::Bull,
                round: 1,
                got: DebateRole::Bear
            }
        );

        t.push(DebateRole::Bull, "b1".into()).unwrap();
        t.push(DebateRole::Bear, "r1".into()).unwrap();
        let turn = t.push(DebateRole::Bull, "b2".into()).unwrap();
        assert_eq!(turn.round, 2);
        assert_eq!(t.completed_rounds(), 1);
        assert_eq!(t.last_by(DebateRole::Bear).unwrap().text, "r1");
    }

    #[test]
    fn risk_transcript_rejects_research_roles() {
        let mut t = DebateTranscript::new(DebateKind::Risk);
        assert_eq!(
            t.push(DebateRole::Bull, "x".into()).unwrap_err(),
            StateError::ForeignRole(DebateRole::Bull)
        );
        t.push(DebateRole::Aggressive, "a".into()).unwrap();
        t.push(DebateRole::Conservative, "c".into()).unwrap();
        t.push(DebateRole::Neutral, "n".into()).unwrap();
        assert_eq!(t.completed_rounds(), 1);
        assert_eq!(t.next_slot(), (2, DebateRole::Aggressive));
    }

    #[test]
    fn write_once_fields() {
        let mut s = state();
        let plan = InvestmentPlan {
            stance: TradeAction::Buy,
            plan: "Accumulate".into(),
            rationale: vec!["Earnings beat".into()],
            confidence: Some(dec!(0.7)),
        };
        s.set_investment_plan(plan.clone()).unwrap();
        assert_eq!(
            s.set_investment_plan(plan),
            Err(StateError::AlreadySet("investment_plan"))
        );

        let action = ProposedAction {
            action: TradeAction::Buy,
            rationale: "Follow plan".into(),
            position_size_pct: None,
        };
        s.set_proposed_action(action.clone()).unwrap();
        assert!(s.set_proposed_action(action).is_err());

        assert_eq!(
            s.set_final_decision("   ".into()),
            Err(StateError::EmptyDecision)
        );
        s.set_final_decision("BUY".into()).unwrap();
        assert_eq!(
            s.set_final_decision("SELL".into()),
            Err(StateError::AlreadySet("final_decision"))
        );
        assert_eq!(s.final_decision(), Some("BUY"));
    }

    #[test]
    fn duplicate_analyst_report_rejected() {
        let mut s = state();
        let report = AnalystReport::new(AnalystKind::News, "ok".into(), vec![], 10);
        s.push_analyst_report(report.clone()).unwrap();
        assert!(matches!(
            s.push_analyst_report(report),
            Err(StateError::DuplicateReport(_))
        ));
    }

    #[test]
    fn report_status_reflects_tool_failures() {
        let ok = AnalystReport::new(
            AnalystKind::Market,
            "fine".into(),
            vec![ToolInvocation::succeeded("get_stock_data", "local")],
            5,
        );
        assert_eq!(ok.status, ReportStatus::Complete);

        let degraded = AnalystReport::new(
            AnalystKind::Market,
            "partial".into(),
            vec![
                ToolInvocation::succeeded("get_stock_data", "local"),
                ToolInvocation::failed("get_indicators", "local", "no rows"),
            ],
            5,
        );
        assert_eq!(degraded.status, ReportStatus::Degraded);
        assert_eq!(degraded.failed_calls().count(), 1);

        let missing = AnalystReport::missing(
            AnalystKind::Market,
            vec![],
            ToolInvocation::failed("llm", "claude_cli", "timeout"),
            5,
        );
        assert!(missing.is_missing());
        assert_eq!(missing.tool_calls.len(), 1);
    }

    #[test]
    fn state_serializes_to_json() {
        let mut s = state();
        s.record_research_turn(DebateRole::Bull, "up".into()).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["ticker"], "NVDA");
        assert_eq!(json["date"], "2024-05-10");
        assert_eq!(json["research_debate"]["turns"][0]["role"], "bull");
    }

    #[test]
    fn invocation_count_never_decreases() {
        let mut s = state();
        s.record_invocations(5);
        s.record_invocations(3);
        assert_eq!(s.agent_invocations(), 5);
    }
}
