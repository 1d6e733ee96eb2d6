use std::fmt;

use serde::{Deserialize, Serialize};

/// The specialist analysts that can run in the analyst stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalystKind {
    /// Price action and technical indicators.
    Market,
    /// Social media and public sentiment.
    Social,
    /// Company and macro news, insider activity.
    News,
    /// Financial statements and company profile.
    Fundamentals,
}

impl AnalystKind {
    pub const ALL: [AnalystKind; 4] = [
        AnalystKind::Market,
        AnalystKind::Social,
        AnalystKind::News,
        AnalystKind::Fundamentals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalystKind::Market => "market",
            AnalystKind::Social => "social",
            AnalystKind::News => "news",
            AnalystKind::Fundamentals => "fundamentals",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for AnalystKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analysts,
    ResearchDebate,
    Trading,
    RiskDebate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Analysts => "analysts",
            Stage::ResearchDebate => "research_debate",
            Stage::Trading => "trading",
            Stage::RiskDebate => "risk_debate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which model tier a role is routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Fast model for high-volume turns (analysts, debaters, trader).
    Quick,
    /// Stronger reasoning model for the two judging managers.
    Deep,
}

/// Participants of the two adversarial debates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DebateRole {
    Bull,
    Bear,
    Aggressive,
    Conservative,
    Neutral,
}

impl DebateRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateRole::Bull => "bull",
            DebateRole::Bear => "bear",
            DebateRole::Aggressive => "aggressive",
            DebateRole::Conservative => "conservative",
            DebateRole::Neutral => "neutral",
        }
    }
}

impl fmt::Display for DebateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two debate types, each with a fixed per-round speaking order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DebateKind {
    Research,
    Risk,
}

const RESEARCH_ROLES: [DebateRole; 2] = [DebateRole::Bull, DebateRole::Bear];
const RISK_ROLES: [DebateRole; 3] = [
    DebateRole::Aggressive,
    DebateRole::Conservative,
    DebateRole::Neutral,
];

impl DebateKind {
    /// Speaking order within one round.
    pub fn roles(&self) -> &'static [DebateRole] {
        match self {
            DebateKind::Research => &RESEARCH_ROLES,
            DebateKind::Risk => &RISK_ROLES,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            DebateKind::Research => Stage::ResearchDebate,
            DebateKind::Risk => Stage::RiskDebate,
        }
    }

    /// The role that judges this debate once all rounds are complete.
    pub fn judge(&self) -> AgentRole {
        match self {
            DebateKind::Research => AgentRole::ResearchManager,
            DebateKind::Risk => AgentRole::RiskManager,
        }
    }
}

/// Every role that can be invoked against the LLM capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Analyst(AnalystKind),
    Bull,
    Bear,
    ResearchManager,
    Trader,
    Aggressive,
    Conservative,
    Neutral,
    RiskManager,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Analyst(AnalystKind::Market) => "market_analyst",
            AgentRole::Analyst(AnalystKind::Social) => "social_analyst",
            AgentRole::Analyst(AnalystKind::News) => "news_analyst",
            AgentRole::Analyst(AnalystKind::Fundamentals) => "fundamentals_analyst",
            AgentRole::Bull => "bull",
            AgentRole::Bear => "bear",
            AgentRole::ResearchManager => "research_manager",
            AgentRole::Trader => "trader",
            AgentRole::Aggressive => "aggressive",
            AgentRole::Conservative => "conservative",
            AgentRole::Neutral => "neutral",
            AgentRole::RiskManager => "risk_manager",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            AgentRole::Analyst(_) => Stage::Analysts,
            AgentRole::Bull | AgentRole::Bear | AgentRole::ResearchManager => {
                Stage::ResearchDebate
            }
            AgentRole::Trader => Stage::Trading,
            AgentRole::Aggressive
            | AgentRole::Conservative
            | AgentRole::Neutral
            | AgentRole::RiskManager => Stage::RiskDebate,
        }
    }

    /// Judges get the deep model; everyone else the quick one.
    pub fn tier(&self) -> ModelTier {
        match self {
            AgentRole::ResearchManager | AgentRole::RiskManager => ModelTier::Deep,
            _ => ModelTier::Quick,
        }
    }
}

impl From<DebateRole> for AgentRole {
    fn from(role: DebateRole) -> Self {
        match role {
            DebateRole::Bull => AgentRole::Bull,
            DebateRole::Bear => AgentRole::Bear,
            DebateRole::Aggressive => AgentRole::Aggressive,
            DebateRole::Conservative => AgentRole::Conservative,
            DebateRole::Neutral => AgentRole::Neutral,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_order_is_bull_then_bear() {
        assert_eq!(
            DebateKind::Research.roles(),
            &[DebateRole::Bull, DebateRole::Bear]
        );
    }

    #[test]
    fn risk_order_is_aggressive_conservative_neutral() {
        assert_eq!(
            DebateKind::Risk.roles(),
            &[
                DebateRole::Aggressive,
                DebateRole::Conservative,
                DebateRole::Neutral
            ]
        );
    }

    #[test]
    fn managers_route_to_deep_tier() {
        assert_eq!(AgentRole::ResearchManager.tier(), ModelTier::Deep);
        assert_eq!(AgentRole::RiskManager.tier(), ModelTier::Deep);
        assert_eq!(AgentRole::Bear.tier(), ModelTier::Quick);
        assert_eq!(
            AgentRole::Analyst(AnalystKind::News).tier(),
            ModelTier::Quick
        );
        assert_eq!(AgentRole::Trader.tier(), ModelTier::Quick);
    }

    #[test]
    fn role_names_and_stages() {
        assert_eq!(AgentRole::Bear.as_str(), "bear");
        assert_eq!(AgentRole::Bear.stage().as_str(), "research_debate");
        assert_eq!(AgentRole::Neutral.stage(), Stage::RiskDebate);
        assert_eq!(AgentRole::from(DebateRole::Bull), AgentRole::Bull);
    }

    #[test]
    fn analyst_kind_parse() {
        assert_eq!(AnalystKind::parse("news"), Some(AnalystKind::News));
        assert_eq!(AnalystKind::parse("weather"), None);
    }
}
