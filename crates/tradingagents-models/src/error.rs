use thiserror::Error;

use crate::roles::DebateRole;

/// Invalid or incomplete configuration. Always fatal, raised before any agent runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least 1 (got {value})")]
    NonPositive { field: &'static str, value: u32 },

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid llm_provider: {0}. Must be one of: claude_cli (or anthropic), openai, openrouter, ollama")]
    UnknownProvider(String),

    #[error("No analysts configured")]
    NoAnalysts,

    #[error("Analyst configured more than once: {0}")]
    DuplicateAnalyst(String),

    #[error("Unknown analyst: {0}")]
    UnknownAnalyst(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("No vendor configured for tool {tool} (category {category})")]
    UnresolvedVendor { category: String, tool: String },

    #[error("Invalid ticker: {0:?}")]
    InvalidTicker(String),

    #[error("Invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Violation of the append-only / write-once discipline on `TradingState`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("{0} is already set")]
    AlreadySet(&'static str),

    #[error("Report for analyst {0} already recorded")]
    DuplicateReport(String),

    #[error("Out-of-order debate turn: expected {expected} in round {round}, got {got}")]
    OutOfOrderTurn {
        expected: DebateRole,
        round: u32,
        got: DebateRole,
    },

    #[error("Role {0} does not take part in this debate")]
    ForeignRole(DebateRole),

    #[error("final decision must not be empty")]
    EmptyDecision,
}
