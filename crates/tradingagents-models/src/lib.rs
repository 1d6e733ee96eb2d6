pub mod config;
pub mod error;
pub mod guard;
pub mod roles;
pub mod state;

pub use config::{DataConfig, GraphConfig, LlmConfig, LlmProvider, TradingAgentsConfig};
pub use error::{ConfigError, StateError};
pub use guard::{GuardExhausted, RecursionGuard};
pub use roles::{AgentRole, AnalystKind, DebateKind, DebateRole, ModelTier, Stage};
pub use state::{
    AnalystReport, DebateTranscript, DebateTurn, InvestmentPlan, ProposedAction, ReportStatus,
    ToolInvocation, TradeAction, TradingState,
};
