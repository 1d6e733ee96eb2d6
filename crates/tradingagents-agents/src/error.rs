use chrono::NaiveDate;
use thiserror::Error;
use tradingagents_models::{AgentRole, ConfigError, Stage, StateError, TradingState};

/// Failure of the LLM capability for a single invocation.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a stage stopped early. The controller turns this into a `GraphError`
/// once it can attach the run context and partial state.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Model { role: AgentRole, source: AgentError },
    Exhausted { role: AgentRole, limit: u32 },
    Cancelled { stage: Stage },
    State { stage: Stage, source: StateError },
}

impl Interrupt {
    pub(crate) fn into_graph_error(self, state: TradingState) -> GraphError {
        let ticker = state.ticker().to_string();
        let date = state.date();
        let partial = Box::new(state);
        match self {
            Interrupt::Model { role, source } => GraphError::Model {
                stage: role.stage(),
                role,
                ticker,
                date,
                source,
                partial,
            },
            Interrupt::Exhausted { role, limit } => GraphError::RecursionLimit {
                limit,
                stage: role.stage(),
                role,
                ticker,
                date,
                partial,
            },
            Interrupt::Cancelled { stage } => GraphError::Cancelled {
                stage,
                ticker,
                date,
                partial,
            },
            Interrupt::State { stage, source } => GraphError::State {
                stage,
                ticker,
                date,
                source,
                partial,
            },
        }
    }
}

/// Typed failure returned to `run` callers. Every variant raised after agents
/// start carries the partial state; none of them carries a decision.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error in {stage} ({role}) for {ticker} on {date}: {source}")]
    Model {
        stage: Stage,
        role: AgentRole,
        ticker: String,
        date: NaiveDate,
        source: AgentError,
        partial: Box<TradingState>,
    },

    #[error("Recursion limit {limit} reached before {role} in {stage} for {ticker} on {date}")]
    RecursionLimit {
        limit: u32,
        stage: Stage,
        role: AgentRole,
        ticker: String,
        date: NaiveDate,
        partial: Box<TradingState>,
    },

    #[error("Run cancelled during {stage} for {ticker} on {date}")]
    Cancelled {
        stage: Stage,
        ticker: String,
        date: NaiveDate,
        partial: Box<TradingState>,
    },

    #[error("State invariant violated in {stage} for {ticker} on {date}: {source}")]
    State {
        stage: Stage,
        ticker: String,
        date: NaiveDate,
        source: StateError,
        partial: Box<TradingState>,
    },
}

impl GraphError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GraphError::Config(_) => None,
            GraphError::Model { stage, .. }
            | GraphError::RecursionLimit { stage, .. }
            | GraphError::Cancelled { stage, .. }
            | GraphError::State { stage, .. } => Some(*stage),
        }
    }

    pub fn role(&self) -> Option<AgentRole> {
        match self {
            GraphError::Model { role, .. } | GraphError::RecursionLimit { role, .. } => Some(*role),
            _ => None,
        }
    }

    /// State accumulated up to the failure, if any agent had started.
    pub fn partial_state(&self) -> Option<&TradingState> {
        match self {
            GraphError::Config(_) => None,
            GraphError::Model { partial, .. }
            | GraphError::RecursionLimit { partial, .. }
            | GraphError::Cancelled { partial, .. }
            | GraphError::State { partial, .. } => Some(partial.as_ref()),
        }
    }
}
