pub mod analysts;
pub mod claude_cli;
pub mod debate;
pub mod error;
pub mod graph;
pub mod llm;
pub mod openai;
pub mod parser;
pub mod prompts;
pub mod research;
pub mod risk;
pub mod runner;
pub mod trader;

pub mod test_support;

pub use claude_cli::ClaudeCliClient;
pub use debate::{DebateMachine, DebatePhase};
pub use error::{AgentError, GraphError};
pub use graph::{graph_from_config, TradingGraph};
pub use llm::{LlmClient, LlmRequest, LlmResponse, ModelSelection, ToolCall, ToolSpec};
pub use openai::OpenAiCompatClient;
pub use runner::AgentRunner;
