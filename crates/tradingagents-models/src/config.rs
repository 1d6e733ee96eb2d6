use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::roles::AnalystKind;

/// Top-level configuration for a trading-agents deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradingAgentsConfig {
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    pub data: DataConfig,
}

impl TradingAgentsConfig {
    /// Check the preconditions every run relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.graph.validate()
    }

    /// Apply the process environment on top of file-loaded values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v.parse()?;
        }
        if let Some(v) = get("BACKEND_URL") {
            self.llm.backend_url = v;
        }
        if let Some(v) = get("DEEP_THINK_MODEL") {
            self.llm.deep_think_llm = v;
        }
        if let Some(v) = get("QUICK_THINK_MODEL") {
            self.llm.quick_think_llm = v;
        }
        if let Some(v) = get("MAX_DEBATE_ROUNDS") {
            self.graph.max_debate_rounds = parse_u32("MAX_DEBATE_ROUNDS", &v)?;
        }
        if let Some(v) = get("MAX_RISK_DISCUSS_ROUNDS") {
            self.graph.max_risk_discuss_rounds = parse_u32("MAX_RISK_DISCUSS_ROUNDS", &v)?;
        }
        if let Some(v) = get("MAX_RECUR_LIMIT") {
            self.graph.max_recur_limit = parse_u32("MAX_RECUR_LIMIT", &v)?;
        }
        if let Some(v) = get("SELECTED_ANALYSTS") {
            self.graph.analysts = parse_analysts(&v)?;
        }

        let vendor_keys = [
            ("CORE_STOCK_VENDOR", "core_stock_apis"),
            ("TECHNICAL_INDICATORS_VENDOR", "technical_indicators"),
            ("FUNDAMENTAL_DATA_VENDOR", "fundamental_data"),
            ("NEWS_DATA_VENDOR", "news_data"),
        ];
        for (env_key, category) in vendor_keys {
            if let Some(v) = get(env_key) {
                self.data.data_vendors.insert(category.to_string(), v);
            }
        }
        Ok(())
    }
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        })
}

/// Comma-separated analyst names, e.g. `market,news`.
fn parse_analysts(value: &str) -> Result<Vec<AnalystKind>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            AnalystKind::parse(&name.to_ascii_lowercase())
                .ok_or_else(|| ConfigError::UnknownAnalyst(name.to_string()))
        })
        .collect()
}

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Local `claude` CLI.
    #[serde(alias = "anthropic")]
    ClaudeCli,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openrouter")]
    OpenRouter,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::ClaudeCli => "claude_cli",
            LlmProvider::OpenAi => "openai",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Ollama => "ollama",
        }
    }

    /// Whether this provider speaks the OpenAI chat-completions protocol.
    pub fn is_http(&self) -> bool {
        !matches!(self, LlmProvider::ClaudeCli)
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude_cli" | "claude" | "anthropic" => Ok(LlmProvider::ClaudeCli),
            "openai" => Ok(LlmProvider::OpenAi),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// LLM capability settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model used by the research and risk managers.
    pub deep_think_llm: String,
    /// Model used by analysts, debaters and the trader.
    pub quick_think_llm: String,
    /// Base URL for HTTP providers (ignored by `claude_cli`).
    pub backend_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenRouter,
            deep_think_llm: "openai/gpt-4o-mini".to_string(),
            quick_think_llm: "openai/gpt-4o-mini".to_string(),
            backend_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: Some("OPENROUTER_API_KEY".to_string()),
            timeout_seconds: 120,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deep_think_llm.trim().is_empty() {
            return Err(ConfigError::Missing("deep_think_llm"));
        }
        if self.quick_think_llm.trim().is_empty() {
            return Err(ConfigError::Missing("quick_think_llm"));
        }
        if self.provider.is_http() && self.backend_url.trim().is_empty() {
            return Err(ConfigError::Missing("backend_url"));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::NonPositive {
                field: "timeout_seconds",
                value: 0,
            });
        }
        Ok(())
    }
}

/// Orchestration limits and analyst selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Bull/bear round-trips before the research manager judges.
    pub max_debate_rounds: u32,
    /// Aggressive/conservative/neutral rounds before the risk manager judges.
    pub max_risk_discuss_rounds: u32,
    /// Upper bound on total agent invocations per run.
    pub max_recur_limit: u32,
    /// Analysts to run, in report order.
    pub analysts: Vec<AnalystKind>,
    /// Tool-calling turns an analyst gets before it must write its report.
    pub max_tool_iterations: u32,
    /// Wall-clock budget for one run; cancellation applies at the next boundary.
    pub run_timeout_seconds: Option<u64>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_debate_rounds: 1,
            max_risk_discuss_rounds: 1,
            max_recur_limit: 100,
            analysts: AnalystKind::ALL.to_vec(),
            max_tool_iterations: 4,
            run_timeout_seconds: None,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_debate_rounds", self.max_debate_rounds),
            ("max_risk_discuss_rounds", self.max_risk_discuss_rounds),
            ("max_recur_limit", self.max_recur_limit),
        ];
        for (field, value) in positive {
            if value < 1 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if self.analysts.is_empty() {
            return Err(ConfigError::NoAnalysts);
        }
        let mut seen = HashSet::new();
        for analyst in &self.analysts {
            if !seen.insert(*analyst) {
                return Err(ConfigError::DuplicateAnalyst(analyst.to_string()));
            }
        }
        Ok(())
    }
}

/// Data vendor routing and caching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Category-level default vendor (e.g. `news_data = "alpha_vantage"`).
    pub data_vendors: BTreeMap<String, String>,
    /// Tool-level overrides; these shadow the category default.
    pub tool_vendors: BTreeMap<String, String>,
    /// SQLite file backing the `local` vendor.
    pub local_db_path: Option<String>,
    pub alpha_vantage_base_url: String,
    /// Environment variable holding the Alpha Vantage key.
    pub alpha_vantage_key_env: String,
    /// Maximum entries in the in-memory fetch cache.
    pub cache_max_capacity: u64,
    /// TTL in seconds for cached fetch results.
    pub cache_ttl_seconds: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        let data_vendors = [
            "core_stock_apis",
            "technical_indicators",
            "fundamental_data",
            "news_data",
        ]
        .into_iter()
        .map(|c| (c.to_string(), "alpha_vantage".to_string()))
        .collect();

        Self {
            data_vendors,
            tool_vendors: BTreeMap::new(),
            local_db_path: None,
            alpha_vantage_base_url: "https://www.alphavantage.co".to_string(),
            alpha_vantage_key_env: "ALPHA_VANTAGE_API_KEY".to_string(),
            cache_max_capacity: 1_000,
            cache_ttl_seconds: 3_600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn roundtrip_config() {
        let config = TradingAgentsConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: TradingAgentsConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn defaults_are_valid() {
        let config = TradingAgentsConfig::default();
        config.validate().unwrap();
        assert_eq!(config.graph.max_debate_rounds, 1);
        assert_eq!(config.graph.max_risk_discuss_rounds, 1);
        assert_eq!(config.graph.max_recur_limit, 100);
        assert_eq!(config.graph.analysts.len(), 4);
        assert_eq!(config.data.data_vendors.len(), 4);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[llm]
provider = "claude_cli"
deep_think_llm = "claude-sonnet-4-5"
quick_think_llm = "claude-3-5-haiku-latest"

[graph]
max_debate_rounds = 2
max_risk_discuss_rounds = 3
analysts = ["market", "fundamentals"]

[data.data_vendors]
core_stock_apis = "local"
news_data = "alpha_vantage"

[data.tool_vendors]
get_news = "local"
"#;
        let config: TradingAgentsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::ClaudeCli);
        assert_eq!(config.graph.max_debate_rounds, 2);
        assert_eq!(config.graph.max_recur_limit, 100);
        assert_eq!(
            config.graph.analysts,
            vec![AnalystKind::Market, AnalystKind::Fundamentals]
        );
        assert_eq!(config.data.tool_vendors["get_news"], "local");
        assert!(!config.data.data_vendors.contains_key("fundamental_data"));
        config.validate().unwrap();
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut config = TradingAgentsConfig::default();
        config.graph.max_risk_discuss_rounds = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "max_risk_discuss_rounds",
                value: 0
            })
        );
    }

    #[test]
    fn duplicate_and_empty_analysts_rejected() {
        let mut config = TradingAgentsConfig::default();
        config.graph.analysts = vec![];
        assert_eq!(config.validate(), Err(ConfigError::NoAnalysts));

        config.graph.analysts = vec![AnalystKind::News, AnalystKind::News];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAnalyst(_))
        ));
    }

    #[test]
    fn unknown_provider_in_toml_fails() {
        let result: Result<TradingAgentsConfig, _> = toml::from_str("[llm]\nprovider = \"gemini\"");
        assert!(result.is_err());
        assert!(matches!(
            "gemini".parse::<LlmProvider>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("LLM_PROVIDER", "ollama"),
            ("DEEP_THINK_MODEL", "llama3:70b"),
            ("MAX_DEBATE_ROUNDS", "3"),
            ("NEWS_DATA_VENDOR", "local"),
            ("QUICK_THINK_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = TradingAgentsConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.deep_think_llm, "llama3:70b");
        assert_eq!(config.llm.quick_think_llm, "openai/gpt-4o-mini");
        assert_eq!(config.graph.max_debate_rounds, 3);
        assert_eq!(config.data.data_vendors["news_data"], "local");
    }

    #[test]
    fn anthropic_runs_through_claude_cli() {
        assert_eq!("anthropic".parse::<LlmProvider>(), Ok(LlmProvider::ClaudeCli));
        assert_eq!(" Claude ".parse::<LlmProvider>(), Ok(LlmProvider::ClaudeCli));
        assert!(matches!(
            "google".parse::<LlmProvider>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn selected_analysts_override() {
        let mut config = TradingAgentsConfig::default();
        config
            .apply_overrides(|k| (k == "SELECTED_ANALYSTS").then(|| "Market, news".to_string()))
            .unwrap();
        assert_eq!(
            config.graph.analysts,
            vec![AnalystKind::Market, AnalystKind::News]
        );

        let result = config
            .apply_overrides(|k| (k == "SELECTED_ANALYSTS").then(|| "market,weather".to_string()));
        assert_eq!(
            result,
            Err(ConfigError::UnknownAnalyst("weather".to_string()))
        );
    }

    #[test]
    fn bad_numeric_override_is_error() {
        let mut config = TradingAgentsConfig::default();
        let result =
            config.apply_overrides(|k| (k == "MAX_RECUR_LIMIT").then(|| "lots".to_string()));
        assert_eq!(
            result,
            Err(ConfigError::InvalidOverride {
                key: "MAX_RECUR_LIMIT",
                value: "lots".to_string()
            })
        );
    }
}
