use async_trait::async_trait;
use chrono::NaiveDate;

use crate::catalog::DataTool;
use crate::error::DataFetchError;

/// One data request, as issued by an analyst tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub ticker: String,
    pub date: NaiveDate,
    pub tool: DataTool,
    /// Tool-specific arguments (look-back window, indicator name, ...).
    pub args: serde_json::Value,
}

impl FetchRequest {
    pub fn new(ticker: &str, date: NaiveDate, tool: DataTool, args: serde_json::Value) -> Self {
        Self {
            ticker: ticker.to_string(),
            date,
            tool,
            args,
        }
    }

    /// Cache key: `{vendor}:{tool}:{ticker}:{date}:{args}`.
    pub fn cache_key(&self, vendor: &str) -> String {
        format!(
            "{vendor}:{}:{}:{}:{}",
            self.tool.name(),
            self.ticker,
            self.date,
            self.args
        )
    }

    pub fn arg_u64(&self, name: &str) -> Option<u64> {
        self.args.get(name).and_then(|v| v.as_u64())
    }

    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(|v| v.as_str())
    }
}

/// A named external data source. Mockable for testing.
#[async_trait]
pub trait DataVendor: Send + Sync {
    /// Name used in `data_vendors` / `tool_vendors`.
    fn name(&self) -> &str;

    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, DataFetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_args() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let a = FetchRequest::new(
            "NVDA",
            date,
            DataTool::GetIndicators,
            serde_json::json!({"indicator": "rsi"}),
        );
        let b = FetchRequest::new(
            "NVDA",
            date,
            DataTool::GetIndicators,
            serde_json::json!({"indicator": "macd"}),
        );
        assert_ne!(a.cache_key("local"), b.cache_key("local"));
        assert!(a.cache_key("local").starts_with("local:get_indicators:NVDA:2024-05-10:"));
        assert_eq!(a.arg_str("indicator"), Some("rsi"));
        assert_eq!(a.arg_u64("look_back_days"), None);
    }
}
