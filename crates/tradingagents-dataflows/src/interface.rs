use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};
use tradingagents_models::{ConfigError, DataConfig};

use crate::catalog::DataTool;
use crate::error::DataFetchError;
use crate::memory::ResultCache;
use crate::router::VendorRouter;
use crate::vendor::{DataVendor, FetchRequest};

/// Result of one routed tool call. `vendor` is recorded even on failure.
#[derive(Debug)]
pub struct ToolOutcome {
    pub tool: String,
    pub vendor: String,
    pub result: Result<serde_json::Value, DataFetchError>,
}

/// Routes analyst tool calls to vendors: router → cache → vendor.
pub struct DataInterface {
    router: VendorRouter,
    vendors: HashMap<String, Arc<dyn DataVendor>>,
    cache: ResultCache,
}

impl DataInterface {
    pub fn new(router: VendorRouter, cache_capacity: u64, cache_ttl: Duration) -> Self {
        Self {
            router,
            vendors: HashMap::new(),
            cache: ResultCache::new(cache_capacity, cache_ttl),
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            VendorRouter::from_config(config),
            config.cache_max_capacity,
            Duration::from_secs(config.cache_ttl_seconds),
        )
    }

    /// Register a vendor under its own name, replacing any previous one.
    pub fn with_vendor(mut self, vendor: Arc<dyn DataVendor>) -> Self {
        self.vendors.insert(vendor.name().to_string(), vendor);
        self
    }

    pub fn router(&self) -> &VendorRouter {
        &self.router
    }

    pub fn vendor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.vendors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that every tool resolves to a vendor. Run before any agent starts.
    pub fn validate_tools<I>(&self, tools: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = DataTool>,
    {
        self.router.validate(tools)
    }

    /// Execute a tool call by name. Never panics and never fails the caller:
    /// every problem is reported in the outcome.
    pub async fn call(
        &self,
        tool_name: &str,
        ticker: &str,
        date: NaiveDate,
        args: serde_json::Value,
    ) -> ToolOutcome {
        let Some(tool) = DataTool::parse(tool_name) else {
            return ToolOutcome {
                tool: tool_name.to_string(),
                vendor: "none".to_string(),
                result: Err(DataFetchError::UnknownTool(tool_name.to_string())),
            };
        };

        let vendor_name = match self.router.resolve_tool(tool) {
            Ok(v) => v.to_string(),
            Err(e) => {
                return ToolOutcome {
                    tool: tool.name().to_string(),
                    vendor: "none".to_string(),
                    result: Err(e.into()),
                }
            }
        };

        let request = FetchRequest::new(ticker, date, tool, args);
        let result = self.fetch(&vendor_name, &request).await;
        if let Err(e) = &result {
            warn!(tool = %tool, vendor = %vendor_name, ticker, error = %e, "Tool call failed");
        }

        ToolOutcome {
            tool: tool.name().to_string(),
            vendor: vendor_name,
            result,
        }
    }

    async fn fetch(
        &self,
        vendor_name: &str,
        request: &FetchRequest,
    ) -> Result<serde_json::Value, DataFetchError> {
        let vendor = self
            .vendors
            .get(vendor_name)
            .ok_or_else(|| DataFetchError::VendorUnavailable(vendor_name.to_string()))?;

        if let Some(hit) = self.cache.lookup(vendor_name, request).await {
            debug!(vendor = vendor_name, tool = %request.tool, "Fetch cache hit");
            return Ok(hit);
        }

        let value = vendor.fetch(request).await?;
        self.cache.store(vendor_name, request, value.clone()).await;
        Ok(value)
    }
}
