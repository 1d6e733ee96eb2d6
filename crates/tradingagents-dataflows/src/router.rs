use std::collections::BTreeMap;

use tradingagents_models::{ConfigError, DataConfig};

use crate::catalog::DataTool;

/// Resolves a tool to a vendor. Tool-level overrides always shadow the
/// category-level default; the lookup is a plain two-step table walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorRouter {
    category_vendors: BTreeMap<String, String>,
    tool_vendors: BTreeMap<String, String>,
}

impl VendorRouter {
    pub fn new(
        category_vendors: BTreeMap<String, String>,
        tool_vendors: BTreeMap<String, String>,
    ) -> Self {
        Self {
            category_vendors,
            tool_vendors,
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(config.data_vendors.clone(), config.tool_vendors.clone())
    }

    pub fn resolve(&self, category: &str, tool_name: &str) -> Result<&str, ConfigError> {
        self.tool_vendors
            .get(tool_name)
            .or_else(|| self.category_vendors.get(category))
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnresolvedVendor {
                category: category.to_string(),
                tool: tool_name.to_string(),
            })
    }

    pub fn resolve_tool(&self, tool: DataTool) -> Result<&str, ConfigError> {
        self.resolve(tool.category().as_str(), tool.name())
    }

    /// Fail on the first tool that has no vendor.
    pub fn validate<I>(&self, tools: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = DataTool>,
    {
        for tool in tools {
            self.resolve_tool(tool)?;
        }
        Ok(())
    }
}
