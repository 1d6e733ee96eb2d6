use std::fmt;

use tradingagents_models::AnalystKind;

/// Data categories. Each maps to a default vendor in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    CoreStockApis,
    TechnicalIndicators,
    FundamentalData,
    NewsData,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 4] = [
        ToolCategory::CoreStockApis,
        ToolCategory::TechnicalIndicators,
        ToolCategory::FundamentalData,
        ToolCategory::NewsData,
    ];

    /// Key used in `data_vendors`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::CoreStockApis => "core_stock_apis",
            ToolCategory::TechnicalIndicators => "technical_indicators",
            ToolCategory::FundamentalData => "fundamental_data",
            ToolCategory::NewsData => "news_data",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every data tool an analyst may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTool {
    GetStockData,
    GetIndicators,
    GetFundamentals,
    GetBalanceSheet,
    GetCashflow,
    GetIncomeStatement,
    GetNews,
    GetGlobalNews,
    GetInsiderSentiment,
    GetInsiderTransactions,
}

impl DataTool {
    pub const ALL: [DataTool; 10] = [
        DataTool::GetStockData,
        DataTool::GetIndicators,
        DataTool::GetFundamentals,
        DataTool::GetBalanceSheet,
        DataTool::GetCashflow,
        DataTool::GetIncomeStatement,
        DataTool::GetNews,
        DataTool::GetGlobalNews,
        DataTool::GetInsiderSentiment,
        DataTool::GetInsiderTransactions,
    ];

    /// Key used in `tool_vendors` and in model tool calls.
    pub fn name(&self) -> &'static str {
        match self {
            DataTool::GetStockData => "get_stock_data",
            DataTool::GetIndicators => "get_indicators",
            DataTool::GetFundamentals => "get_fundamentals",
            DataTool::GetBalanceSheet => "get_balance_sheet",
            DataTool::GetCashflow => "get_cashflow",
            DataTool::GetIncomeStatement => "get_income_statement",
            DataTool::GetNews => "get_news",
            DataTool::GetGlobalNews => "get_global_news",
            DataTool::GetInsiderSentiment => "get_insider_sentiment",
            DataTool::GetInsiderTransactions => "get_insider_transactions",
        }
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            DataTool::GetStockData => ToolCategory::CoreStockApis,
            DataTool::GetIndicators => ToolCategory::TechnicalIndicators,
            DataTool::GetFundamentals
            | DataTool::GetBalanceSheet
            | DataTool::GetCashflow
            | DataTool::GetIncomeStatement => ToolCategory::FundamentalData,
            DataTool::GetNews
            | DataTool::GetGlobalNews
            | DataTool::GetInsiderSentiment
            | DataTool::GetInsiderTransactions => ToolCategory::NewsData,
        }
    }

    /// One-line description shown to the model.
    pub fn description(&self) -> &'static str {
        match self {
            DataTool::GetStockData => {
                "Daily OHLCV price history up to the analysis date. \
                 Args: {\"look_back_days\": int (default 30)}"
            }
            DataTool::GetIndicators => {
                "A technical indicator series up to the analysis date. \
                 Args: {\"indicator\": one of rsi|sma|ema|macd|bbands|atr, \
                 \"time_period\": int (default 14), \"look_back_days\": int (default 30)}"
            }
            DataTool::GetFundamentals => "Company profile and key valuation ratios. Args: {}",
            DataTool::GetBalanceSheet => {
                "Balance sheet reports filed on or before the analysis date. \
                 Args: {\"freq\": annual|quarterly (default quarterly)}"
            }
            DataTool::GetCashflow => {
                "Cash flow statements filed on or before the analysis date. \
                 Args: {\"freq\": annual|quarterly (default quarterly)}"
            }
            DataTool::GetIncomeStatement => {
                "Income statements filed on or before the analysis date. \
                 Args: {\"freq\": annual|quarterly (default quarterly)}"
            }
            DataTool::GetNews => {
                "Company-specific news with sentiment scores. \
                 Args: {\"look_back_days\": int (default 7)}"
            }
            DataTool::GetGlobalNews => {
                "Macro and market-wide news. Args: {\"look_back_days\": int (default 7)}"
            }
            DataTool::GetInsiderSentiment => "Aggregated insider sentiment. Args: {}",
            DataTool::GetInsiderTransactions => "Recent insider transactions. Args: {}",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for DataTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tools available to each analyst.
pub fn tools_for(analyst: AnalystKind) -> &'static [DataTool] {
    match analyst {
        AnalystKind::Market => &[DataTool::GetStockData, DataTool::GetIndicators],
        AnalystKind::Social => &[DataTool::GetNews],
        AnalystKind::News => &[
            DataTool::GetNews,
            DataTool::GetGlobalNews,
            DataTool::GetInsiderSentiment,
            DataTool::GetInsiderTransactions,
        ],
        AnalystKind::Fundamentals => &[
            DataTool::GetFundamentals,
            DataTool::GetBalanceSheet,
            DataTool::GetCashflow,
            DataTool::GetIncomeStatement,
        ],
    }
}
