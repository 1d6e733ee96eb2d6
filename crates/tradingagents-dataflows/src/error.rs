use thiserror::Error;

/// Failure of a single data-tool call. Never fatal to a run on its own.
#[derive(Error, Debug)]
pub enum DataFetchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Vendor not available: {0}")]
    VendorUnavailable(String),

    #[error("Vendor {vendor} does not support {tool}")]
    UnsupportedTool { vendor: String, tool: String },

    #[error("No data from {vendor} for {tool} {ticker} on or before {date}")]
    NotFound {
        vendor: String,
        tool: String,
        ticker: String,
        date: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{vendor} returned an error: {message}")]
    Vendor { vendor: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store not available: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(#[from] tradingagents_models::ConfigError),
}
