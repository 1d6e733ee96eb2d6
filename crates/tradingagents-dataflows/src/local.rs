use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::catalog::DataTool;
use crate::error::DataFetchError;
use crate::vendor::{DataVendor, FetchRequest};

pub const LOCAL_VENDOR: &str = "local";

/// Ticker under which market-wide payloads (global news) are stored.
pub const GLOBAL_TICKER: &str = "*";

/// Schema of the offline vendor store.
///
/// One row per (ticker, tool, as_of). A lookup returns the newest row whose
/// `as_of` is on or before the requested analysis date, so a stored payload
/// never leaks data from after that date.
pub const LOCAL_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS vendor_data (
    ticker      TEXT NOT NULL,
    tool        TEXT NOT NULL,
    as_of       TEXT NOT NULL,
    value_json  TEXT NOT NULL,
    source      TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (ticker, tool, as_of)
);
CREATE INDEX IF NOT EXISTS idx_vendor_data_lookup ON vendor_data(ticker, tool, as_of);
";

/// A stored tool payload.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorRow {
    pub ticker: String,
    pub tool: String,
    pub as_of: NaiveDate,
    pub value_json: String,
    pub source: String,
}

/// Offline vendor reading previously captured payloads from SQLite.
///
/// `rusqlite::Connection` is not `Sync`, so access goes through a `Mutex`.
pub struct LocalVendor {
    conn: Mutex<Connection>,
}

impl LocalVendor {
    /// Open an existing store read-only.
    pub fn open(path: &str) -> Result<Self, DataFetchError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (creating if needed) a writable store with the schema applied.
    pub fn create(path: &str) -> Result<Self, DataFetchError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(LOCAL_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Writable in-memory store. Useful for testing.
    pub fn open_in_memory() -> Result<Self, DataFetchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(LOCAL_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert(&self, row: &VendorRow) -> Result<(), DataFetchError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO vendor_data \
             (ticker, tool, as_of, value_json, source, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                row.ticker,
                row.tool,
                row.as_of.to_string(),
                row.value_json,
                row.source,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Newest payload for (ticker, tool) dated on or before `date`.
    pub fn latest(
        &self,
        ticker: &str,
        tool: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, DataFetchError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT value_json FROM vendor_data \
             WHERE ticker = ?1 AND tool = ?2 AND as_of <= ?3 \
             ORDER BY as_of DESC LIMIT 1",
        )?;
        let result = stmt.query_row(rusqlite::params![ticker, tool, date.to_string()], |row| {
            row.get::<_, String>(0)
        });

        match result {
            Ok(json) => Ok(Some(json)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DataFetchError::Sqlite(e)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DataFetchError> {
        self.conn
            .lock()
            .map_err(|e| DataFetchError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }
}

#[async_trait]
impl DataVendor for LocalVendor {
    fn name(&self) -> &str {
        LOCAL_VENDOR
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, DataFetchError> {
        let ticker = match request.tool {
            DataTool::GetGlobalNews => GLOBAL_TICKER,
            _ => request.ticker.as_str(),
        };
        debug!(ticker, tool = %request.tool, date = %request.date, "Local vendor lookup");

        let json = self
            .latest(ticker, request.tool.name(), request.date)?
            .ok_or_else(|| DataFetchError::NotFound {
                vendor: LOCAL_VENDOR.to_string(),
                tool: request.tool.name().to_string(),
                ticker: ticker.to_string(),
                date: request.date.to_string(),
            })?;
        Ok(serde_json::from_str(&json)?)
    }
}
