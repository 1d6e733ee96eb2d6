use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::catalog::DataTool;
use crate::error::DataFetchError;
use crate::vendor::{DataVendor, FetchRequest};

pub const ALPHA_VANTAGE_VENDOR: &str = "alpha_vantage";

const INDICATORS: [&str; 6] = ["RSI", "SMA", "EMA", "MACD", "BBANDS", "ATR"];
const MAX_NEWS_ITEMS: usize = 20;
const MAX_STATEMENTS: usize = 4;
const MAX_INSIDER_ROWS: usize = 50;
/// Widest `look_back_days` window a model may ask for.
const MAX_LOOK_BACK_DAYS: u64 = 730;

/// Alpha Vantage query API. Every payload is cut to the analysis date so a
/// historical run never sees later data.
pub struct AlphaVantageVendor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageVendor {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DataFetchError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build with the key read from the named environment variable.
    pub fn from_env(base_url: &str, key_env: &str) -> Result<Self, DataFetchError> {
        let key = std::env::var(key_env).ok().filter(|k| !k.trim().is_empty());
        if key.is_none() {
            warn!(key_env, "Alpha Vantage API key not set; calls will fail");
        }
        Self::new(base_url, key, Duration::from_secs(30))
    }

    fn api_key(&self) -> Result<&str, DataFetchError> {
        self.api_key.as_deref().ok_or_else(|| {
            DataFetchError::VendorUnavailable("alpha_vantage: missing API key".into())
        })
    }
}

/// The `look_back_days` argument, bounded to `1..=MAX_LOOK_BACK_DAYS`.
fn look_back_days(request: &FetchRequest, default: u64) -> Result<u64, DataFetchError> {
    let days = match request.args.get("look_back_days") {
        None | Some(Value::Null) => default,
        Some(value) => value.as_u64().ok_or_else(|| {
            DataFetchError::InvalidArgument(format!(
                "look_back_days must be a positive integer, got {value}"
            ))
        })?,
    };
    if days == 0 || days > MAX_LOOK_BACK_DAYS {
        return Err(DataFetchError::InvalidArgument(format!(
            "look_back_days must be between 1 and {MAX_LOOK_BACK_DAYS}, got {days}"
        )));
    }
    Ok(days)
}

/// First day of a `days`-long window ending on `date`.
fn window_start(date: NaiveDate, days: u64) -> Result<NaiveDate, DataFetchError> {
    i64::try_from(days)
        .ok()
        .and_then(chrono::Duration::try_days)
        .and_then(|span| date.checked_sub_signed(span))
        .ok_or_else(|| {
            DataFetchError::InvalidArgument(format!("look_back_days {days} is out of range"))
        })
}

/// Query parameters (minus the key) for a request.
pub fn query_params(request: &FetchRequest) -> Result<Vec<(&'static str, String)>, DataFetchError> {
    let symbol = request.ticker.clone();
    let params = match request.tool {
        DataTool::GetStockData => vec![
            ("function", "TIME_SERIES_DAILY".to_string()),
            ("symbol", symbol),
            ("outputsize", "full".to_string()),
        ],
        DataTool::GetIndicators => {
            let indicator = request
                .arg_str("indicator")
                .map(str::to_ascii_uppercase)
                .ok_or_else(|| DataFetchError::InvalidArgument("indicator is required".into()))?;
            if !INDICATORS.contains(&indicator.as_str()) {
                return Err(DataFetchError::InvalidArgument(format!(
                    "unsupported indicator {indicator}"
                )));
            }
            let mut params = vec![
                ("function", indicator.clone()),
                ("symbol", symbol),
                ("interval", "daily".to_string()),
            ];
            if indicator != "MACD" {
                let period = request.arg_u64("time_period").unwrap_or(14);
                params.push(("time_period", period.to_string()));
            }
            if indicator != "ATR" {
                params.push(("series_type", "close".to_string()));
            }
            params
        }
        DataTool::GetFundamentals => vec![("function", "OVERVIEW".to_string()), ("symbol", symbol)],
        DataTool::GetBalanceSheet => {
            vec![("function", "BALANCE_SHEET".to_string()), ("symbol", symbol)]
        }
        DataTool::GetCashflow => vec![("function", "CASH_FLOW".to_string()), ("symbol", symbol)],
        DataTool::GetIncomeStatement => {
            vec![("function", "INCOME_STATEMENT".to_string()), ("symbol", symbol)]
        }
        DataTool::GetNews | DataTool::GetGlobalNews => {
            let from = window_start(request.date, look_back_days(request, 7)?)?;
            let mut params = vec![
                ("function", "NEWS_SENTIMENT".to_string()),
                ("time_from", format!("{}T0000", from.format("%Y%m%d"))),
                ("time_to", format!("{}T2359", request.date.format("%Y%m%d"))),
                ("sort", "LATEST".to_string()),
                ("limit", "50".to_string()),
            ];
            if request.tool == DataTool::GetNews {
                params.push(("tickers", symbol));
            } else {
                params.push((
                    "topics",
                    "financial_markets,economy_macro,economy_monetary".to_string(),
                ));
            }
            params
        }
        DataTool::GetInsiderTransactions => vec![
            ("function", "INSIDER_TRANSACTIONS".to_string()),
            ("symbol", symbol),
        ],
        DataTool::GetInsiderSentiment => {
            return Err(DataFetchError::UnsupportedTool {
                vendor: ALPHA_VANTAGE_VENDOR.to_string(),
                tool: request.tool.name().to_string(),
            })
        }
    };
    Ok(params)
}

/// Reject error payloads, then trim the response to what an analyst needs.
pub fn shape_response(request: &FetchRequest, body: Value) -> Result<Value, DataFetchError> {
    for key in ["Error Message", "Information", "Note"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(DataFetchError::Vendor {
                vendor: ALPHA_VANTAGE_VENDOR.to_string(),
                message: message.to_string(),
            });
        }
    }

    let shaped = match request.tool {
        DataTool::GetStockData => json!({
            "symbol": request.ticker,
            "series": windowed_series(&body, "Time Series", request.date, series_limit(request)?)?,
        }),
        DataTool::GetIndicators => json!({
            "symbol": request.ticker,
            "indicator": request.arg_str("indicator").unwrap_or_default(),
            "series": windowed_series(
                &body,
                "Technical Analysis",
                request.date,
                series_limit(request)?,
            )?,
        }),
        DataTool::GetBalanceSheet | DataTool::GetCashflow | DataTool::GetIncomeStatement => {
            let freq = request.arg_str("freq").unwrap_or("quarterly");
            let key = if freq == "annual" {
                "annualReports"
            } else {
                "quarterlyReports"
            };
            let reports: Vec<Value> = body
                .get(key)
                .and_then(Value::as_array)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| on_or_before(r.get("fiscalDateEnding"), request.date))
                        .take(MAX_STATEMENTS)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            json!({ "symbol": request.ticker, "freq": freq, "reports": reports })
        }
        DataTool::GetNews | DataTool::GetGlobalNews => {
            let feed: Vec<Value> = body
                .get("feed")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .take(MAX_NEWS_ITEMS)
                        .map(|item| {
                            json!({
                                "title": item.get("title"),
                                "source": item.get("source"),
                                "time_published": item.get("time_published"),
                                "summary": item.get("summary"),
                                "overall_sentiment_score": item.get("overall_sentiment_score"),
                                "overall_sentiment_label": item.get("overall_sentiment_label"),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({ "feed": feed })
        }
        DataTool::GetInsiderTransactions => {
            let rows: Vec<Value> = body
                .get("data")
                .and_then(Value::as_array)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| on_or_before(r.get("transaction_date"), request.date))
                        .take(MAX_INSIDER_ROWS)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            json!({ "symbol": request.ticker, "transactions": rows })
        }
        DataTool::GetFundamentals | DataTool::GetInsiderSentiment => body,
    };
    Ok(shaped)
}

fn series_limit(request: &FetchRequest) -> Result<usize, DataFetchError> {
    let days = look_back_days(request, 30)?;
    usize::try_from(days).map_err(|_| {
        DataFetchError::InvalidArgument(format!("look_back_days {days} is out of range"))
    })
}

fn on_or_before(value: Option<&Value>, date: NaiveDate) -> bool {
    value
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .is_some_and(|d| d <= date)
}

/// Take the series under the first key starting with `prefix`, keep entries
/// dated on or before `date`, and return the last `limit` in ascending order.
fn windowed_series(
    body: &Value,
    prefix: &str,
    date: NaiveDate,
    limit: usize,
) -> Result<Vec<Value>, DataFetchError> {
    let series: &Map<String, Value> = body
        .as_object()
        .and_then(|obj| {
            obj.iter()
                .find(|(k, _)| k.starts_with(prefix))
                .and_then(|(_, v)| v.as_object())
        })
        .ok_or_else(|| DataFetchError::Vendor {
            vendor: ALPHA_VANTAGE_VENDOR.to_string(),
            message: format!("response has no '{prefix}' section"),
        })?;

    let mut points: Vec<(NaiveDate, &Value)> = series
        .iter()
        .filter_map(|(k, v)| {
            let day = k.get(..10)?;
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok().map(|d| (d, v))
        })
        .filter(|(d, _)| *d <= date)
        .collect();
    points.sort_by_key(|(d, _)| *d);

    let start = points.len().saturating_sub(limit);
    Ok(points[start..]
        .iter()
        .map(|(d, v)| {
            let mut entry = Map::new();
            entry.insert("date".to_string(), Value::String(d.to_string()));
            if let Some(fields) = v.as_object() {
                for (k, v) in fields {
                    // "1. open" -> "open"
                    let name = k.split_once(". ").map_or(k.as_str(), |(_, n)| n);
                    entry.insert(name.to_string(), v.clone());
                }
            }
            Value::Object(entry)
        })
        .collect())
}

#[async_trait]
impl DataVendor for AlphaVantageVendor {
    fn name(&self) -> &str {
        ALPHA_VANTAGE_VENDOR
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Value, DataFetchError> {
        let mut params = query_params(request)?;
        params.push(("apikey", self.api_key()?.to_string()));
        debug!(tool = %request.tool, ticker = %request.ticker, "Alpha Vantage request");

        let body: Value = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        shape_response(request, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request(tool: DataTool, args: Value) -> FetchRequest {
        FetchRequest::new("NVDA", date("2024-05-10"), tool, args)
    }

    #[test]
    fn indicator_params() {
        let req = request(DataTool::GetIndicators, json!({"indicator": "rsi", "time_period": 7}));
        let params = query_params(&req).unwrap();
        assert!(params.contains(&("function", "RSI".to_string())));
        assert!(params.contains(&("time_period", "7".to_string())));
        assert!(params.contains(&("series_type", "close".to_string())));

        let macd = query_params(&request(DataTool::GetIndicators, json!({"indicator": "macd"})))
            .unwrap();
        assert!(!macd.iter().any(|(k, _)| *k == "time_period"));
    }

    #[test]
    fn indicator_requires_known_name() {
        let missing = query_params(&request(DataTool::GetIndicators, json!({})));
        assert!(matches!(missing, Err(DataFetchError::InvalidArgument(_))));
        let unknown = query_params(&request(DataTool::GetIndicators, json!({"indicator": "vwma"})));
        assert!(matches!(unknown, Err(DataFetchError::InvalidArgument(_))));
    }

    #[test]
    fn news_window_ends_on_analysis_date() {
        let params =
            query_params(&request(DataTool::GetNews, json!({"look_back_days": 3}))).unwrap();
        assert!(params.contains(&("time_from", "20240507T0000".to_string())));
        assert!(params.contains(&("time_to", "20240510T2359".to_string())));
        assert!(params.contains(&("tickers", "NVDA".to_string())));
    }

    #[test]
    fn oversized_look_back_is_rejected() {
        for days in [json!(1_000_000_000_000_000_000u64), json!(u64::MAX), json!(731), json!(0)] {
            let args = json!({"look_back_days": days.clone()});
            let news = query_params(&request(DataTool::GetNews, args));
            assert!(
                matches!(news, Err(DataFetchError::InvalidArgument(_))),
                "look_back_days {days} accepted"
            );
        }
        let negative = query_params(&request(
            DataTool::GetGlobalNews,
            json!({"look_back_days": -5}),
        ));
        assert!(matches!(negative, Err(DataFetchError::InvalidArgument(_))));

        let body = json!({"Time Series (Daily)": {}});
        let stock = shape_response(
            &request(DataTool::GetStockData, json!({"look_back_days": 1e18})),
            body,
        );
        assert!(matches!(stock, Err(DataFetchError::InvalidArgument(_))));
    }

    #[test]
    fn widest_window_is_accepted() {
        let params =
            query_params(&request(DataTool::GetNews, json!({"look_back_days": 730}))).unwrap();
        assert!(params.contains(&("time_from", "20220511T0000".to_string())));
    }

    #[test]
    fn insider_sentiment_unsupported() {
        let result = query_params(&request(DataTool::GetInsiderSentiment, json!({})));
        assert!(matches!(result, Err(DataFetchError::UnsupportedTool { .. })));
    }

    #[test]
    fn statements_filtered_by_fiscal_date() {
        let body = json!({
            "quarterlyReports": [
                {"fiscalDateEnding": "2024-07-28", "totalAssets": "3"},
                {"fiscalDateEnding": "2024-04-28", "totalAssets": "2"},
                {"fiscalDateEnding": "2024-01-28", "totalAssets": "1"}
            ]
        });
        let shaped = shape_response(&request(DataTool::GetBalanceSheet, json!({})), body).unwrap();
        let reports = shaped["reports"].as_array().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["fiscalDateEnding"], "2024-04-28");
    }

    #[test]
    fn rate_limit_note_is_error() {
        let body = json!({"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."});
        let err = shape_response(&request(DataTool::GetFundamentals, json!({})), body).unwrap_err();
        assert!(matches!(err, DataFetchError::Vendor { .. }));
    }

    #[tokio::test]
    async fn stock_data_cut_at_analysis_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "TIME_SERIES_DAILY"))
            .and(query_param("symbol", "NVDA"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Meta Data": {"2. Symbol": "NVDA"},
                "Time Series (Daily)": {
                    "2024-05-13": {"1. open": "905.0", "4. close": "903.9"},
                    "2024-05-10": {"1. open": "896.0", "4. close": "898.8"},
                    "2024-05-09": {"1. open": "884.0", "4. close": "887.5"},
                    "2024-05-08": {"1. open": "880.0", "4. close": "904.1"}
                }
            })))
            .mount(&server)
            .await;

        let vendor =
            AlphaVantageVendor::new(&server.uri(), Some("test-key".into()), Duration::from_secs(5))
                .unwrap();
        let value = vendor
            .fetch(&request(DataTool::GetStockData, json!({"look_back_days": 2})))
            .await
            .unwrap();

        let series = value["series"].as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["date"], "2024-05-09");
        assert_eq!(series[1]["date"], "2024-05-10");
        assert_eq!(series[1]["close"], "898.8");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let vendor = AlphaVantageVendor::new("http://127.0.0.1:1", None, Duration::from_secs(1))
            .unwrap();
        let err = vendor
            .fetch(&request(DataTool::GetFundamentals, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DataFetchError::VendorUnavailable(_)));
    }

    #[tokio::test]
    async fn http_error_status_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let vendor =
            AlphaVantageVendor::new(&server.uri(), Some("k".into()), Duration::from_secs(5))
                .unwrap();
        let err = vendor
            .fetch(&request(DataTool::GetFundamentals, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DataFetchError::Http(_)));
    }
}
