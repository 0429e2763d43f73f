//! Yahoo Finance fundamentals adapter.
//!
//! Uses the `quoteSummary` JSON endpoint:
//!
//! ```text
//! GET {base}/v10/finance/quoteSummary/{ticker}?modules=price,defaultKeyStatistics
//! GET {base}/v10/finance/quoteSummary/{ticker}?modules=incomeStatementHistory,...
//! GET {base}/v10/finance/quoteSummary/{ticker}?modules=assetProfile
//! ```
//!
//! Statement items arrive as one object per period keyed by camelCase field
//! names (`netIncome`, `totalCashFromOperatingActivities`). They are turned
//! into labeled tables with title-case labels so the fuzzy resolver can match
//! them against the usual statement wording.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use warren_common::config::DataConfig;

use super::provider::{FundamentalsProvider, MarketSnapshot, ProviderError};
use super::statements::{fields, FinancialStatements, StatementRow, StatementTable};

const QUOTE_SUMMARY_ENDPOINT: &str = "/v10/finance/quoteSummary";
const SNAPSHOT_MODULES: &str = "price,defaultKeyStatistics";
const STATEMENT_MODULES: &str =
    "incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory";
const PROFILE_MODULES: &str = "assetProfile";

/// Keys present on every statement item that are not line items.
const NON_ITEM_KEYS: &[&str] = &["maxAge", "endDate"];

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance adapter.
pub struct YahooFinanceAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceAdapter {
    /// Create an adapter against a base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create from config
    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            config.quote_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )
    }

    /// Fetch the first `quoteSummary` result for the given modules.
    async fn fetch_summary(&self, ticker: &str, modules: &str) -> Result<Value, ProviderError> {
        let url = format!("{}{}/{}", self.base_url, QUOTE_SUMMARY_ENDPOINT, ticker);
        debug!(url = %url, ticker, modules, "Fetching quote summary");

        let response = self
            .client
            .get(&url)
            .query(&[("modules", modules)])
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::DataNotAvailable(format!("{ticker}: unknown symbol")));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Internal(format!("HTTP {}: {}", status, body)));
        }

        let envelope: QuoteSummaryEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse response: {}", e)))?;

        if let Some(err) = envelope.quote_summary.error {
            let code = err.code.unwrap_or_else(|| "error".into());
            let description = err.description.unwrap_or_default();
            return Err(ProviderError::DataNotAvailable(format!(
                "{ticker}: {code} {description}"
            )));
        }

        envelope
            .quote_summary
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("{ticker}: empty result")))
    }
}

#[async_trait]
impl FundamentalsProvider for YahooFinanceAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot, ProviderError> {
        let summary = self.fetch_summary(ticker, SNAPSHOT_MODULES).await?;

        let price = raw_number(&summary, &["price", "regularMarketPrice"])
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("{ticker}: no price")))?;
        let market_cap = raw_number(&summary, &["price", "marketCap"]).unwrap_or(0.0);
        let shares_outstanding = raw_number(&summary, &["defaultKeyStatistics", "sharesOutstanding"])
            .or_else(|| (price > 0.0 && market_cap > 0.0).then(|| market_cap / price))
            .unwrap_or(0.0);

        Ok(MarketSnapshot {
            price,
            market_cap,
            shares_outstanding,
        })
    }

    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ProviderError> {
        let summary = self.fetch_summary(ticker, STATEMENT_MODULES).await?;

        let income = statement_table(items_at(
            &summary,
            &["incomeStatementHistory", "incomeStatementHistory"],
        ));
        let mut balance = statement_table(items_at(
            &summary,
            &["balanceSheetHistory", "balanceSheetStatements"],
        ));
        let cash_flow = statement_table(items_at(
            &summary,
            &["cashflowStatementHistory", "cashflowStatements"],
        ));

        synthesize_total_debt(&mut balance);

        Ok(FinancialStatements {
            income,
            balance,
            cash_flow,
        })
    }

    async fn sector(&self, ticker: &str) -> Result<Option<String>, ProviderError> {
        let summary = self.fetch_summary(ticker, PROFILE_MODULES).await?;
        Ok(summary
            .pointer("/assetProfile/sector")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from))
    }
}

// ============================================================================
// Statement Conversion
// ============================================================================

/// Read `{"raw": n}` (or a bare number) at a nested path.
fn raw_number(value: &Value, path: &[&str]) -> Option<f64> {
    let node = path.iter().try_fold(value, |v, key| v.get(key))?;
    node.get("raw")
        .and_then(Value::as_f64)
        .or_else(|| node.as_f64())
}

fn items_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Build a table from per-period items, newest period first.
fn statement_table(items: &[Value]) -> StatementTable {
    let mut periods: Vec<&Value> = items.iter().filter(|v| v.is_object()).collect();
    periods.sort_by(|a, b| {
        let a_end = raw_number(a, &["endDate"]).unwrap_or(f64::MIN);
        let b_end = raw_number(b, &["endDate"]).unwrap_or(f64::MIN);
        b_end.total_cmp(&a_end)
    });

    let mut keys: Vec<&str> = Vec::new();
    for period in &periods {
        if let Some(map) = period.as_object() {
            for key in map.keys() {
                if !NON_ITEM_KEYS.contains(&key.as_str()) && !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
    }

    let rows = keys
        .into_iter()
        .map(|key| {
            let values = periods
                .iter()
                .map(|p| raw_number(p, &[key]).unwrap_or(f64::NAN))
                .collect();
            StatementRow::new(camel_to_title(key), values)
        })
        .collect();

    StatementTable::new(rows)
}

/// Add a "Total Debt" row from short and long-term debt when the vendor omits it.
fn synthesize_total_debt(balance: &mut StatementTable) {
    if !balance.resolve(fields::DEBT).is_empty() {
        return;
    }

    // exact labels only: "long term debt" is a substring of "short long term debt"
    let exact = |label: &str| {
        balance
            .rows()
            .iter()
            .find(|r| r.label.eq_ignore_ascii_case(label))
            .map(|r| r.values.clone())
            .unwrap_or_default()
    };
    let short = exact("Short Long Term Debt");
    let long = exact("Long Term Debt");
    if short.is_empty() && long.is_empty() {
        return;
    }

    let len = short.len().max(long.len());
    let pick = |series: &[f64], i: usize| series.get(i).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
    let total = (0..len).map(|i| pick(&short, i) + pick(&long, i)).collect();
    balance.push(StatementRow::new("Total Debt", total));
}

/// "totalCashFromOperatingActivities" -> "Total Cash From Operating Activities"
fn camel_to_title(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 8);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            out.push(' ');
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
