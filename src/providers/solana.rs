//! Solana JSON-RPC Provider
//!
//! The two read-only ledger queries behind the rug check:
//! - getBalance: creator wallet balance (lamports)
//! - getTokenLargestAccounts: largest holders of a mint
//!
//! Transport failures and HTTP 429 are retried with exponential backoff and
//! jitter; JSON-RPC error objects are returned as-is.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::rug_check::EnrichmentPort;
use crate::models::config::SentryConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{lamports_to_sol, RPC_RETRY_BASE_MS, USER_AGENT as USER_AGENT_CONST};
use crate::utils::retry::backoff_delay;

/// Ceiling for a single RPC retry delay (milliseconds)
const RPC_RETRY_MAX_MS: u64 = 2_000;

// ============================================
// RPC TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `{"context": {...}, "value": ...}` wrapper used by most Solana methods
#[derive(Debug, Deserialize)]
struct ContextValue<T> {
    value: T,
}

/// One entry of getTokenLargestAccounts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountBalance {
    pub address: String,
    /// Raw amount in base units, as a decimal string
    pub amount: String,
    #[serde(default)]
    pub decimals: u8,
}

impl TokenAccountBalance {
    fn raw_amount(&self) -> AppResult<u64> {
        self.amount.parse::<u64>().map_err(|_| {
            AppError::invalid_response(format!(
                "Holder {} has non-numeric amount '{}'",
                self.address, self.amount
            ))
        })
    }
}

/// Largest holder share in percent. `None` for an empty holder list;
/// a zero total is an error since no share can be derived from it.
pub fn top_holder_percentage(mint: &str, amounts: &[u64]) -> AppResult<Option<f64>> {
    let Some(top) = amounts.iter().copied().max() else {
        return Ok(None);
    };
    let total: u128 = amounts.iter().map(|a| *a as u128).sum();
    if total == 0 {
        return Err(AppError::zero_supply(mint));
    }
    Ok(Some(top as f64 / total as f64 * 100.0))
}

// ============================================
// CLIENT
// ============================================

/// JSON-RPC client for the enrichment queries
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
}

impl SolanaRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration, max_retries: u32) -> AppResult<Self> {
        Ok(Self {
            client: Self::build_client(timeout)?,
            url: url.into(),
            max_retries,
        })
    }

    pub fn from_config(config: &SentryConfig) -> AppResult<Self> {
        Self::new(
            config.solana_rpc_url.clone(),
            config.rpc_timeout,
            config.rpc_max_retries,
        )
    }

    fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorCode::ConfigInvalidValue, "Failed to build HTTP client", e)
            })
    }

    /// Execute a JSON-RPC call with bounded retries
    pub async fn call<T>(&self, method: &str, params: Value) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut attempt = 0;
        loop {
            match self.execute_call::<T>(&payload).await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    attempt += 1;
                    let delay = backoff_delay(attempt, RPC_RETRY_BASE_MS, RPC_RETRY_MAX_MS);
                    debug!(
                        "⏳ {} retry {}/{} after {}ms: {}",
                        method,
                        attempt,
                        self.max_retries,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_call<T>(&self, payload: &Value) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.client.post(&self.url).json(payload).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!("⏳ Rate limited (HTTP 429)");
            return Err(AppError::rpc_failed("Rate limited (HTTP 429)"));
        }
        if !status.is_success() {
            return Err(AppError::rpc_failed(format!("HTTP error: {}", status)));
        }

        let body: RpcResponse<T> = response.json().await.map_err(|e| {
            AppError::with_source(ErrorCode::EnrichmentInvalidResponse, "Unparsable RPC response", e)
        })?;

        if let Some(error) = body.error {
            return Err(AppError::rpc_error(error.code, &error.message));
        }

        body.result
            .ok_or_else(|| AppError::invalid_response("No result in RPC response"))
    }

    /// Balance in SOL; `None` when the node reports no value
    pub async fn get_balance(&self, address: &str) -> AppResult<Option<f64>> {
        let response: ContextValue<Option<u64>> =
            self.call("getBalance", json!([address])).await?;
        Ok(response.value.map(lamports_to_sol))
    }

    pub async fn get_token_largest_accounts(&self, mint: &str) -> AppResult<Vec<TokenAccountBalance>> {
        let response: ContextValue<Vec<TokenAccountBalance>> =
            self.call("getTokenLargestAccounts", json!([mint])).await?;
        Ok(response.value)
    }
}

/// Errors worth another attempt: transport failures, HTTP errors, timeouts.
/// JSON-RPC error objects are final.
fn is_transient(err: &AppError) -> bool {
    matches!(
        err.code,
        ErrorCode::EnrichmentTimeout | ErrorCode::EnrichmentRpcFailed
    )
}

#[async_trait]
impl EnrichmentPort for SolanaRpcClient {
    async fn creator_balance(&self, address: &str) -> AppResult<Option<f64>> {
        self.get_balance(address).await
    }

    async fn top_holder_share(&self, mint: &str) -> AppResult<Option<f64>> {
        let holders = self.get_token_largest_accounts(mint).await?;
        let amounts = holders
            .iter()
            .map(TokenAccountBalance::raw_amount)
            .collect::<AppResult<Vec<_>>>()?;
        top_holder_percentage(mint, &amounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_holder_percentage() {
        let share = top_holder_percentage("M", &[400, 300, 200, 100]).unwrap().unwrap();
        assert!((share - 40.0).abs() < 1e-9);

        let share = top_holder_percentage("M", &[5]).unwrap().unwrap();
        assert_eq!(share, 100.0);
    }

    #[test]
    fn test_top_holder_percentage_edge_cases() {
        assert_eq!(top_holder_percentage("M", &[]).unwrap(), None);

        let err = top_holder_percentage("M", &[0, 0]).unwrap_err();
        assert_eq!(err.code, ErrorCode::EnrichmentZeroSupply);
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        let share = top_holder_percentage("M", &[u64::MAX, u64::MAX]).unwrap().unwrap();
        assert!((share - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_largest_accounts_response() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":[
            {"address":"A1","amount":"771","decimals":2,"uiAmount":7.71,"uiAmountString":"7.71"},
            {"address":"A2","amount":"229","decimals":2,"uiAmount":2.29,"uiAmountString":"2.29"}]}}"#;
        let response: RpcResponse<ContextValue<Vec<TokenAccountBalance>>> =
            serde_json::from_str(raw).unwrap();
        let holders = response.result.unwrap().value;
        let amounts: Vec<u64> = holders.iter().map(|h| h.raw_amount().unwrap()).collect();
        assert_eq!(amounts, vec![771, 229]);
        let share = top_holder_percentage("M", &amounts).unwrap().unwrap();
        assert!((share - 77.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_balance_response() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":2500000000}}"#;
        let response: RpcResponse<ContextValue<Option<u64>>> = serde_json::from_str(raw).unwrap();
        let sol = response.result.unwrap().value.map(lamports_to_sol);
        assert_eq!(sol, Some(2.5));

        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#;
        let response: RpcResponse<ContextValue<Option<u64>>> = serde_json::from_str(raw).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[test]
    fn test_non_numeric_amount_is_invalid_response() {
        let holder = TokenAccountBalance {
            address: "A".into(),
            amount: "lots".into(),
            decimals: 6,
        };
        assert_eq!(holder.raw_amount().unwrap_err().code, ErrorCode::EnrichmentInvalidResponse);
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&AppError::rpc_failed("HTTP error: 502 Bad Gateway")));
        assert!(is_transient(&AppError::new(ErrorCode::EnrichmentTimeout, "Request timeout")));
        assert!(!is_transient(&AppError::rpc_error(-32602, "Invalid param")));
        // Classification follows the code, not the wording
        assert!(is_transient(&AppError::rpc_failed("RPC error while connecting")));
        assert!(!is_transient(&AppError::invalid_response("No result in RPC response")));
    }
}
