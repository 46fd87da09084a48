//! Configuration module for Launch Sentry
//!
//! Defaults come from utils/constants.rs; every field can be overridden
//! through the environment. Parse failures are reported, never defaulted.

use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    is_solana_address, DEFAULT_AUTO_BUY_SCORE, DEFAULT_ENRICHMENT_TIMEOUT_MS, DEFAULT_HIGH_POTENTIAL_SCORE,
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_MAX_TOP_HOLDER_PCT, DEFAULT_MIN_CREATOR_BALANCE_SOL,
    DEFAULT_PUMP_FEED_WSS_URL, DEFAULT_RPC_MAX_RETRIES, DEFAULT_RPC_TIMEOUT_MS,
    DEFAULT_SOLANA_RPC_URL, DEFAULT_SOLANA_WSS_URL, DEFAULT_STATS_INTERVAL_SECS,
    PUMP_PROGRAM_ID,
};

/// Rug-check thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    /// Creator balances strictly below this (SOL) are rejected
    pub min_creator_balance_sol: f64,
    /// Top holder shares at or above this (percent) are rejected
    pub max_top_holder_pct: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            min_creator_balance_sol: DEFAULT_MIN_CREATOR_BALANCE_SOL,
            max_top_holder_pct: DEFAULT_MAX_TOP_HOLDER_PCT,
        }
    }
}

/// Signal thresholds applied to the viability score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreThresholds {
    /// Inclusive
    pub auto_buy: f64,
    /// Exclusive
    pub high_potential: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            auto_buy: DEFAULT_AUTO_BUY_SCORE,
            high_potential: DEFAULT_HIGH_POTENTIAL_SCORE,
        }
    }
}

/// Configuration for the Launch Sentry
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Token-creation feed (PumpPortal)
    pub feed_wss_url: String,
    /// Solana WebSocket for logsSubscribe
    pub solana_wss_url: String,
    /// Solana HTTP RPC for enrichment
    pub solana_rpc_url: String,
    /// Program whose logs are subscribed
    pub program_id: String,
    /// Maximum concurrent enrichment tasks
    pub max_in_flight: usize,
    /// Timeout for a single RPC request
    pub rpc_timeout: Duration,
    /// Retries per RPC request after the first attempt
    pub rpc_max_retries: u32,
    /// Time budget for a whole assessment (both queries)
    pub enrichment_timeout: Duration,
    pub risk: RiskThresholds,
    pub score: ScoreThresholds,
    pub stats_interval: Duration,
    /// Drop creators idle longer than this; `None` keeps history for the process lifetime
    pub creator_idle_ttl: Option<Duration>,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            feed_wss_url: DEFAULT_PUMP_FEED_WSS_URL.to_string(),
            solana_wss_url: DEFAULT_SOLANA_WSS_URL.to_string(),
            solana_rpc_url: DEFAULT_SOLANA_RPC_URL.to_string(),
            program_id: PUMP_PROGRAM_ID.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            rpc_max_retries: DEFAULT_RPC_MAX_RETRIES,
            enrichment_timeout: Duration::from_millis(DEFAULT_ENRICHMENT_TIMEOUT_MS),
            risk: RiskThresholds::default(),
            score: ScoreThresholds::default(),
            stats_interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
            creator_idle_ttl: None,
        }
    }
}

impl SentryConfig {
    /// Load from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("PUMP_FEED_WSS_URL") {
            config.feed_wss_url = url;
        }
        if let Some(url) = lookup("SOLANA_WSS_URL") {
            config.solana_wss_url = url;
        }
        if let Some(url) = lookup("SOLANA_RPC_URL") {
            config.solana_rpc_url = url;
        }
        if let Some(program) = lookup("PUMP_PROGRAM_ID") {
            if !is_solana_address(program.trim()) {
                return Err(AppError::invalid_config("PUMP_PROGRAM_ID", &program));
            }
            config.program_id = program.trim().to_string();
        }
        if let Some(n) = parse_var::<usize, _>(&lookup, "MAX_IN_FLIGHT")? {
            if n == 0 {
                return Err(AppError::invalid_config("MAX_IN_FLIGHT", "0"));
            }
            config.max_in_flight = n;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "RPC_TIMEOUT_MS")? {
            config.rpc_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<u32, _>(&lookup, "RPC_MAX_RETRIES")? {
            config.rpc_max_retries = n;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ENRICHMENT_TIMEOUT_MS")? {
            config.enrichment_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse_finite(&lookup, "MIN_CREATOR_BALANCE_SOL")? {
            if v < 0.0 {
                return Err(AppError::invalid_config("MIN_CREATOR_BALANCE_SOL", &v.to_string()));
            }
            config.risk.min_creator_balance_sol = v;
        }
        if let Some(v) = parse_finite(&lookup, "MAX_TOP_HOLDER_PCT")? {
            if v <= 0.0 || v > 100.0 {
                return Err(AppError::invalid_config("MAX_TOP_HOLDER_PCT", &v.to_string()));
            }
            config.risk.max_top_holder_pct = v;
        }
        if let Some(v) = parse_finite(&lookup, "AUTO_BUY_SCORE")? {
            config.score.auto_buy = v;
        }
        if let Some(v) = parse_finite(&lookup, "HIGH_POTENTIAL_SCORE")? {
            config.score.high_potential = v;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "STATS_INTERVAL_SECS")? {
            config.stats_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CREATOR_IDLE_TTL_SECS")? {
            config.creator_idle_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Log the effective configuration. The RPC URL may embed an API key and is masked.
    pub fn log_summary(&self) {
        info!("⚙️  Feed:            {}", self.feed_wss_url);
        info!("⚙️  Ledger logs:     {}", mask_api_key(&self.solana_wss_url));
        info!("⚙️  Ledger RPC:      {}", mask_api_key(&self.solana_rpc_url));
        info!("⚙️  Program:         {}", self.program_id);
        info!(
            "⚙️  In-flight cap:   {} | enrichment budget: {}ms",
            self.max_in_flight,
            self.enrichment_timeout.as_millis()
        );
        info!(
            "⚙️  Rug thresholds:  balance < {} SOL | top holder >= {}%",
            self.risk.min_creator_balance_sol, self.risk.max_top_holder_pct
        );
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::invalid_config(key, &raw)),
    }
}

/// Thresholds must be finite: a NaN comparison is always false and would pass every token
fn parse_finite<F>(lookup: &F, key: &str) -> AppResult<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<f64, _>(lookup, key)? {
        Some(v) if !v.is_finite() => Err(AppError::invalid_config(key, &v.to_string())),
        other => Ok(other),
    }
}

/// Hide everything after `api-key=` or `/v2/`
pub fn mask_api_key(url: &str) -> String {
    if let Some((head, _)) = url.split_once("api-key=") {
        return format!("{}api-key=***HIDDEN***", head);
    }
    if let Some((head, _)) = url.split_once("/v2/") {
        return format!("{}/v2/***HIDDEN***", head);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SentryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.program_id, PUMP_PROGRAM_ID);
        assert_eq!(config.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(config.risk.min_creator_balance_sol, 1.0);
        assert_eq!(config.risk.max_top_holder_pct, 90.0);
        assert_eq!(config.score.auto_buy, 100.0);
        assert!(config.creator_idle_ttl.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = SentryConfig::from_lookup(lookup(&[
            ("MAX_IN_FLIGHT", "8"),
            ("ENRICHMENT_TIMEOUT_MS", "250"),
            ("MAX_TOP_HOLDER_PCT", "80.5"),
            ("CREATOR_IDLE_TTL_SECS", "3600"),
        ]))
        .unwrap();
        assert_eq!(config.max_in_flight, 8);
        assert_eq!(config.enrichment_timeout, Duration::from_millis(250));
        assert_eq!(config.risk.max_top_holder_pct, 80.5);
        assert_eq!(config.creator_idle_ttl, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = SentryConfig::from_lookup(lookup(&[("MAX_IN_FLIGHT", "lots")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

        let err = SentryConfig::from_lookup(lookup(&[("MAX_IN_FLIGHT", "0")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

        let err = SentryConfig::from_lookup(lookup(&[("PUMP_PROGRAM_ID", "0xdeadbeef")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_non_finite_thresholds_are_rejected() {
        for key in [
            "MIN_CREATOR_BALANCE_SOL",
            "MAX_TOP_HOLDER_PCT",
            "AUTO_BUY_SCORE",
            "HIGH_POTENTIAL_SCORE",
        ] {
            for raw in ["NaN", "inf", "-inf"] {
                let err = SentryConfig::from_lookup(lookup(&[(key, raw)])).unwrap_err();
                assert_eq!(err.code, ErrorCode::ConfigInvalidValue, "{key}={raw}");
            }
        }
    }

    #[test]
    fn test_holder_threshold_range() {
        for raw in ["0", "-5", "100.01"] {
            let err = SentryConfig::from_lookup(lookup(&[("MAX_TOP_HOLDER_PCT", raw)])).unwrap_err();
            assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        }
        let config = SentryConfig::from_lookup(lookup(&[("MAX_TOP_HOLDER_PCT", "100")])).unwrap();
        assert_eq!(config.risk.max_top_holder_pct, 100.0);

        let err = SentryConfig::from_lookup(lookup(&[("MIN_CREATOR_BALANCE_SOL", "-1")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(
            mask_api_key("https://mainnet.helius-rpc.com/?api-key=secret"),
            "https://mainnet.helius-rpc.com/?api-key=***HIDDEN***"
        );
        assert_eq!(
            mask_api_key("https://solana-mainnet.g.alchemy.com/v2/secret"),
            "https://solana-mainnet.g.alchemy.com/v2/***HIDDEN***"
        );
        assert_eq!(mask_api_key(DEFAULT_SOLANA_RPC_URL), DEFAULT_SOLANA_RPC_URL);
    }
}
