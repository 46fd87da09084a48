//! Type definitions for Launch Sentry
//! All core data structures flowing through the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::NEW_TOKEN_METHOD;

// ============================================
// INBOUND EVENTS
// ============================================

/// Token-creation notice from the launch feed.
///
/// Every numeric field is zero when absent, `null`, or unparsable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub mint: String,
    #[serde(default, rename = "bondingCurveKey", deserialize_with = "lenient_string")]
    pub bonding_curve: String,
    #[serde(default, rename = "traderPublicKey", deserialize_with = "lenient_string")]
    pub creator: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uri: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub initial_buy: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap_sol: f64,
    #[serde(default, rename = "vSolInBondingCurve", deserialize_with = "lenient_f64")]
    pub v_sol_in_bonding_curve: f64,
    #[serde(default, rename = "vTokensInBondingCurve", deserialize_with = "lenient_f64")]
    pub v_tokens_in_bonding_curve: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub creator_holdings: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub signature: String,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
}

impl TokenEvent {
    /// Mint and creator are required before any enrichment is attempted
    pub fn is_actionable(&self) -> bool {
        !self.mint.trim().is_empty() && !self.creator.trim().is_empty()
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if parsed.is_finite() { parsed } else { 0.0 })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Shape-classified frame from the launch feed
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `newToken` envelope or flat object carrying `signature` + `mint`
    Token(Box<TokenEvent>),
    /// Anything else (subscription acks, trade notices, ...)
    Unclassified,
}

impl InboundMessage {
    /// Parse a raw text frame. Non-JSON is a decode error, not a silent skip.
    pub fn parse(text: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            AppError::with_source(ErrorCode::DecodeMalformedJson, "Frame is not JSON", e)
        })?;
        Self::classify(value)
    }

    pub fn classify(value: Value) -> AppResult<Self> {
        let payload = if value.get("method").and_then(Value::as_str) == Some(NEW_TOKEN_METHOD) {
            value
                .get("params")
                .and_then(|p| p.get(0))
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()))
        } else if value.get("signature").is_some() && value.get("mint").is_some() {
            value
        } else {
            return Ok(Self::Unclassified);
        };

        let event: TokenEvent = serde_json::from_value(payload)?;
        Ok(Self::Token(Box::new(event)))
    }
}

// ============================================
// RISK VERDICT
// ============================================

/// Why a token passed or failed the rug check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskReason {
    LowCreatorBalance,
    HighHolderConcentration,
    EnrichmentFailure,
    Clean,
}

impl RiskReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskReason::LowCreatorBalance => "low_creator_balance",
            RiskReason::HighHolderConcentration => "high_holder_concentration",
            RiskReason::EnrichmentFailure => "enrichment_failure",
            RiskReason::Clean => "clean",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskReason::LowCreatorBalance => "🪫",
            RiskReason::HighHolderConcentration => "🐋",
            RiskReason::EnrichmentFailure => "❓",
            RiskReason::Clean => "✅",
        }
    }
}

/// Pass/fail outcome of the rug check, with the observations behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub is_rug: bool,
    pub reason: RiskReason,
    /// Creator balance in SOL, when it was fetched
    pub creator_balance_sol: Option<f64>,
    /// Largest holder share in percent, when it was fetched
    pub top_holder_pct: Option<f64>,
    /// Error code and message behind an `EnrichmentFailure`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RiskVerdict {
    pub fn low_creator_balance(balance_sol: f64) -> Self {
        Self {
            is_rug: true,
            reason: RiskReason::LowCreatorBalance,
            creator_balance_sol: Some(balance_sol),
            top_holder_pct: None,
            detail: None,
        }
    }

    pub fn high_holder_concentration(balance_sol: f64, share_pct: f64) -> Self {
        Self {
            is_rug: true,
            reason: RiskReason::HighHolderConcentration,
            creator_balance_sol: Some(balance_sol),
            top_holder_pct: Some(share_pct),
            detail: None,
        }
    }

    pub fn enrichment_failure(balance_sol: Option<f64>, err: &AppError) -> Self {
        Self {
            is_rug: true,
            reason: RiskReason::EnrichmentFailure,
            creator_balance_sol: balance_sol,
            top_holder_pct: None,
            detail: Some(err.to_string()),
        }
    }

    pub fn clean(balance_sol: f64, share_pct: f64) -> Self {
        Self {
            is_rug: false,
            reason: RiskReason::Clean,
            creator_balance_sol: Some(balance_sol),
            top_holder_pct: Some(share_pct),
            detail: None,
        }
    }
}

// ============================================
// SCORING
// ============================================

/// Caller-visible signal categories; a score can cross both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalClass {
    AutoBuy,
    HighPotential,
}

impl SignalClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalClass::AutoBuy => "auto-buy",
            SignalClass::HighPotential => "high-potential",
        }
    }
}

/// Weighted terms of the viability score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// `(100 / (market_cap + 1)) * 1.5`
    pub market_cap_term: f64,
    /// `v_sol * 5`
    pub reserve_term: f64,
    /// `initial_buy / 100000`, subtracted
    pub initial_buy_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub components: ScoreComponents,
    /// Thresholds crossed, in descending strength
    pub signals: Vec<SignalClass>,
    /// `creator_holdings / v_tokens`, 0 when the curve reports no tokens
    pub creator_ownership_ratio: f64,
}

impl ScoreResult {
    pub fn has(&self, class: SignalClass) -> bool {
        self.signals.contains(&class)
    }
}

// ============================================
// CREATOR HISTORY
// ============================================

/// Snapshot returned by every ledger update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSummary {
    pub total_launches: u64,
    /// Oldest first, at most the last three
    pub recent_names: Vec<String>,
}

impl LaunchSummary {
    pub fn is_repeat_creator(&self) -> bool {
        self.total_launches > 1
    }
}

// ============================================
// DECISIONS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    /// Rug check failed; nothing was scored
    Skip,
    /// Rug check passed and the token was scored
    Pass,
}

/// Outbound decision for one token, including skips
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub token_name: String,
    pub symbol: String,
    pub mint: String,
    pub creator: String,
    pub signature: String,
    pub action: DecisionAction,
    pub verdict: RiskVerdict,
    pub score: Option<f64>,
    pub classification: Vec<SignalClass>,
    pub repeat_creator_alert: Option<LaunchSummary>,
    pub decided_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl Decision {
    pub fn is_signal(&self, class: SignalClass) -> bool {
        self.classification.contains(&class)
    }

    /// One-block human summary for the log
    pub fn summary(&self) -> String {
        let mut output = format!(
            "{} {:?} {} ({}) | reason: {} | mint: {}",
            self.verdict.reason.emoji(),
            self.action,
            self.token_name,
            self.symbol,
            self.verdict.reason.as_str(),
            self.mint,
        );

        if let Some(score) = self.score {
            output.push_str(&format!(" | score: {:.2}", score));
        }
        for class in &self.classification {
            output.push_str(&format!(" | {}", class.as_str()));
        }
        if let Some(detail) = &self.verdict.detail {
            output.push_str(&format!(" | detail: {}", detail));
        }
        if let Some(alert) = &self.repeat_creator_alert {
            output.push_str(&format!(
                " | ⚠️ creator {} has launched {} tokens (recent: {})",
                self.creator,
                alert.total_launches,
                alert.recent_names.join(", ")
            ));
        }

        output
    }
}

/// Statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentryStats {
    pub total_received: u64,
    pub total_malformed: u64,
    pub total_unclassified: u64,
    pub total_unactionable: u64,
    pub total_decisions: u64,
    pub total_skipped: u64,
    pub total_passed: u64,
    pub total_signals: u64,
    pub log_notices: u64,
    pub log_malformed: u64,
    pub reconnects: u64,
    pub in_flight: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_token_envelope() {
        let frame = json!({
            "method": "newToken",
            "params": [{"mint": "M1", "traderPublicKey": "C1", "name": "Alpha", "marketCapSol": 30.5}]
        });
        match InboundMessage::classify(frame).unwrap() {
            InboundMessage::Token(event) => {
                assert_eq!(event.mint, "M1");
                assert_eq!(event.creator, "C1");
                assert_eq!(event.market_cap_sol, 30.5);
                assert_eq!(event.initial_buy, 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_flat_event_requires_signature_and_mint() {
        let flat = r#"{"signature":"S1","mint":"M1","traderPublicKey":"C1","txType":"create"}"#;
        assert!(matches!(InboundMessage::parse(flat).unwrap(), InboundMessage::Token(_)));

        let trade = r#"{"mint":"M1","txType":"buy"}"#;
        assert_eq!(InboundMessage::parse(trade).unwrap(), InboundMessage::Unclassified);

        let ack = r#"{"message":"Successfully subscribed to token creation events."}"#;
        assert_eq!(InboundMessage::parse(ack).unwrap(), InboundMessage::Unclassified);
    }

    #[test]
    fn test_non_json_is_decode_error() {
        let err = InboundMessage::parse("not json {").unwrap_err();
        assert_eq!(err.code, ErrorCode::DecodeMalformedJson);
    }

    #[test]
    fn test_null_and_string_numbers_default_safely() {
        let frame = r#"{"signature":"S","mint":"M","initialBuy":null,"marketCapSol":"42.5","vSolInBondingCurve":"abc","name":null}"#;
        let InboundMessage::Token(event) = InboundMessage::parse(frame).unwrap() else {
            panic!("expected token");
        };
        assert_eq!(event.initial_buy, 0.0);
        assert_eq!(event.market_cap_sol, 42.5);
        assert_eq!(event.v_sol_in_bonding_curve, 0.0);
        assert_eq!(event.name, "");
        assert!(!event.is_actionable());
    }

    #[test]
    fn test_envelope_without_params_is_unactionable() {
        let InboundMessage::Token(event) = InboundMessage::parse(r#"{"method":"newToken"}"#).unwrap() else {
            panic!("expected token");
        };
        assert!(!event.is_actionable());
    }

    #[test]
    fn test_decision_summary() {
        let decision = Decision {
            token_name: "Alpha".into(),
            symbol: "ALP".into(),
            mint: "M1".into(),
            creator: "C1".into(),
            signature: "S1".into(),
            action: DecisionAction::Pass,
            verdict: RiskVerdict::clean(10.0, 40.0),
            score: Some(75.0),
            classification: vec![SignalClass::HighPotential],
            repeat_creator_alert: Some(LaunchSummary {
                total_launches: 2,
                recent_names: vec!["Old".into(), "Alpha".into()],
            }),
            decided_at: Utc::now(),
            latency_ms: 3,
        };
        let summary = decision.summary();
        assert!(summary.contains("high-potential"));
        assert!(summary.contains("score: 75.00"));
        assert!(summary.contains("launched 2 tokens"));
    }
}
