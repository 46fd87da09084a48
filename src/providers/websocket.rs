//! WebSocket Feed Subscriptions Module
//!
//! Two long-lived subscriptions feed the coordinator:
//! 1. PumpPortal `subscribeNewToken` - token-creation notices (drives decisions)
//! 2. Solana `logsSubscribe` mentioning the program - raw program logs (display only)
//!
//! The transport only connects, subscribes and forwards text frames.
//! Parsing and reconnection policy belong to the coordinator; a closed
//! receiver means the connection is gone.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::FEED_CHANNEL_CAPACITY;
use crate::utils::decoder::CreateDecoder;

// ============================================
// SUBSCRIPTIONS
// ============================================

/// Which upstream a subscription targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Token-creation notices
    Launches,
    /// Program log notifications
    ProgramLogs,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Launches => "launches",
            FeedKind::ProgramLogs => "program-logs",
        }
    }
}

/// Everything needed to (re)open one feed
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub kind: FeedKind,
    pub url: String,
    /// Frame sent right after the handshake
    pub frame: Value,
}

impl Subscription {
    pub fn new_tokens(url: impl Into<String>) -> Self {
        Self {
            kind: FeedKind::Launches,
            url: url.into(),
            frame: json!({"method": "subscribeNewToken", "params": []}),
        }
    }

    pub fn program_logs(url: impl Into<String>, program_id: &str) -> Self {
        Self {
            kind: FeedKind::ProgramLogs,
            url: url.into(),
            frame: json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "logsSubscribe",
                "params": [
                    {"mentions": [program_id]},
                    {"commitment": "processed"}
                ]
            }),
        }
    }
}

/// Opens a subscription and yields its text frames until the connection ends
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn subscribe(&self, subscription: &Subscription) -> AppResult<mpsc::Receiver<String>>;
}

// ============================================
// WEBSOCKET ADAPTER
// ============================================

/// tokio-tungstenite backed transport
#[derive(Debug, Clone, Default)]
pub struct WsFeedTransport;

impl WsFeedTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeedTransport for WsFeedTransport {
    async fn subscribe(&self, subscription: &Subscription) -> AppResult<mpsc::Receiver<String>> {
        let feed = subscription.kind.as_str();
        let (ws_stream, _) = connect_async(subscription.url.as_str())
            .await
            .map_err(|e| AppError::connect_failed(feed, e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();
        write
            .send(Message::Text(subscription.frame.to_string()))
            .await
            .map_err(|e| AppError::connect_failed(feed, format!("subscribe failed: {}", e)))?;

        info!("🔌 Subscribed to {} feed", feed);

        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if tx.send(text).await.is_err() {
                            debug!("📪 {} receiver dropped, closing socket", feed);
                            let _ = write.close().await;
                            return;
                        }
                    }
                    Ok(Message::Ping(data)) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Ok(Message::Close(frame)) => {
                        warn!("🔌 {} feed closed by server: {:?}", feed, frame);
                        break;
                    }
                    Err(e) => {
                        error!("❌ {} feed error: {}", feed, e);
                        break;
                    }
                    _ => {}
                }
            }
            // Dropping tx ends the receiver; the coordinator reconnects
        });

        Ok(rx)
    }
}

// ============================================
// LOG NOTIFICATIONS
// ============================================

#[derive(Debug, Deserialize)]
struct LogsEnvelope {
    params: LogsParams,
}

#[derive(Debug, Deserialize)]
struct LogsParams {
    result: LogsResult,
}

#[derive(Debug, Deserialize)]
struct LogsResult {
    value: LogNotice,
}

/// `logsNotification` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogNotice {
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub err: Option<Value>,
}

impl LogNotice {
    /// `Ok(None)` for frames that are not log notifications (e.g. the subscribe ack)
    pub fn parse(text: &str) -> AppResult<Option<Self>> {
        let value: Value = serde_json::from_str(text)?;
        if value.get("method").and_then(Value::as_str) != Some("logsNotification") {
            return Ok(None);
        }
        let envelope: LogsEnvelope = serde_json::from_value(value)?;
        Ok(Some(envelope.params.result.value))
    }

    /// The transaction was rejected on chain; its logs describe nothing that happened
    pub fn failed(&self) -> bool {
        self.err.is_some()
    }

    /// Decoded `Program data:` payloads, in log order
    pub fn program_data(&self) -> Vec<AppResult<Vec<u8>>> {
        self.logs
            .iter()
            .filter_map(|line| CreateDecoder::decode_program_data_line(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_subscribe_frames() {
        let sub = Subscription::new_tokens("wss://feed");
        assert_eq!(sub.frame, json!({"method": "subscribeNewToken", "params": []}));
        assert_eq!(sub.kind, FeedKind::Launches);

        let sub = Subscription::program_logs("wss://ledger", "Prog111");
        assert_eq!(sub.frame["method"], "logsSubscribe");
        assert_eq!(sub.frame["params"][0]["mentions"][0], "Prog111");
        assert_eq!(sub.frame["params"][1]["commitment"], "processed");
    }

    #[test]
    fn test_log_notice_parse() {
        let data = bs58::encode(b"hello").into_string();
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "subscription": 7,
                "result": {
                    "context": {"slot": 1},
                    "value": {
                        "signature": "Sig1",
                        "err": null,
                        "logs": ["Program log: Instruction: Create", format!("Program data: {}", data)]
                    }
                }
            }
        });
        let notice = LogNotice::parse(&frame.to_string()).unwrap().unwrap();
        assert_eq!(notice.signature, "Sig1");
        assert!(!notice.failed());

        let payloads = notice.program_data();
        assert_eq!(payloads.len(), 1);
        let bytes = payloads.into_iter().next().unwrap().unwrap();
        assert_eq!(CreateDecoder::payload_as_text(&bytes).unwrap(), "hello");
    }

    #[test]
    fn test_failed_transaction_notice() {
        let frame = json!({
            "method": "logsNotification",
            "params": {"result": {"value": {
                "signature": "Sig2",
                "err": {"InstructionError": [0, {"Custom": 6002}]},
                "logs": []
            }}}
        });
        let notice = LogNotice::parse(&frame.to_string()).unwrap().unwrap();
        assert!(notice.failed());
    }

    #[test]
    fn test_subscribe_ack_is_not_a_notice() {
        let ack = r#"{"jsonrpc":"2.0","result":42,"id":1}"#;
        assert_eq!(LogNotice::parse(ack).unwrap(), None);
    }

    #[test]
    fn test_invalid_program_data_is_decode_error() {
        let notice = LogNotice {
            signature: "S".into(),
            logs: vec!["Program data: 0OIl".into()],
            err: None,
        };
        let err = notice.program_data().remove(0).unwrap_err();
        assert_eq!(err.code, ErrorCode::DecodeInvalidBase58);
    }
}
