//! Launch Sentry Library
//!
//! Real-time listener for pump.fun token launches:
//! - Subscribes to token-creation notices and program logs
//! - Tracks per-creator launch history
//! - Rejects likely rug pulls (fail-closed) using ledger lookups
//! - Scores the survivors and reports auto-buy / high-potential signals

pub mod core;
pub mod models;
pub mod providers;
pub mod telemetry;
pub mod utils;

pub use crate::core::{
    CreatorLedger, EnrichmentPort, FeedState, RiskAssessor, Scorer, StreamCoordinator,
};
pub use models::{
    AppError, AppResult, Decision, DecisionAction, ErrorCode, LaunchSummary, RiskReason,
    RiskVerdict, ScoreResult, SentryConfig, SentryStats, SignalClass, TokenEvent,
};
pub use providers::{FeedKind, FeedTransport, SolanaRpcClient, Subscription, WsFeedTransport};
pub use telemetry::{DecisionSink, TelemetryCollector, TelemetryStats};
pub use utils::CreateDecoder;
