//! Decision Telemetry
//!
//! Every decision, skips included, is logged with its reason so an operator
//! can audit why a token was accepted or rejected. Counters are kept in
//! memory for the shutdown report; nothing is written to disk.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{info, warn};

use crate::models::types::{Decision, DecisionAction, RiskReason, SignalClass};

/// Receives every outbound decision
pub trait DecisionSink: Send + Sync {
    fn emit(&self, decision: &Decision);
}

/// Snapshot of the collector counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetryStats {
    pub total_decisions: u64,
    pub total_skipped: u64,
    pub total_passed: u64,
    pub repeat_creator_alerts: u64,
    pub by_reason: HashMap<String, u64>,
    pub by_signal: HashMap<String, u64>,
    pub avg_latency_ms: f64,
    pub session_started: chrono::DateTime<chrono::Utc>,
}

impl TelemetryStats {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    fn count(map: &HashMap<String, u64>, key: &str) -> u64 {
        map.get(key).copied().unwrap_or(0)
    }

    /// Multi-line operator summary
    pub fn report(&self) -> String {
        format!(
            "📊 Session since {}\n\
             \x20  Decisions:          {}\n\
             \x20  Skipped:            {} (low balance {}, concentration {}, enrichment failure {})\n\
             \x20  Passed:             {} (auto-buy {}, high-potential {})\n\
             \x20  Repeat creators:    {}\n\
             \x20  Avg latency:        {:.1}ms",
            self.session_started.format("%Y-%m-%d %H:%M:%S UTC"),
            self.total_decisions,
            self.total_skipped,
            Self::count(&self.by_reason, RiskReason::LowCreatorBalance.as_str()),
            Self::count(&self.by_reason, RiskReason::HighHolderConcentration.as_str()),
            Self::count(&self.by_reason, RiskReason::EnrichmentFailure.as_str()),
            self.total_passed,
            Self::count(&self.by_signal, SignalClass::AutoBuy.as_str()),
            Self::count(&self.by_signal, SignalClass::HighPotential.as_str()),
            self.repeat_creator_alerts,
            self.avg_latency_ms,
        )
    }
}

/// Logging sink with in-memory counters
pub struct TelemetryCollector {
    total_decisions: AtomicU64,
    total_skipped: AtomicU64,
    total_passed: AtomicU64,
    repeat_creator_alerts: AtomicU64,
    total_latency_ms: AtomicU64,
    reason_counts: RwLock<HashMap<RiskReason, u64>>,
    signal_counts: RwLock<HashMap<SignalClass, u64>>,
    session_started: chrono::DateTime<chrono::Utc>,
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            total_decisions: AtomicU64::new(0),
            total_skipped: AtomicU64::new(0),
            total_passed: AtomicU64::new(0),
            repeat_creator_alerts: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            reason_counts: RwLock::new(HashMap::new()),
            signal_counts: RwLock::new(HashMap::new()),
            session_started: chrono::Utc::now(),
        }
    }

    /// Update counters without logging
    pub fn record(&self, decision: &Decision) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(decision.latency_ms, Ordering::Relaxed);

        match decision.action {
            DecisionAction::Skip => self.total_skipped.fetch_add(1, Ordering::Relaxed),
            DecisionAction::Pass => self.total_passed.fetch_add(1, Ordering::Relaxed),
        };
        if decision.repeat_creator_alert.is_some() {
            self.repeat_creator_alerts.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut counts) = self.reason_counts.write() {
            *counts.entry(decision.verdict.reason).or_insert(0) += 1;
        }
        if let Ok(mut counts) = self.signal_counts.write() {
            for class in &decision.classification {
                *counts.entry(*class).or_insert(0) += 1;
            }
        }
    }

    pub fn get_stats(&self) -> TelemetryStats {
        let total_decisions = self.total_decisions.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let by_reason = self
            .reason_counts
            .read()
            .map(|counts| {
                counts
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect()
            })
            .unwrap_or_default();
        let by_signal = self
            .signal_counts
            .read()
            .map(|counts| {
                counts
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect()
            })
            .unwrap_or_default();

        TelemetryStats {
            total_decisions,
            total_skipped: self.total_skipped.load(Ordering::Relaxed),
            total_passed: self.total_passed.load(Ordering::Relaxed),
            repeat_creator_alerts: self.repeat_creator_alerts.load(Ordering::Relaxed),
            by_reason,
            by_signal,
            avg_latency_ms: if total_decisions > 0 {
                total_latency as f64 / total_decisions as f64
            } else {
                0.0
            },
            session_started: self.session_started,
        }
    }

    pub fn generate_report(&self) -> String {
        self.get_stats().report()
    }
}

impl DecisionSink for TelemetryCollector {
    fn emit(&self, decision: &Decision) {
        self.record(decision);

        match decision.action {
            DecisionAction::Skip => info!("{}", decision.summary()),
            DecisionAction::Pass if decision.is_signal(SignalClass::AutoBuy) => {
                warn!("🚀 AUTO-BUY SIGNAL | {}", decision.summary())
            }
            DecisionAction::Pass if decision.is_signal(SignalClass::HighPotential) => {
                info!("🔥 HIGH POTENTIAL | {}", decision.summary())
            }
            DecisionAction::Pass => info!("{}", decision.summary()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{LaunchSummary, RiskVerdict};
    use chrono::Utc;

    fn decision(action: DecisionAction, verdict: RiskVerdict, classes: Vec<SignalClass>) -> Decision {
        Decision {
            token_name: "Alpha".into(),
            symbol: "ALP".into(),
            mint: "M1".into(),
            creator: "C1".into(),
            signature: "S1".into(),
            action,
            score: (action == DecisionAction::Pass).then_some(120.0),
            verdict,
            classification: classes,
            repeat_creator_alert: None,
            decided_at: Utc::now(),
            latency_ms: 10,
        }
    }

    #[test]
    fn test_counters() {
        let collector = TelemetryCollector::new();
        collector.emit(&decision(
            DecisionAction::Skip,
            RiskVerdict::low_creator_balance(0.5),
            vec![],
        ));
        let mut repeat = decision(
            DecisionAction::Pass,
            RiskVerdict::clean(5.0, 30.0),
            vec![SignalClass::AutoBuy, SignalClass::HighPotential],
        );
        repeat.repeat_creator_alert = Some(LaunchSummary {
            total_launches: 2,
            recent_names: vec!["Old".into(), "Alpha".into()],
        });
        repeat.latency_ms = 30;
        collector.emit(&repeat);

        let stats = collector.get_stats();
        assert_eq!(stats.total_decisions, 2);
        assert_eq!(stats.total_skipped, 1);
        assert_eq!(stats.total_passed, 1);
        assert_eq!(stats.repeat_creator_alerts, 1);
        assert_eq!(stats.by_reason.get("low_creator_balance"), Some(&1));
        assert_eq!(stats.by_reason.get("clean"), Some(&1));
        assert_eq!(stats.by_signal.get("auto-buy"), Some(&1));
        assert_eq!(stats.avg_latency_ms, 20.0);
    }

    #[test]
    fn test_report() {
        let collector = TelemetryCollector::new();
        collector.emit(&decision(
            DecisionAction::Pass,
            RiskVerdict::clean(5.0, 30.0),
            vec![SignalClass::HighPotential],
        ));
        let report = collector.generate_report();
        assert!(report.contains("Decisions:          1"));
        assert!(report.contains("high-potential 1"));
        assert!(collector.get_stats().to_json().contains("\"total_passed\": 1"));
    }
}
