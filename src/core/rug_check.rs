//! Rug-pull checks
//!
//! Two ordered ledger queries decide whether a fresh token is safe enough
//! to score. Any uncertainty is a rug verdict: a missed trade is cheaper
//! than a false "clean".

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::config::RiskThresholds;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{RiskVerdict, TokenEvent};

/// Read-only ledger queries the assessor depends on
#[async_trait]
pub trait EnrichmentPort: Send + Sync {
    /// Native balance of `address` in SOL; `None` when the account does not exist
    async fn creator_balance(&self, address: &str) -> AppResult<Option<f64>>;

    /// Share of supply held by the largest account, in percent; `None` when no holders are reported
    async fn top_holder_share(&self, mint: &str) -> AppResult<Option<f64>>;
}

/// Short-circuiting rug assessor
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessor {
    thresholds: RiskThresholds,
}

impl RiskAssessor {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub async fn assess(&self, event: &TokenEvent, enrichment: &dyn EnrichmentPort) -> RiskVerdict {
        debug!("🔎 Checking {} ({}) for rug risk", event.name, event.mint);

        let balance = match enrichment.creator_balance(&event.creator).await {
            Ok(balance) => balance.filter(|b| b.is_finite()).unwrap_or(0.0),
            Err(e) => {
                warn!("⚠️ Creator balance lookup failed for {}: {}", event.creator, e);
                return RiskVerdict::enrichment_failure(None, &e);
            }
        };

        if balance < self.thresholds.min_creator_balance_sol {
            info!(
                "❌ Creator {} holds {:.4} SOL (< {} SOL)",
                event.creator, balance, self.thresholds.min_creator_balance_sol
            );
            return RiskVerdict::low_creator_balance(balance);
        }

        let share = match enrichment.top_holder_share(&event.mint).await {
            Ok(Some(share)) if share.is_finite() => share,
            Ok(_) => {
                warn!("⚠️ No usable holder data for {}; assuming worst case", event.mint);
                let err = AppError::invalid_response(format!(
                    "No largest-holder data for {}",
                    event.mint
                ));
                return RiskVerdict::enrichment_failure(Some(balance), &err);
            }
            Err(e) => {
                warn!("⚠️ Holder distribution lookup failed for {}: {}", event.mint, e);
                return RiskVerdict::enrichment_failure(Some(balance), &e);
            }
        };

        if share >= self.thresholds.max_top_holder_pct {
            info!(
                "❌ Top holder of {} owns {:.2}% (>= {}%)",
                event.mint, share, self.thresholds.max_top_holder_pct
            );
            return RiskVerdict::high_holder_concentration(balance, share);
        }

        debug!(
            "✅ {} passed rug checks (balance {:.2} SOL, top holder {:.2}%)",
            event.mint, balance, share
        );
        RiskVerdict::clean(balance, share)
    }
}
