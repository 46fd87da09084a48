//! Creator Ledger
//!
//! Process-lifetime history of which creator launched which tokens.
//! Backed by DashMap: an update holds the shard write lock for its key,
//! so updates for one creator are serialized while different creators
//! proceed in parallel.
//!
//! The map is unbounded unless the operator opts into idle pruning.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::types::LaunchSummary;
use crate::utils::constants::RECENT_NAMES_LIMIT;

/// Per-creator state
#[derive(Debug, Clone)]
pub struct CreatorRecord {
    /// Most recent names, oldest first, capped at `RECENT_NAMES_LIMIT`
    recent_names: VecDeque<String>,
    launches: u64,
    last_seen: Instant,
}

impl CreatorRecord {
    fn new() -> Self {
        Self {
            recent_names: VecDeque::with_capacity(RECENT_NAMES_LIMIT + 1),
            launches: 0,
            last_seen: Instant::now(),
        }
    }

    fn append(&mut self, token_name: &str) {
        self.launches += 1;
        self.last_seen = Instant::now();
        self.recent_names.push_back(token_name.to_string());
        while self.recent_names.len() > RECENT_NAMES_LIMIT {
            self.recent_names.pop_front();
        }
    }

    fn summary(&self) -> LaunchSummary {
        LaunchSummary {
            total_launches: self.launches,
            recent_names: self.recent_names.iter().cloned().collect(),
        }
    }

    pub fn is_idle(&self, max_idle: Duration) -> bool {
        self.last_seen.elapsed() > max_idle
    }
}

/// Shared, cloneable handle to the creator history
#[derive(Clone, Default)]
pub struct CreatorLedger {
    store: Arc<DashMap<String, CreatorRecord>>,
}

impl CreatorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a launch and return the creator's updated summary
    pub fn record_launch(&self, creator: &str, token_name: &str) -> LaunchSummary {
        let mut record = self
            .store
            .entry(creator.to_string())
            .or_insert_with(CreatorRecord::new);
        record.append(token_name);
        let summary = record.summary();
        drop(record);

        debug!(
            "👨‍💻 Creator {} has launched {} tokens (recent: {})",
            creator,
            summary.total_launches,
            summary.recent_names.join(", ")
        );
        summary
    }

    /// Launch count for a creator, 0 if unknown
    pub fn launches(&self, creator: &str) -> u64 {
        self.store.get(creator).map(|r| r.launches).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Remove creators not seen within `max_idle`; returns how many were dropped
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.store.len();
        self.store.retain(|_, record| !record.is_idle(max_idle));
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            debug!("🧹 Pruned {} idle creators", removed);
        }
        removed
    }
}
