//! Stream Coordinator
//!
//! Owns both feed subscriptions and drives every token-creation notice
//! through ledger update → rug check → scoring → decision.
//!
//! States: Disconnected → Subscribing → Listening → (Reconnecting → Subscribing) | Terminated
//!
//! One dispatcher loop reads the feeds. Each actionable event is evaluated in
//! its own task; a semaphore caps in-flight evaluations and the dispatcher
//! waits for a permit, which pushes back on the feed.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Interval;
use tracing::{debug, error, info, warn};

use crate::core::creator_ledger::CreatorLedger;
use crate::core::rug_check::{EnrichmentPort, RiskAssessor};
use crate::core::scorer::Scorer;
use crate::models::config::SentryConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    Decision, DecisionAction, InboundMessage, LaunchSummary, RiskVerdict, SentryStats,
    SignalClass, TokenEvent,
};
use crate::providers::websocket::{FeedKind, FeedTransport, LogNotice, Subscription};
use crate::telemetry::DecisionSink;
use crate::utils::constants::{WS_RECONNECT_BASE_MS, WS_RECONNECT_MAX_MS};
use crate::utils::decoder::CreateDecoder;
use crate::utils::retry::backoff_delay;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Subscribing,
    Listening,
    Reconnecting,
    Terminated,
}

/// Why the listen loop returned
enum ListenExit {
    Shutdown,
    Closed(AppError),
}

/// Thread-safe counters
#[derive(Default)]
struct CoordinatorStats {
    total_received: AtomicU64,
    total_malformed: AtomicU64,
    total_unclassified: AtomicU64,
    total_unactionable: AtomicU64,
    total_decisions: AtomicU64,
    total_skipped: AtomicU64,
    total_passed: AtomicU64,
    total_signals: AtomicU64,
    log_notices: AtomicU64,
    log_malformed: AtomicU64,
    reconnects: AtomicU64,
}

impl CoordinatorStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything an evaluation task needs, cheap to clone
#[derive(Clone)]
struct Pipeline {
    assessor: RiskAssessor,
    scorer: Scorer,
    enrichment: Arc<dyn EnrichmentPort>,
    sink: Arc<dyn DecisionSink>,
    stats: Arc<CoordinatorStats>,
    enrichment_timeout: Duration,
}

impl Pipeline {
    /// Assess, score when clean, then emit. Always emits exactly one decision.
    async fn evaluate(
        &self,
        event: TokenEvent,
        launches: LaunchSummary,
        started: Instant,
        mut shutdown: watch::Receiver<bool>,
    ) -> Decision {
        let budget_ms = self.enrichment_timeout.as_millis() as u64;
        let verdict = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                debug!("🛑 Assessment of {} cancelled", event.mint);
                RiskVerdict::enrichment_failure(None, &AppError::enrichment_cancelled())
            }
            outcome = tokio::time::timeout(
                self.enrichment_timeout,
                self.assessor.assess(&event, self.enrichment.as_ref()),
            ) => match outcome {
                Ok(verdict) => verdict,
                Err(_) => {
                    warn!("⏱️ Enrichment for {} exceeded {}ms", event.mint, budget_ms);
                    RiskVerdict::enrichment_failure(None, &AppError::enrichment_timeout(budget_ms))
                }
            }
        };

        let (action, score, classification) = if verdict.is_rug {
            (DecisionAction::Skip, None, Vec::new())
        } else {
            let result = self.scorer.score(&event);
            debug!(
                "📈 {} score {:.2} (market cap {:.2}, reserves {:.2}, initial buy -{:.5}) creator owns {:.2}%",
                event.mint,
                result.score,
                result.components.market_cap_term,
                result.components.reserve_term,
                result.components.initial_buy_penalty,
                result.creator_ownership_ratio * 100.0
            );
            let mut signals = result.signals;
            if signals.contains(&SignalClass::AutoBuy) && !has_trade_params(&event) {
                warn!(
                    "⛔ Auto-buy blocked for {} ({}): missing mint or bonding curve",
                    event.name, event.mint
                );
                signals.retain(|class| *class != SignalClass::AutoBuy);
            }
            (DecisionAction::Pass, Some(result.score), signals)
        };

        let decision = Decision {
            token_name: event.name,
            symbol: event.symbol,
            mint: event.mint,
            creator: event.creator,
            signature: event.signature,
            action,
            verdict,
            score,
            classification,
            repeat_creator_alert: launches.is_repeat_creator().then_some(launches),
            decided_at: Utc::now(),
            latency_ms: started.elapsed().as_millis() as u64,
        };

        self.record(&decision);
        decision
    }

    fn record(&self, decision: &Decision) {
        CoordinatorStats::bump(&self.stats.total_decisions);
        match decision.action {
            DecisionAction::Skip => CoordinatorStats::bump(&self.stats.total_skipped),
            DecisionAction::Pass => CoordinatorStats::bump(&self.stats.total_passed),
        }
        if !decision.classification.is_empty() {
            CoordinatorStats::bump(&self.stats.total_signals);
        }
        self.sink.emit(decision);
    }
}

fn has_trade_params(event: &TokenEvent) -> bool {
    !event.mint.trim().is_empty() && !event.bonding_curve.trim().is_empty()
}

/// Resolves once shutdown is signalled or the sender is gone
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Main coordinator - the heart of Launch Sentry
pub struct StreamCoordinator {
    config: SentryConfig,
    transport: Arc<dyn FeedTransport>,
    launches: Subscription,
    program_logs: Subscription,
    ledger: CreatorLedger,
    pipeline: Pipeline,
    semaphore: Arc<Semaphore>,
    stats: Arc<CoordinatorStats>,
    state: watch::Sender<FeedState>,
}

impl StreamCoordinator {
    pub fn new(
        config: SentryConfig,
        transport: Arc<dyn FeedTransport>,
        enrichment: Arc<dyn EnrichmentPort>,
        sink: Arc<dyn DecisionSink>,
    ) -> Self {
        let stats = Arc::new(CoordinatorStats::default());
        let pipeline = Pipeline {
            assessor: RiskAssessor::new(config.risk),
            scorer: Scorer::new(config.score),
            enrichment,
            sink,
            stats: stats.clone(),
            enrichment_timeout: config.enrichment_timeout,
        };
        let (state, _) = watch::channel(FeedState::Disconnected);

        Self {
            launches: Subscription::new_tokens(config.feed_wss_url.clone()),
            program_logs: Subscription::program_logs(
                config.solana_wss_url.clone(),
                &config.program_id,
            ),
            semaphore: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            transport,
            ledger: CreatorLedger::new(),
            pipeline,
            stats,
            state,
        }
    }

    pub fn ledger(&self) -> &CreatorLedger {
        &self.ledger
    }

    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    pub fn get_stats(&self) -> SentryStats {
        let in_flight = self
            .config
            .max_in_flight
            .saturating_sub(self.semaphore.available_permits()) as u64;

        SentryStats {
            total_received: self.stats.total_received.load(Ordering::Relaxed),
            total_malformed: self.stats.total_malformed.load(Ordering::Relaxed),
            total_unclassified: self.stats.total_unclassified.load(Ordering::Relaxed),
            total_unactionable: self.stats.total_unactionable.load(Ordering::Relaxed),
            total_decisions: self.stats.total_decisions.load(Ordering::Relaxed),
            total_skipped: self.stats.total_skipped.load(Ordering::Relaxed),
            total_passed: self.stats.total_passed.load(Ordering::Relaxed),
            total_signals: self.stats.total_signals.load(Ordering::Relaxed),
            log_notices: self.stats.log_notices.load(Ordering::Relaxed),
            log_malformed: self.stats.log_malformed.load(Ordering::Relaxed),
            reconnects: self.stats.reconnects.load(Ordering::Relaxed),
            in_flight,
        }
    }

    fn set_state(&self, next: FeedState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("🔀 {:?} → {:?}", previous, next);
        }
    }

    /// Run until `shutdown` flips to true. In-flight evaluations are drained
    /// before returning; each one sees the signal and emits promptly.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        info!("🚀 Starting Launch Sentry...");

        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut stats_tick = tokio::time::interval(self.config.stats_interval);
        stats_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        stats_tick.reset();
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(FeedState::Subscribing);
            let subscribed = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                result = self.subscribe_all() => result,
            };

            match subscribed {
                Ok((token_rx, logs_rx)) => {
                    attempt = 0;
                    self.set_state(FeedState::Listening);
                    info!("🔍 Listening for new tokens...");

                    match self
                        .listen(token_rx, logs_rx, &mut tasks, &mut shutdown, &mut stats_tick)
                        .await
                    {
                        ListenExit::Shutdown => break,
                        ListenExit::Closed(e) => warn!("🔌 {}", e),
                    }
                }
                Err(e) if e.code.is_retryable() => error!("❌ Subscribe failed: {}", e),
                Err(e) => {
                    error!("❌ Subscribe failed permanently: {}", e);
                    self.set_state(FeedState::Terminated);
                    while let Some(result) = tasks.join_next().await {
                        Self::reap(result);
                    }
                    return Err(e);
                }
            }

            attempt = attempt.saturating_add(1);
            CoordinatorStats::bump(&self.stats.reconnects);
            self.set_state(FeedState::Reconnecting);
            let delay = backoff_delay(attempt, WS_RECONNECT_BASE_MS, WS_RECONNECT_MAX_MS);
            warn!("🔄 Reconnecting in {}ms (attempt {})", delay.as_millis(), attempt);

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(FeedState::Terminated);
        if !tasks.is_empty() {
            info!("⏳ Waiting for {} in-flight evaluations", tasks.len());
        }
        while let Some(result) = tasks.join_next().await {
            Self::reap(result);
        }
        info!("🛑 Launch Sentry stopped");
        Ok(())
    }

    async fn subscribe_all(&self) -> AppResult<(mpsc::Receiver<String>, mpsc::Receiver<String>)> {
        let tokens = self.transport.subscribe(&self.launches).await?;
        let logs = self.transport.subscribe(&self.program_logs).await?;
        Ok((tokens, logs))
    }

    async fn listen(
        &self,
        mut token_rx: mpsc::Receiver<String>,
        mut logs_rx: mpsc::Receiver<String>,
        tasks: &mut JoinSet<()>,
        shutdown: &mut watch::Receiver<bool>,
        stats_tick: &mut Interval,
    ) -> ListenExit {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => return ListenExit::Shutdown,
                frame = token_rx.recv() => match frame {
                    Some(text) => {
                        if self.dispatch(&text, tasks, shutdown).await.is_break() {
                            return ListenExit::Shutdown;
                        }
                    }
                    None => return ListenExit::Closed(AppError::transport_closed(FeedKind::Launches.as_str())),
                },
                frame = logs_rx.recv() => match frame {
                    Some(text) => self.inspect_logs(&text),
                    None => return ListenExit::Closed(AppError::transport_closed(FeedKind::ProgramLogs.as_str())),
                },
                Some(result) = tasks.join_next(), if !tasks.is_empty() => Self::reap(result),
                _ = stats_tick.tick() => self.on_stats_tick(),
            }
        }
    }

    /// Parse, classify and hand one launch-feed frame to an evaluation task
    async fn dispatch(
        &self,
        text: &str,
        tasks: &mut JoinSet<()>,
        shutdown: &watch::Receiver<bool>,
    ) -> ControlFlow<()> {
        CoordinatorStats::bump(&self.stats.total_received);

        let event = match InboundMessage::parse(text) {
            Ok(InboundMessage::Token(event)) => *event,
            Ok(InboundMessage::Unclassified) => {
                CoordinatorStats::bump(&self.stats.total_unclassified);
                debug!("📨 Ignoring frame: {}", text.chars().take(120).collect::<String>());
                return ControlFlow::Continue(());
            }
            Err(e) => {
                CoordinatorStats::bump(&self.stats.total_malformed);
                warn!("⚠️ Malformed frame skipped: {}", e);
                return ControlFlow::Continue(());
            }
        };

        if !event.is_actionable() {
            CoordinatorStats::bump(&self.stats.total_unactionable);
            debug!("🚫 Token event without mint or creator skipped");
            return ControlFlow::Continue(());
        }

        info!(
            "🆕 {} ({}) | mint: {} | creator: {}",
            event.name, event.symbol, event.mint, event.creator
        );
        let launches = self.ledger.record_launch(&event.creator, &event.name);
        let started = Instant::now();

        let mut waiter = shutdown.clone();
        let permit = tokio::select! {
            biased;
            _ = shutdown_requested(&mut waiter) => None,
            permit = self.semaphore.clone().acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            // Shutting down before evaluation could start
            let pipeline = self.pipeline.clone();
            pipeline.record(&Decision {
                token_name: event.name,
                symbol: event.symbol,
                mint: event.mint,
                creator: event.creator,
                signature: event.signature,
                action: DecisionAction::Skip,
                verdict: RiskVerdict::enrichment_failure(None, &AppError::enrichment_cancelled()),
                score: None,
                classification: Vec::new(),
                repeat_creator_alert: launches.is_repeat_creator().then_some(launches),
                decided_at: Utc::now(),
                latency_ms: started.elapsed().as_millis() as u64,
            });
            return ControlFlow::Break(());
        };

        let pipeline = self.pipeline.clone();
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            let _permit = permit;
            pipeline.evaluate(event, launches, started, shutdown).await;
        });

        ControlFlow::Continue(())
    }

    /// Program-log frames are decoded for the debug log only
    fn inspect_logs(&self, text: &str) {
        let notice = match LogNotice::parse(text) {
            Ok(Some(notice)) => notice,
            Ok(None) => return,
            Err(e) => {
                CoordinatorStats::bump(&self.stats.log_malformed);
                debug!("⚠️ Unreadable log notification: {}", e);
                return;
            }
        };
        CoordinatorStats::bump(&self.stats.log_notices);

        if notice.failed() {
            debug!("📜 {} failed on chain, ignoring its logs", notice.signature);
            return;
        }

        for payload in notice.program_data() {
            match payload {
                Ok(bytes) => match CreateDecoder::decode(&bytes) {
                    Ok(fields) => debug!(
                        "📜 {} create: {} ({}) mint {} curve {} by {}",
                        notice.signature,
                        fields.name,
                        fields.symbol,
                        fields.mint,
                        fields.bonding_curve,
                        fields.user
                    ),
                    Err(_) => match CreateDecoder::payload_as_text(&bytes) {
                        Ok(text) => debug!("📜 {} program data: {}", notice.signature, text),
                        Err(e) => debug!("📜 {} opaque program data ({} bytes): {}", notice.signature, bytes.len(), e),
                    },
                },
                Err(e) => debug!("📜 {} undecodable program data: {}", notice.signature, e),
            }
        }
    }

    fn on_stats_tick(&self) {
        let stats = self.get_stats();
        info!(
            "📊 Stats | Received: {} | Malformed: {} | Ignored: {} | Decisions: {} | Skipped: {} | Passed: {} | Signals: {} | In-flight: {} | Reconnects: {}",
            stats.total_received,
            stats.total_malformed,
            stats.total_unclassified + stats.total_unactionable,
            stats.total_decisions,
            stats.total_skipped,
            stats.total_passed,
            stats.total_signals,
            stats.in_flight,
            stats.reconnects
        );

        if let Some(ttl) = self.config.creator_idle_ttl {
            let removed = self.ledger.prune_idle(ttl);
            if removed > 0 {
                info!("🧹 Dropped {} idle creators ({} tracked)", removed, self.ledger.len());
            }
        }
    }

    fn reap(result: Result<(), JoinError>) {
        if let Err(e) = result {
            if e.is_panic() {
                error!("💥 Evaluation task panicked: {}", e);
            }
        }
    }
}
