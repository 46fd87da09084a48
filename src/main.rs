//! Launch Sentry - real-time pump.fun launch listener
//!
//! Streams new tokens, rejects likely rug pulls using ledger lookups and
//! reports which survivors look worth buying.

use launch_sentry::{SentryConfig, SolanaRpcClient, StreamCoordinator, TelemetryCollector, WsFeedTransport};

use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("🛰️  Launch Sentry v{}", env!("CARGO_PKG_VERSION"));

    let config = SentryConfig::from_env().wrap_err("Invalid configuration")?;
    config.log_summary();

    let enrichment = Arc::new(
        SolanaRpcClient::from_config(&config).wrap_err("Failed to build ledger RPC client")?,
    );
    let telemetry = Arc::new(TelemetryCollector::new());
    let coordinator = StreamCoordinator::new(
        config,
        Arc::new(WsFeedTransport::new()),
        enrichment,
        telemetry.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run = coordinator.run(shutdown_rx);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => {
            if let Err(e) = result {
                error!("❌ Coordinator stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutting down gracefully...");
            let _ = shutdown_tx.send(true);
            run.await.wrap_err("Coordinator failed during shutdown")?;
        }
    }

    let stats = coordinator.get_stats();
    info!(
        "📊 Feed | Received: {} | Malformed: {} | Unclassified: {} | Unactionable: {} | Log notices: {} (unreadable {}) | Reconnects: {}",
        stats.total_received,
        stats.total_malformed,
        stats.total_unclassified,
        stats.total_unactionable,
        stats.log_notices,
        stats.log_malformed,
        stats.reconnects
    );
    info!("👨‍💻 Creators tracked: {}", coordinator.ledger().len());
    println!("{}", telemetry.generate_report());

    Ok(())
}
