//! Roulette Pool — Entry Point
//!
//! Wires a self-contained table: in-memory ledger, channel oracle,
//! file journal and snapshots, metrics and health endpoints. Runs until
//! SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build the settlement engine and inject bootstrap capital
//! 4. Spawn journal writer and metrics listener on the event stream
//! 5. Spawn metrics server and health server (/live, /ready, /table)
//! 6. Spawn the simulated oracle when enabled
//! 7. Spawn the periodic snapshot loop
//! 8. Wait for SIGINT → graceful shutdown (stop→snapshot→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use roulette_pool::adapters::clock::SystemClock;
use roulette_pool::adapters::ledger::InMemoryLedger;
use roulette_pool::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use roulette_pool::adapters::oracle::{run_simulated_oracle, ChannelOracle};
use roulette_pool::adapters::persistence::{run_journal, RepositoryImpl};
use roulette_pool::config;
use roulette_pool::ports::Repository;
use roulette_pool::usecases::{SettlementEngine, TableSettings};

type Engine = SettlementEngine<InMemoryLedger, ChannelOracle, SystemClock>;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        simulate_oracle = config.oracle.simulate,
        "Starting roulette pool"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 3. Settlement engine ────────────────────────────────
    let settings = TableSettings::from_config(&config);
    let admin = settings.admin.clone();
    let oracle_identity = settings.oracle.clone();
    let ledger = Arc::new(InMemoryLedger::new());
    let (oracle, oracle_requests) = ChannelOracle::new();
    let engine: Arc<Engine> = Arc::new(
        SettlementEngine::new(settings, ledger, Arc::new(oracle), Arc::new(SystemClock))
            .context("Failed to build settlement engine")?,
    );

    let repository = Arc::new(
        RepositoryImpl::from_data_dir(&config.persistence.data_dir)
            .await
            .context("Failed to open data directory")?,
    );
    if let Some(previous) = repository.load_snapshot().await? {
        warn!(
            taken_at = %previous.taken_at,
            total_liquidity = %previous.total_liquidity,
            pending = previous.pending_requests,
            "Previous table snapshot found; ledger is in-memory so the table starts empty"
        );
    }

    // ── 4. Event consumers ──────────────────────────────────
    let journal_handle = tokio::spawn(run_journal(Arc::clone(&repository), engine.subscribe()));

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let listener_handle = tokio::spawn(Arc::clone(&metrics).run_listener(engine.subscribe()));

    if config.table.bootstrap_capital > Decimal::ZERO {
        engine
            .inject_capital(&admin, config.table.bootstrap_capital)
            .await
            .context("Failed to inject bootstrap capital")?;
    }
    metrics
        .fee_rate
        .set(engine.bet_fee().await.to_f64().unwrap_or_default());

    // ── 5. Metrics and health servers ───────────────────────
    let metrics_handle = if config.metrics.enabled {
        let shutdown = shutdown_tx.subscribe();
        let bind_address = config.metrics.bind_address.clone();
        let metrics = Arc::clone(&metrics);
        Some(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind_address, shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    let health_state = HealthState::new(engine.clone());
    let health_server = HealthServer::new(health_state.clone(), config.metrics.health_port);
    let health_shutdown = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    // ── 6. Oracle ───────────────────────────────────────────
    let oracle_handle = if config.oracle.simulate {
        warn!("Simulated oracle enabled; outcomes are not provably fair");
        Some(tokio::spawn(run_simulated_oracle(
            Arc::clone(&engine),
            oracle_identity,
            oracle_requests,
            Duration::from_millis(config.oracle.fulfill_delay_ms),
            shutdown_tx.subscribe(),
        )))
    } else {
        warn!(
            oracle = %oracle_identity,
            "No oracle attached; bets resolve only by redeem after the timelock"
        );
        drop(oracle_requests);
        None
    };

    // ── 7. Snapshot loop ────────────────────────────────────
    let snapshot_handle = {
        let engine = Arc::clone(&engine);
        let repository = Arc::clone(&repository);
        let storage_healthy = Arc::clone(&health_state.storage_healthy);
        let interval = Duration::from_secs(config.persistence.snapshot_interval_seconds);
        let mut shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        let ok = save_snapshot(&engine, repository.as_ref()).await;
                        storage_healthy.store(ok, Ordering::Relaxed);
                        let expired = engine.expired_requests().await;
                        if !expired.is_empty() {
                            info!(count = expired.len(), "Requests past their timelock are redeemable");
                        }
                    }
                }
            }
        })
    };

    info!("All tasks spawned — table is open");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    let _ = shutdown_tx.send(());
    health_state.storage_healthy.store(false, Ordering::Relaxed);

    let _ = tokio::time::timeout(Duration::from_secs(5), snapshot_handle).await;
    if let Some(handle) = oracle_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    save_snapshot(&engine, repository.as_ref()).await;

    // Event consumers finish once the last engine handle is gone.
    drop(health_state);
    drop(engine);
    let _ = tokio::time::timeout(Duration::from_secs(5), journal_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), listener_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Persist a table snapshot; returns whether it was written.
async fn save_snapshot(engine: &Engine, repository: &RepositoryImpl) -> bool {
    let snapshot = engine.snapshot().await;
    match repository.save_snapshot(&snapshot).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "Failed to save table snapshot");
            false
        }
    }
}
