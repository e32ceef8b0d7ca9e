//! Health Check Server - Probes and Table Query
//!
//! Exposes `/live`, `/ready` and a read-only `/table` JSON snapshot via
//! axum 0.7. Readiness depends on the oracle and on snapshot storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::ports::clock::Clock;
use crate::ports::ledger::AssetLedger;
use crate::ports::oracle::RandomnessOracle;
use crate::ports::repository::TableSnapshot;
use crate::usecases::settlement::SettlementEngine;

/// Read-only view of a table for the HTTP surface.
#[async_trait]
pub trait TableProbe: Send + Sync + 'static {
    async fn table_snapshot(&self) -> TableSnapshot;

    async fn oracle_ready(&self) -> bool;
}

#[async_trait]
impl<L: AssetLedger, O: RandomnessOracle, C: Clock> TableProbe for SettlementEngine<L, O, C> {
    async fn table_snapshot(&self) -> TableSnapshot {
        self.snapshot().await
    }

    async fn oracle_ready(&self) -> bool {
        self.oracle_healthy().await
    }
}

/// Shared health state polled by readiness probes.
#[derive(Clone)]
pub struct HealthState {
    /// Cleared by the snapshot loop when storage stops accepting writes.
    pub storage_healthy: Arc<AtomicBool>,
    table: Arc<dyn TableProbe>,
}

impl HealthState {
    pub fn new(table: Arc<dyn TableProbe>) -> Self {
        Self {
            storage_healthy: Arc::new(AtomicBool::new(true)),
            table,
        }
    }

    /// Check if the table is ready to take bets.
    pub async fn is_ready(&self) -> bool {
        self.storage_healthy.load(Ordering::Relaxed) && self.table.oracle_ready().await
    }
}

/// Axum-based health and query HTTP server.
pub struct HealthServer {
    state: HealthState,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    pub fn new(state: HealthState, port: u16) -> Self {
        Self { state, port }
    }

    /// Serve until shutdown is signalled.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/table", get(Self::table))
            .with_state(self.state);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
        if state.is_ready().await {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn table(State(state): State<HealthState>) -> Json<TableSnapshot> {
        Json(state.table.table_snapshot().await)
    }
}
