//! Prometheus Metrics Registry - Table Observability
//!
//! Registers the table's Prometheus metrics and keeps them current from
//! the settlement event stream. Served as text on `/metrics`.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{
    Counter, Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, instrument, warn};

use crate::domain::event::SettlementEvent;

fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Centralized Prometheus metrics for the table.
///
/// All metrics follow the naming convention `roulette_pool_*`.
pub struct MetricsRegistry {
    registry: Registry,
    /// Accepted bet requests.
    pub bets_placed: IntCounter,
    /// Completed requests by resolution (`fulfilled`, `refunded`).
    pub bets_settled: IntCounterVec,
    /// Delivered outcomes by wheel number.
    pub outcomes: IntCounterVec,
    pub stake_total: Counter,
    pub payout_total: Counter,
    pub refund_total: Counter,
    pub fees_accrued: Counter,
    pub fees_withdrawn: Counter,
    /// Outcome requests that never reached the oracle.
    pub oracle_failures: IntCounter,
    /// Provider and capital events by kind.
    pub liquidity_events: IntCounterVec,
    /// Pool value after the latest event.
    pub pool_liquidity: Gauge,
    pub pending_requests: IntGauge,
    pub fee_rate: Gauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bets_placed =
            IntCounter::new("roulette_pool_bets_placed_total", "Accepted bet requests")?;
        let bets_settled = IntCounterVec::new(
            Opts::new("roulette_pool_bets_settled_total", "Completed bet requests"),
            &["resolution"],
        )?;
        let outcomes = IntCounterVec::new(
            Opts::new("roulette_pool_outcomes_total", "Delivered wheel outcomes"),
            &["number"],
        )?;
        let stake_total = Counter::new("roulette_pool_stake_total", "Total stake wagered")?;
        let payout_total = Counter::new("roulette_pool_payout_total", "Total paid to winners")?;
        let refund_total =
            Counter::new("roulette_pool_refund_total", "Total refunded after timelock")?;
        let fees_accrued = Counter::new("roulette_pool_fees_accrued_total", "Total fees booked")?;
        let fees_withdrawn =
            Counter::new("roulette_pool_fees_withdrawn_total", "Total fees withdrawn")?;
        let oracle_failures = IntCounter::new(
            "roulette_pool_oracle_request_failures_total",
            "Outcome requests the oracle never received",
        )?;
        let liquidity_events = IntCounterVec::new(
            Opts::new(
                "roulette_pool_liquidity_events_total",
                "Provider deposits, withdrawals and capital events",
            ),
            &["kind"],
        )?;
        let pool_liquidity = Gauge::new("roulette_pool_liquidity", "Current pool value")?;
        let pending_requests =
            IntGauge::new("roulette_pool_pending_requests", "Bet requests awaiting resolution")?;
        let fee_rate = Gauge::new("roulette_pool_fee_rate", "Current fee rate")?;

        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(bets_settled.clone()))?;
        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(stake_total.clone()))?;
        registry.register(Box::new(payout_total.clone()))?;
        registry.register(Box::new(refund_total.clone()))?;
        registry.register(Box::new(fees_accrued.clone()))?;
        registry.register(Box::new(fees_withdrawn.clone()))?;
        registry.register(Box::new(oracle_failures.clone()))?;
        registry.register(Box::new(liquidity_events.clone()))?;
        registry.register(Box::new(pool_liquidity.clone()))?;
        registry.register(Box::new(pending_requests.clone()))?;
        registry.register(Box::new(fee_rate.clone()))?;

        Ok(Self {
            registry,
            bets_placed,
            bets_settled,
            outcomes,
            stake_total,
            payout_total,
            refund_total,
            fees_accrued,
            fees_withdrawn,
            oracle_failures,
            liquidity_events,
            pool_liquidity,
            pending_requests,
            fee_rate,
        })
    }

    /// Fold one settlement event into the metrics.
    pub fn record(&self, event: &SettlementEvent) {
        match event {
            SettlementEvent::LiquidityAdded { .. } => {
                self.liquidity_events.with_label_values(&["added"]).inc();
            }
            SettlementEvent::LiquidityRemoved { .. } => {
                self.liquidity_events.with_label_values(&["removed"]).inc();
            }
            SettlementEvent::CapitalAdjusted { delta, .. } => {
                let kind = if delta.is_sign_negative() { "drained" } else { "injected" };
                self.liquidity_events.with_label_values(&[kind]).inc();
            }
            SettlementEvent::BetPlaced { stake, fee, .. } => {
                self.bets_placed.inc();
                self.pending_requests.inc();
                self.stake_total.inc_by(as_f64(*stake));
                self.fees_accrued.inc_by(as_f64(*fee));
            }
            SettlementEvent::BetFulfilled { outcome, payout, .. } => {
                self.bets_settled.with_label_values(&["fulfilled"]).inc();
                let number = outcome.to_string();
                self.outcomes.with_label_values(&[number.as_str()]).inc();
                self.pending_requests.dec();
                self.payout_total.inc_by(as_f64(*payout));
            }
            SettlementEvent::BetRefunded { amount, .. } => {
                self.bets_settled.with_label_values(&["refunded"]).inc();
                self.pending_requests.dec();
                self.refund_total.inc_by(as_f64(*amount));
            }
            SettlementEvent::OracleRequestFailed { .. } => {
                self.oracle_failures.inc();
            }
            SettlementEvent::FeeRateChanged { rate, .. } => {
                self.fee_rate.set(as_f64(*rate));
            }
            SettlementEvent::FeesWithdrawn { amount, .. } => {
                self.fees_withdrawn.inc_by(as_f64(*amount));
            }
        }
        if let Some(liquidity) = event.total_liquidity() {
            self.pool_liquidity.set(as_f64(liquidity));
        }
    }

    /// Record events until the channel closes.
    pub async fn run_listener(self: Arc<Self>, mut events: broadcast::Receiver<SettlementEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.record(&event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Metrics listener lagged; counters undercount");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            error!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bet::Outcome;
    use crate::domain::identity::{Identity, RequestId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bet_lifecycle_updates_gauges() {
        let metrics = MetricsRegistry::new().unwrap();
        let owner = Identity::new("p");
        metrics.record(&SettlementEvent::BetPlaced {
            request_id: RequestId::new(1),
            owner: owner.clone(),
            stake: dec!(2),
            fee: dec!(0.5),
            bet_count: 1,
            total_liquidity: dec!(101.5),
            at: Utc::now(),
        });
        assert_eq!(metrics.pending_requests.get(), 1);
        assert!((metrics.pool_liquidity.get() - 101.5).abs() < f64::EPSILON);

        metrics.record(&SettlementEvent::BetFulfilled {
            request_id: RequestId::new(1),
            owner,
            outcome: Outcome::ZERO,
            stake: dec!(2),
            payout: dec!(0),
            total_liquidity: dec!(101.5),
            at: Utc::now(),
        });
        assert_eq!(metrics.pending_requests.get(), 0);
        assert_eq!(metrics.bets_settled.with_label_values(&["fulfilled"]).get(), 1);
        assert!(metrics.render().contains("roulette_pool_bets_placed_total 1"));

        metrics.record(&SettlementEvent::OracleRequestFailed {
            request_id: RequestId::new(2),
            at: Utc::now(),
        });
        assert_eq!(metrics.oracle_failures.get(), 1);
    }
}
