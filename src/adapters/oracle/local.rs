//! Simulated Oracle - Development Randomness Source
//!
//! Drains the `ChannelOracle` queue and answers each request with a
//! uniformly random wheel number after a fixed delay, calling back into
//! the engine as the oracle identity. Not a fair randomness source.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::domain::bet::MAX_NUMBER;
use crate::domain::identity::{Identity, RequestId};
use crate::ports::clock::Clock;
use crate::ports::ledger::AssetLedger;
use crate::ports::oracle::RandomnessOracle;
use crate::usecases::settlement::SettlementEngine;

/// Answer queued requests until the queue closes or shutdown is signalled.
pub async fn run_simulated_oracle<L, O, C>(
    engine: Arc<SettlementEngine<L, O, C>>,
    identity: Identity,
    mut requests: mpsc::UnboundedReceiver<RequestId>,
    delay: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    L: AssetLedger,
    O: RandomnessOracle,
    C: Clock,
{
    info!(delay_ms = delay.as_millis(), "Simulated oracle started");
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request_id) = request else { break };
                let engine = Arc::clone(&engine);
                let identity = identity.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let outcome = rand::thread_rng().gen_range(0..=MAX_NUMBER);
                    match engine.fulfill(&identity, request_id, outcome).await {
                        Ok(_) => {}
                        Err(e) if e.is_rejection() => {
                            warn!(request_id = %request_id, outcome, error = %e, "Simulated outcome rejected");
                        }
                        Err(e) => {
                            error!(
                                request_id = %request_id,
                                outcome,
                                error = %e,
                                "Simulated fulfilment failed; request stays pending"
                            );
                        }
                    }
                });
            }
            _ = shutdown_rx.recv() => break,
        }
    }
    info!("Simulated oracle stopped");
}
