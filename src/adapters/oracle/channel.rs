//! Channel Oracle - In-process Outcome Request Queue
//!
//! Forwards outcome requests onto an unbounded channel. Whoever holds
//! the receiver plays the oracle: the simulated oracle task in
//! development, or a test driving `fulfill` by hand.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::domain::identity::RequestId;
use crate::ports::oracle::RandomnessOracle;

pub struct ChannelOracle {
    requests: mpsc::UnboundedSender<RequestId>,
}

impl ChannelOracle {
    /// Create the oracle and the receiving end of its request queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RequestId>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

#[async_trait]
impl RandomnessOracle for ChannelOracle {
    #[instrument(skip(self))]
    async fn request_outcome(&self, request_id: RequestId) -> Result<()> {
        self.requests
            .send(request_id)
            .ok()
            .context("Oracle request queue closed")?;
        debug!("Outcome request queued");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        !self.requests.is_closed()
    }
}
