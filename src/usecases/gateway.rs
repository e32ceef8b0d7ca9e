//! Randomness Gateway - Oracle Request and Callback Mediation
//!
//! Issues one outcome request per bet request and authenticates the
//! oracle's callbacks. The gateway holds no request state; whether a
//! callback still matters is decided by the request's own lifecycle.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::error::{SettlementError, SettlementResult};
use crate::domain::identity::{Identity, RequestId};
use crate::ports::oracle::RandomnessOracle;

/// Mediates between the settlement engine and the oracle port.
pub struct RandomnessGateway<O: RandomnessOracle> {
  oracle: Arc<O>,
  /// Only callbacks from this identity are accepted.
  oracle_identity: Identity,
}

impl<O: RandomnessOracle> RandomnessGateway<O> {
  pub fn new(oracle: Arc<O>, oracle_identity: Identity) -> Self {
    Self {
      oracle,
      oracle_identity,
    }
  }

  /// Reject callbacks that do not come from the oracle.
  pub fn authorize(&self, caller: &Identity) -> SettlementResult<()> {
    if caller == &self.oracle_identity {
      Ok(())
    } else {
      warn!(caller = %caller, "Rejected outcome from non-oracle identity");
      Err(SettlementError::Unauthorized {
        caller: caller.clone(),
        action: "fulfill requests",
      })
    }
  }

  /// Ask the oracle for an outcome.
  ///
  /// Returns whether the request reached the oracle. A lost request is
  /// not an error for the caller: the bet stays pending and becomes
  /// redeemable once its timelock runs out.
  pub async fn request(&self, request_id: RequestId) -> bool {
    match self.oracle.request_outcome(request_id).await {
      Ok(()) => {
        debug!(request_id = %request_id, "Outcome requested");
        true
      }
      Err(e) => {
        warn!(
          request_id = %request_id,
          error = %e,
          "Oracle request failed; bet stays pending until redeemable"
        );
        false
      }
    }
  }

  pub fn oracle_identity(&self) -> &Identity {
    &self.oracle_identity
  }

  pub async fn is_healthy(&self) -> bool {
    self.oracle.is_healthy().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct CountingOracle {
    calls: AtomicUsize,
    fail: bool,
  }

  #[async_trait]
  impl RandomnessOracle for CountingOracle {
    async fn request_outcome(&self, _request_id: RequestId) -> anyhow::Result<()> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail {
        anyhow::bail!("oracle unreachable");
      }
      Ok(())
    }

    async fn is_healthy(&self) -> bool {
      !self.fail
    }
  }

  fn gateway(fail: bool) -> RandomnessGateway<CountingOracle> {
    let oracle = Arc::new(CountingOracle {
      calls: AtomicUsize::new(0),
      fail,
    });
    RandomnessGateway::new(oracle, Identity::new("vrf"))
  }

  #[test]
  fn test_only_oracle_is_authorized() {
    let gateway = gateway(false);
    assert!(gateway.authorize(&Identity::new("vrf")).is_ok());
    assert!(matches!(
      gateway.authorize(&Identity::new("mallory")),
      Err(SettlementError::Unauthorized { .. })
    ));
  }

  #[tokio::test]
  async fn test_failed_request_is_reported_not_raised() {
    let gateway = gateway(true);
    assert!(!gateway.request(RequestId::new(1)).await);
    assert_eq!(gateway.oracle.calls.load(Ordering::SeqCst), 1);
    assert!(!gateway.is_healthy().await);
  }
}
