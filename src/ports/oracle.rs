//! Randomness Oracle Port - Outcome Request Interface
//!
//! The engine asks the oracle for an outcome once per bet request. The
//! answer arrives later, out of band, through
//! `SettlementEngine::fulfill`, authenticated by the oracle's identity.
//! An oracle that never answers is covered by the timelocked redeem.

use async_trait::async_trait;

use crate::domain::identity::RequestId;

/// Trait for randomness oracle providers.
#[async_trait]
pub trait RandomnessOracle: Send + Sync + 'static {
  /// Ask for an outcome for `request_id`.
  ///
  /// Must not call back into the engine synchronously; the fulfilment
  /// is delivered later by the oracle's own task.
  async fn request_outcome(&self, request_id: RequestId) -> anyhow::Result<()>;

  /// Check if the oracle connection is healthy.
  async fn is_healthy(&self) -> bool;
}
