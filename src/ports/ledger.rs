//! Asset Ledger Port - External Token Balance Interface
//!
//! The engine never holds funds itself: stakes and deposits are debited
//! from, and payouts credited to, an external ledger. `mint`/`burn` exist
//! for funding test actors and simulating out-of-band capital events.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::identity::Identity;

/// Trait for the asset transfer ledger collaborator.
///
/// Implementations must make `debit` all-or-nothing: a failed debit
/// leaves the balance untouched.
#[async_trait]
pub trait AssetLedger: Send + Sync + 'static {
  /// Current balance of `owner` (zero for unknown identities).
  async fn balance_of(&self, owner: &Identity) -> anyhow::Result<Decimal>;

  /// Move `amount` from `owner` into the engine's custody.
  ///
  /// # Errors
  /// Returns error if the balance is insufficient or the ledger is down.
  async fn debit(&self, owner: &Identity, amount: Decimal) -> anyhow::Result<()>;

  /// Move `amount` from the engine's custody to `owner`.
  async fn credit(&self, owner: &Identity, amount: Decimal) -> anyhow::Result<()>;

  /// Create `amount` out of thin air for `owner`.
  async fn mint(&self, owner: &Identity, amount: Decimal) -> anyhow::Result<()>;

  /// Destroy `amount` of `owner`'s balance.
  async fn burn(&self, owner: &Identity, amount: Decimal) -> anyhow::Result<()>;
}
