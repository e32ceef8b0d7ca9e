//! Repository Port - Audit Journal and Snapshot Interface
//!
//! Defines traits for persisting the settlement audit trail using JSONL
//! files and point-in-time table snapshots. Persistence is an observer:
//! the engine's correctness never depends on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::event::SettlementEvent;
use crate::domain::identity::{Identity, RequestId};

/// One provider's share position in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
  pub owner: Identity,
  pub shares: Decimal,
  /// Redeemable value at snapshot time.
  pub value: Decimal,
}

/// Table state snapshot for audits and crash forensics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
  /// Version of the snapshot format.
  pub version: String,
  pub taken_at: DateTime<Utc>,
  pub total_liquidity: Decimal,
  pub total_shares: Decimal,
  /// Stakes held back for pending requests.
  #[serde(default)]
  pub reserved_liquidity: Decimal,
  pub positions: Vec<PositionSnapshot>,
  pub fee_rate: Decimal,
  pub collected_fees: Decimal,
  pub last_request_id: Option<RequestId>,
  pub pending_requests: usize,
}

/// Trait for settlement persistence providers.
///
/// Uses JSONL (JSON Lines) format for the append-only journal. Each line
/// is a self-contained event, so a torn final write loses at most one
/// record.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
  /// Append an event to the journal.
  async fn append_event(&self, event: &SettlementEvent) -> anyhow::Result<()>;

  /// Load all journaled events in time order.
  async fn load_events(&self) -> anyhow::Result<Vec<SettlementEvent>>;

  /// Save a table snapshot, replacing the previous one.
  async fn save_snapshot(&self, snapshot: &TableSnapshot) -> anyhow::Result<()>;

  /// Load the most recent snapshot.
  async fn load_snapshot(&self) -> anyhow::Result<Option<TableSnapshot>>;

  /// Check if the repository is healthy (disk space, permissions).
  async fn is_healthy(&self) -> bool;
}
