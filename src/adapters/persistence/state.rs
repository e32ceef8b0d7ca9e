//! Snapshot Store - Atomic JSON Table Snapshots
//!
//! Saves table snapshots to `state.json` by writing a temporary file and
//! renaming it over the old one, so a reader always sees a whole
//! snapshot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::ports::repository::TableSnapshot;

pub struct SnapshotStore {
    state_path: PathBuf,
    tmp_path: PathBuf,
}

impl SnapshotStore {
    /// Create the store, creating `data_dir` if it doesn't exist.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            state_path: dir.join("state.json"),
            tmp_path: dir.join("state.json.tmp"),
        })
    }

    /// Save a snapshot atomically (tmp → rename).
    #[instrument(skip(self, snapshot))]
    pub async fn save(&self, snapshot: &TableSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp snapshot file")?;
        fs::rename(&self.tmp_path, &self.state_path)
            .await
            .context("Failed to rename snapshot file")?;

        debug!(
            path = %self.state_path.display(),
            total_liquidity = %snapshot.total_liquidity,
            pending = snapshot.pending_requests,
            "Table snapshot saved"
        );
        Ok(())
    }

    /// Load the last snapshot; `None` on first startup.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<TableSnapshot>> {
        if !fs::try_exists(&self.state_path).await.unwrap_or(false) {
            info!("No snapshot found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.state_path)
            .await
            .context("Failed to read snapshot file")?;
        let snapshot: TableSnapshot =
            serde_json::from_str(&json).context("Failed to parse snapshot JSON")?;

        info!(
            version = %snapshot.version,
            taken_at = %snapshot.taken_at,
            positions = snapshot.positions.len(),
            "Table snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    pub async fn is_healthy(&self) -> bool {
        match fs::try_exists(&self.state_path).await {
            Ok(true) => fs::metadata(&self.state_path).await.is_ok(),
            Ok(false) => true,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::{Identity, RequestId};
    use crate::ports::repository::PositionSnapshot;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().to_str().unwrap()).await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        let mut snapshot = TableSnapshot {
            version: "1".into(),
            taken_at: Utc::now(),
            total_liquidity: dec!(150),
            total_shares: dec!(150),
            reserved_liquidity: dec!(0),
            positions: vec![PositionSnapshot {
                owner: Identity::new("lp"),
                shares: dec!(150),
                value: dec!(150),
            }],
            fee_rate: dec!(0.02),
            collected_fees: dec!(0),
            last_request_id: None,
            pending_requests: 0,
        };
        store.save(&snapshot).await.unwrap();
        snapshot.last_request_id = Some(RequestId::new(3));
        snapshot.pending_requests = 1;
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(snapshot));
        assert!(!dir.path().join("state.json.tmp").exists());
        assert!(store.is_healthy().await);
    }
}
