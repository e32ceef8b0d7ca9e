//! Repository Implementation - File-backed `Repository` Port
//!
//! Combines the JSONL `EventJournal` and the atomic `SnapshotStore`
//! behind the `Repository` trait, and runs the task that feeds the
//! journal from the engine's event stream.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use super::journal::EventJournal;
use super::state::SnapshotStore;
use crate::domain::event::SettlementEvent;
use crate::ports::repository::{Repository, TableSnapshot};

pub struct RepositoryImpl {
    snapshots: SnapshotStore,
    journal: EventJournal,
}

impl RepositoryImpl {
    pub fn new(snapshots: SnapshotStore, journal: EventJournal) -> Self {
        Self { snapshots, journal }
    }

    /// Open both stores under `data_dir`, creating directories as needed.
    pub async fn from_data_dir(data_dir: &str) -> Result<Self> {
        let snapshots = SnapshotStore::new(data_dir).await?;
        let journal = EventJournal::new(data_dir).await?;
        Ok(Self::new(snapshots, journal))
    }
}

#[async_trait]
impl Repository for RepositoryImpl {
    async fn append_event(&self, event: &SettlementEvent) -> Result<()> {
        self.journal.append(event).await
    }

    async fn load_events(&self) -> Result<Vec<SettlementEvent>> {
        self.journal.load_all().await
    }

    async fn save_snapshot(&self, snapshot: &TableSnapshot) -> Result<()> {
        self.snapshots.save(snapshot).await
    }

    async fn load_snapshot(&self) -> Result<Option<TableSnapshot>> {
        self.snapshots.load().await
    }

    async fn is_healthy(&self) -> bool {
        self.snapshots.is_healthy().await && self.journal.is_healthy().await
    }
}

/// Journal every event received until the channel closes.
///
/// Write failures are logged and skipped; the journal is an audit trail
/// and never holds up settlement.
pub async fn run_journal<R: Repository>(
    repository: Arc<R>,
    mut events: broadcast::Receiver<SettlementEvent>,
) {
    info!("Journal writer started");
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = repository.append_event(&event).await {
                    error!(event = event.name(), error = %e, "Failed to journal event");
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Journal writer lagged; events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    info!("Journal writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_journal_task_drains_channel() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(
            RepositoryImpl::from_data_dir(dir.path().to_str().unwrap())
                .await
                .unwrap(),
        );
        let (tx, rx) = broadcast::channel(16);
        let task = tokio::spawn(run_journal(repository.clone(), rx));

        let event = SettlementEvent::FeeRateChanged { rate: dec!(0.01), at: Utc::now() };
        tx.send(event.clone()).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(repository.load_events().await.unwrap(), vec![event]);
        assert!(repository.load_snapshot().await.unwrap().is_none());
    }
}
