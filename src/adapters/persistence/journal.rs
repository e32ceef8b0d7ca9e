//! Event Journal - Append-only JSONL Settlement Records
//!
//! Persists settlement events to daily JSONL files named
//! `journal/YYYY-MM-DD.jsonl`, partitioned by each event's own
//! timestamp. Every line is one self-contained event.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::event::SettlementEvent;

/// Append-only JSONL journal with daily file rotation.
pub struct EventJournal {
    journal_dir: PathBuf,
    /// Serializes appends so lines never interleave.
    write_lock: Mutex<()>,
}

impl EventJournal {
    /// Open (and create if needed) the journal under `data_dir`.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let journal_dir = Path::new(data_dir).join("journal");
        fs::create_dir_all(&journal_dir)
            .await
            .context("Failed to create journal directory")?;

        Ok(Self {
            journal_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, event: &SettlementEvent) -> PathBuf {
        let date = event.at().format("%Y-%m-%d");
        self.journal_dir.join(format!("{date}.jsonl"))
    }

    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn append(&self, event: &SettlementEvent) -> Result<()> {
        let mut json = serde_json::to_string(event).context("Failed to serialize event")?;
        json.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(event))
            .await
            .context("Failed to open journal file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write journal record")?;
        file.flush().await.context("Failed to flush journal")?;

        Ok(())
    }

    /// Load every journaled event, oldest first.
    ///
    /// Malformed lines are skipped with a warning.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<SettlementEvent>> {
        let mut events = Vec::new();
        let mut entries = fs::read_dir(&self.journal_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<SettlementEvent>(line) {
                    Ok(event) => events.push(event),
                    Err(e) => warn!(
                        file = %path.display(),
                        error = %e,
                        "Skipping malformed journal record"
                    ),
                }
            }
        }

        // Stable: same-instant events keep file order.
        events.sort_by_key(SettlementEvent::at);
        info!(count = events.len(), "Loaded journal events");
        Ok(events)
    }

    /// Check that the journal directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.journal_dir.join(".health_check");
        let result = fs::write(&probe, b"ok").await;
        let _ = fs::remove_file(&probe).await;
        result.is_ok()
    }
}
