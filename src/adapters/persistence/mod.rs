//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the Repository port using append-only JSONL files
//! for the settlement journal and atomic JSON snapshots of the table.
//! No database dependency.

pub mod journal;
pub mod repository_impl;
pub mod state;

pub use journal::EventJournal;
pub use repository_impl::{run_journal, RepositoryImpl};
pub use state::SnapshotStore;
