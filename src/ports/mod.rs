//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `AssetLedger`: Balances, debits and credits of the external ledger
//! - `RandomnessOracle`: Outcome requests to the randomness source
//! - `Clock`: Wall time for redeem timelocks
//! - `Repository`: Audit journal and snapshots (JSONL-based)

pub mod clock;
pub mod ledger;
pub mod oracle;
pub mod repository;

pub use clock::Clock;
pub use ledger::AssetLedger;
pub use oracle::RandomnessOracle;
pub use repository::{Repository, TableSnapshot};
