//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! infrastructure. Each sub-module groups adapters by concern.
//!
//! Adapter categories:
//! - `clock`: System and manually driven clocks
//! - `ledger`: In-memory asset ledger
//! - `metrics`: Prometheus metrics export, health checks and table query
//! - `oracle`: Channel-backed oracle and the simulated oracle task
//! - `persistence`: JSONL event journal and table snapshots

pub mod clock;
pub mod ledger;
pub mod metrics;
pub mod oracle;
pub mod persistence;
