//! Asset Ledger Adapters

pub mod memory;

pub use memory::InMemoryLedger;
