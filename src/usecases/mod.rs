//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the table's workflows. All of them run on one `SettlementEngine`,
//! split by concern:
//!
//! - `settlement`: Bet submission, outcome fulfilment, timelocked refunds, queries
//! - `liquidity`: Provider deposits and withdrawals, capital events
//! - `treasury`: Fee rate and fee withdrawal
//! - `gateway`: Oracle requests and callback authentication

pub mod gateway;
pub mod liquidity;
pub mod settlement;
pub mod treasury;

pub use gateway::RandomnessGateway;
pub use settlement::{SettlementEngine, TableSettings};
