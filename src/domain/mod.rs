//! Domain layer - Core settlement logic and models.
//!
//! Pool share accounting, fee accrual, bet validation and payout tables,
//! and the bet request lifecycle. Nothing here performs I/O; the usecases
//! layer drives these types through the ports.

pub mod bet;
pub mod betting;
pub mod error;
pub mod event;
pub mod fees;
pub mod identity;
pub mod pool;
pub mod request;

// Re-export core types for convenience
pub use bet::{Bet, BetType, Color, Outcome, Parity, Selection};
pub use betting::BetEngine;
pub use error::{SettlementError, SettlementResult};
pub use event::SettlementEvent;
pub use fees::FeeLedger;
pub use identity::{Identity, RequestId};
pub use pool::LiquidityPool;
pub use request::{BetRequest, RequestState, Resolution};
