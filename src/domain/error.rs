//! Settlement error taxonomy.
//!
//! Every variant except `Ledger` and `PoolInsolvent` is raised before any
//! state is touched, so a failed call leaves pool, fees and requests exactly
//! as they were.

use rust_decimal::Decimal;
use thiserror::Error;

use super::identity::{Identity, RequestId};

#[derive(Debug, Error)]
pub enum SettlementError {
    /// A bet with a value outside its type's domain, a non-positive amount,
    /// or a malformed bet list.
    #[error("invalid bet: {0}")]
    InvalidBet(String),

    #[error("Your bet exceeds the max allowed")]
    BetTooLarge { amount: Decimal, max_bet: Decimal },

    #[error("Redeem time not passed")]
    NotElapsed { request_id: RequestId },

    #[error("requestId already completed")]
    AlreadyCompleted { request_id: RequestId },

    #[error("no liquidity position for {0}")]
    NoPosition(Identity),

    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: Identity, action: &'static str },

    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("outcome {0} is not on the wheel")]
    InvalidOutcome(u8),

    #[error("fee rate must be in [0, 1), got {0}")]
    InvalidFeeRate(Decimal),

    #[error("{owner} holds {available}, needs {required}")]
    InsufficientBalance {
        owner: Identity,
        required: Decimal,
        available: Decimal,
    },

    /// Worst-case payout of the request cannot be covered by the pool.
    #[error("pool cannot cover a worst-case payout of {worst_case}")]
    InsufficientLiquidity { worst_case: Decimal, available: Decimal },

    /// Shares exist with no free value behind them, or the reverse.
    #[error("pool cannot price shares: {free_value} free value over {total_shares} shares")]
    SharePriceUndefined { free_value: Decimal, total_shares: Decimal },

    #[error("unknown request {0}")]
    UnknownRequest(RequestId),

    /// A debit larger than the pool's value reached the accounting layer.
    #[error("pool holds {available}, cannot release {requested}")]
    PoolInsolvent { requested: Decimal, available: Decimal },

    #[error(transparent)]
    Ledger(#[from] anyhow::Error),
}

impl SettlementError {
    /// Whether table rules refused the call, as opposed to a failing ledger
    /// or an exhausted pool that leaves a request pending for a retry.
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Ledger(_) | Self::PoolInsolvent { .. })
    }
}

pub type SettlementResult<T> = std::result::Result<T, SettlementError>;
