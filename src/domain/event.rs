//! Settlement events.
//!
//! One event is emitted per committed transaction, after the table state
//! has changed. Each carries the pool value at that moment so consumers
//! (journal, metrics) never need to read table state back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bet::Outcome;
use super::identity::{Identity, RequestId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SettlementEvent {
    LiquidityAdded {
        owner: Identity,
        amount: Decimal,
        shares: Decimal,
        total_liquidity: Decimal,
        at: DateTime<Utc>,
    },
    LiquidityRemoved {
        owner: Identity,
        shares: Decimal,
        payout: Decimal,
        total_liquidity: Decimal,
        at: DateTime<Utc>,
    },
    /// Out-of-band change in pool value; `delta` is signed.
    CapitalAdjusted {
        delta: Decimal,
        total_liquidity: Decimal,
        at: DateTime<Utc>,
    },
    BetPlaced {
        request_id: RequestId,
        owner: Identity,
        stake: Decimal,
        fee: Decimal,
        bet_count: usize,
        total_liquidity: Decimal,
        at: DateTime<Utc>,
    },
    BetFulfilled {
        request_id: RequestId,
        owner: Identity,
        outcome: Outcome,
        stake: Decimal,
        payout: Decimal,
        total_liquidity: Decimal,
        at: DateTime<Utc>,
    },
    BetRefunded {
        request_id: RequestId,
        owner: Identity,
        amount: Decimal,
        total_liquidity: Decimal,
        at: DateTime<Utc>,
    },
    /// The outcome request never reached the oracle; the bet stays pending.
    OracleRequestFailed {
        request_id: RequestId,
        at: DateTime<Utc>,
    },
    FeeRateChanged {
        rate: Decimal,
        at: DateTime<Utc>,
    },
    FeesWithdrawn {
        recipient: Identity,
        amount: Decimal,
        at: DateTime<Utc>,
    },
}

impl SettlementEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LiquidityAdded { .. } => "liquidity_added",
            Self::LiquidityRemoved { .. } => "liquidity_removed",
            Self::CapitalAdjusted { .. } => "capital_adjusted",
            Self::BetPlaced { .. } => "bet_placed",
            Self::BetFulfilled { .. } => "bet_fulfilled",
            Self::BetRefunded { .. } => "bet_refunded",
            Self::OracleRequestFailed { .. } => "oracle_request_failed",
            Self::FeeRateChanged { .. } => "fee_rate_changed",
            Self::FeesWithdrawn { .. } => "fees_withdrawn",
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::LiquidityAdded { at, .. }
            | Self::LiquidityRemoved { at, .. }
            | Self::CapitalAdjusted { at, .. }
            | Self::BetPlaced { at, .. }
            | Self::BetFulfilled { at, .. }
            | Self::BetRefunded { at, .. }
            | Self::OracleRequestFailed { at, .. }
            | Self::FeeRateChanged { at, .. }
            | Self::FeesWithdrawn { at, .. } => *at,
        }
    }

    /// Pool value right after the event, if the event touched the pool.
    pub fn total_liquidity(&self) -> Option<Decimal> {
        match self {
            Self::LiquidityAdded { total_liquidity, .. }
            | Self::LiquidityRemoved { total_liquidity, .. }
            | Self::CapitalAdjusted { total_liquidity, .. }
            | Self::BetPlaced { total_liquidity, .. }
            | Self::BetFulfilled { total_liquidity, .. }
            | Self::BetRefunded { total_liquidity, .. } => Some(*total_liquidity),
            Self::OracleRequestFailed { .. }
            | Self::FeeRateChanged { .. }
            | Self::FeesWithdrawn { .. } => None,
        }
    }
}
