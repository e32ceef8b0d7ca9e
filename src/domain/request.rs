//! Bet request lifecycle: `Pending → Completed`.
//!
//! A request is resolved exactly once, either by the oracle's outcome or
//! by a timelocked refund. Completed requests are never mutated again.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bet::{Bet, Outcome};
use super::error::{SettlementError, SettlementResult};
use super::identity::{Identity, RequestId};

/// How a request was completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The oracle delivered an outcome; `payout` went to the owner.
    Fulfilled { outcome: Outcome, payout: Decimal },
    /// The timelock lapsed and the stake was returned.
    Refunded { amount: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Completed {
        resolution: Resolution,
        completed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRequest {
    pub id: RequestId,
    pub owner: Identity,
    pub bets: Vec<Bet>,
    pub total_stake: Decimal,
    /// Fee booked at submission.
    pub fee: Decimal,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
}

impl BetRequest {
    pub fn new(
        id: RequestId,
        owner: Identity,
        bets: Vec<Bet>,
        total_stake: Decimal,
        fee: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            bets,
            total_stake,
            fee,
            state: RequestState::Pending,
            created_at,
        }
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Pending)
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.state {
            RequestState::Pending => None,
            RequestState::Completed { resolution, .. } => Some(resolution),
        }
    }

    /// Earliest instant at which the request may be redeemed, `None` if
    /// that lies beyond the representable calendar.
    pub fn redeemable_at(&self, timelock: Duration) -> Option<DateTime<Utc>> {
        self.created_at.checked_add_signed(timelock)
    }

    /// Checks that a refund is allowed at `now`.
    ///
    /// Completion is checked first: a settled request reports
    /// `AlreadyCompleted` whether or not its timelock has run.
    pub fn ensure_redeemable(&self, now: DateTime<Utc>, timelock: Duration) -> SettlementResult<()> {
        self.ensure_pending()?;
        match self.redeemable_at(timelock) {
            Some(at) if now >= at => Ok(()),
            _ => Err(SettlementError::NotElapsed { request_id: self.id }),
        }
    }

    pub fn ensure_pending(&self) -> SettlementResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(SettlementError::AlreadyCompleted { request_id: self.id })
        }
    }

    /// The single `Pending → Completed` transition.
    ///
    /// # Errors
    /// `AlreadyCompleted` if the request was resolved before.
    pub fn complete(&mut self, resolution: Resolution, at: DateTime<Utc>) -> SettlementResult<()> {
        self.ensure_pending()?;
        self.state = RequestState::Completed {
            resolution,
            completed_at: at,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending(created_at: DateTime<Utc>) -> BetRequest {
        BetRequest::new(
            RequestId::new(1),
            Identity::new("player"),
            vec![Bet::number(0, dec!(1))],
            dec!(1),
            dec!(0),
            created_at,
        )
    }

    #[test]
    fn test_complete_is_terminal() {
        let now = Utc::now();
        let mut request = pending(now);
        request
            .complete(Resolution::Refunded { amount: dec!(1) }, now)
            .unwrap();
        let second = request.complete(
            Resolution::Fulfilled {
                outcome: Outcome::ZERO,
                payout: dec!(36),
            },
            now,
        );
        assert!(matches!(second, Err(SettlementError::AlreadyCompleted { .. })));
        assert_eq!(
            request.resolution(),
            Some(&Resolution::Refunded { amount: dec!(1) })
        );
    }

    #[test]
    fn test_redeem_window() {
        let created = Utc::now();
        let request = pending(created);
        let timelock = Duration::hours(2);
        assert!(matches!(
            request.ensure_redeemable(created + Duration::hours(1), timelock),
            Err(SettlementError::NotElapsed { .. })
        ));
        assert!(request.ensure_redeemable(created + timelock, timelock).is_ok());
    }

    #[test]
    fn test_timelock_past_the_calendar_never_elapses() {
        let created = Utc::now();
        let request = pending(created);
        let timelock = Duration::days(100_000_000);
        assert_eq!(request.redeemable_at(timelock), None);
        assert!(matches!(
            request.ensure_redeemable(created + Duration::days(365), timelock),
            Err(SettlementError::NotElapsed { .. })
        ));
    }

    #[test]
    fn test_completed_request_reports_completion_before_timelock() {
        let created = Utc::now();
        let mut request = pending(created);
        request
            .complete(
                Resolution::Fulfilled {
                    outcome: Outcome::ZERO,
                    payout: dec!(36),
                },
                created,
            )
            .unwrap();
        assert!(matches!(
            request.ensure_redeemable(created, Duration::hours(2)),
            Err(SettlementError::AlreadyCompleted { .. })
        ));
    }

    #[test]
    fn test_state_serializes_tagged() {
        let request = pending(Utc::now());
        let json = serde_json::to_value(&request.state).unwrap();
        assert_eq!(json["state"], "pending");
    }
}
