//! Bet engine: validation, stake, max-bet policy and payout resolution.
//!
//! The max bet tracks pool size: `min(fixed_max_bet, floor(liquidity / divisor))`.
//! With the default divisor of 100 no single bet may exceed 1% of the pool.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::bet::{Bet, Outcome};
use super::error::{SettlementError, SettlementResult};

/// Stateless bet validator and payout calculator.
#[derive(Debug, Clone)]
pub struct BetEngine {
    /// Absolute ceiling for any single bet.
    fixed_max_bet: Decimal,
    /// Liquidity divisor for the pool-relative ceiling.
    max_bet_divisor: Decimal,
    /// Upper bound on bets in one request.
    max_bets_per_request: usize,
}

impl BetEngine {
    pub fn new(fixed_max_bet: Decimal, max_bet_divisor: Decimal, max_bets_per_request: usize) -> Self {
        Self {
            fixed_max_bet,
            max_bet_divisor,
            max_bets_per_request,
        }
    }

    /// Checks every bet's value domain and amount, and the list shape.
    ///
    /// # Errors
    /// `InvalidBet` naming the first offending bet.
    pub fn validate(&self, bets: &[Bet]) -> SettlementResult<()> {
        if bets.is_empty() {
            return Err(SettlementError::InvalidBet("bet list is empty".into()));
        }
        if bets.len() > self.max_bets_per_request {
            return Err(SettlementError::InvalidBet(format!(
                "{} bets exceed the limit of {} per request",
                bets.len(),
                self.max_bets_per_request
            )));
        }
        for bet in bets {
            bet.selection()?;
        }
        Ok(())
    }

    /// Sum of all bet amounts.
    ///
    /// # Errors
    /// `InvalidBet` if the sum overflows.
    pub fn total_stake(bets: &[Bet]) -> SettlementResult<Decimal> {
        bets.iter().try_fold(Decimal::ZERO, |acc, bet| {
            acc.checked_add(bet.amount)
                .ok_or_else(|| SettlementError::InvalidBet("total stake overflows".into()))
        })
    }

    /// Largest single bet accepted against a pool holding `liquidity`.
    pub fn max_bet(&self, liquidity: Decimal) -> Decimal {
        if self.max_bet_divisor <= Decimal::ZERO || liquidity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (liquidity / self.max_bet_divisor)
            .floor()
            .min(self.fixed_max_bet)
    }

    /// Rejects the whole list if any bet exceeds `max_bet(liquidity)`.
    pub fn enforce_max_bet(&self, bets: &[Bet], liquidity: Decimal) -> SettlementResult<()> {
        let max_bet = self.max_bet(liquidity);
        match bets.iter().find(|b| b.amount > max_bet) {
            Some(bet) => Err(SettlementError::BetTooLarge {
                amount: bet.amount,
                max_bet,
            }),
            None => Ok(()),
        }
    }

    /// Total gross payout of `bets` for a resolved `outcome`.
    ///
    /// # Errors
    /// `InvalidBet` if a bet was never validated and is malformed.
    pub fn resolve(bets: &[Bet], outcome: Outcome) -> SettlementResult<Decimal> {
        bets.iter().try_fold(Decimal::ZERO, |acc, bet| {
            acc.checked_add(bet.payout(outcome)?)
                .ok_or_else(|| SettlementError::InvalidBet("total payout overflows".into()))
        })
    }

    /// Largest payout the bets can produce over every wheel position.
    pub fn worst_case_payout(bets: &[Bet]) -> SettlementResult<Decimal> {
        Outcome::all().try_fold(Decimal::ZERO, |worst, outcome| {
            Ok(worst.max(Self::resolve(bets, outcome)?))
        })
    }

    pub fn fixed_max_bet(&self) -> Decimal {
        self.fixed_max_bet
    }
}

impl Default for BetEngine {
    /// 100-unit ceiling, 1% of liquidity, ten bets per request.
    fn default() -> Self {
        Self::new(dec!(100), dec!(100), 10)
    }
}
