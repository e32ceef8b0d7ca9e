//! House fee accounting.
//!
//! Each accepted request pays `stake × rate` to the fee ledger; the rest of
//! the stake goes to the pool. Accrued fees sit outside the pool and never
//! affect share value. Accrual is exact decimal arithmetic, no truncation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{SettlementError, SettlementResult};

/// Fee rate plus fees accrued since the last withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLedger {
    /// Fraction of each stake kept as fee, in [0, 1).
    rate: Decimal,
    /// Collected and not yet withdrawn.
    accrued: Decimal,
}

impl FeeLedger {
    /// # Errors
    /// `InvalidFeeRate` if `rate` is outside [0, 1).
    pub fn new(rate: Decimal) -> SettlementResult<Self> {
        let mut ledger = Self::default();
        ledger.set_rate(rate)?;
        Ok(ledger)
    }

    /// Replaces the rate. Fees already accrued are untouched.
    ///
    /// # Errors
    /// `InvalidFeeRate` if `rate` is outside [0, 1).
    pub fn set_rate(&mut self, rate: Decimal) -> SettlementResult<()> {
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            return Err(SettlementError::InvalidFeeRate(rate));
        }
        self.rate = rate;
        Ok(())
    }

    /// Fee owed on `stake` at the current rate.
    pub fn fee_for(&self, stake: Decimal) -> Decimal {
        stake * self.rate
    }

    /// Books the fee for `stake` and returns it.
    pub fn accrue(&mut self, stake: Decimal) -> Decimal {
        let fee = self.fee_for(stake);
        self.accrued += fee;
        fee
    }

    /// Empties the ledger, returning what had accrued.
    pub fn take(&mut self) -> Decimal {
        std::mem::take(&mut self.accrued)
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn accrued(&self) -> Decimal {
        self.accrued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_bounds() {
        assert!(FeeLedger::new(dec!(0)).is_ok());
        assert!(FeeLedger::new(dec!(0.999)).is_ok());
        assert!(FeeLedger::new(dec!(1)).is_err());
        assert!(FeeLedger::new(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_accrual_is_exact() {
        let mut fees = FeeLedger::new(dec!(0.02)).unwrap();
        assert_eq!(fees.accrue(dec!(7)), dec!(0.14));
        assert_eq!(fees.accrue(dec!(7)), dec!(0.14));
        assert_eq!(fees.accrued(), dec!(0.28));
    }

    #[test]
    fn test_rate_change_is_not_retroactive() {
        let mut fees = FeeLedger::new(dec!(0.1)).unwrap();
        fees.accrue(dec!(10));
        fees.set_rate(dec!(0.5)).unwrap();
        assert_eq!(fees.accrued(), dec!(1));
        assert_eq!(fees.fee_for(dec!(10)), dec!(5));
    }

    #[test]
    fn test_take_resets() {
        let mut fees = FeeLedger::new(dec!(0.02)).unwrap();
        fees.accrue(dec!(2));
        assert_eq!(fees.take(), dec!(0.04));
        assert_eq!(fees.accrued(), dec!(0));
        assert_eq!(fees.take(), dec!(0));
    }
}
