//! Liquidity pool share accounting.
//!
//! Providers hold shares; the pool holds value. Settlement and capital
//! events move value without touching shares, so every provider's claim
//! drifts proportionally with the share price. Mint and burn both round
//! toward zero, which always leaves any residue in the pool.
//!
//! Stakes of pending requests stay reserved until the request completes.
//! Reserved value backs the refund path and is excluded from the share
//! price, so providers only ever own `total_value - reserved`.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{SettlementError, SettlementResult};
use super::identity::Identity;

/// Decimal places kept on minted share balances.
pub const SHARE_SCALE: u32 = 12;

/// Decimal places kept on amounts paid out of the pool.
pub const AMOUNT_SCALE: u32 = 8;

/// Pooled capital and per-owner share positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    total_value: Decimal,
    total_shares: Decimal,
    /// Sum of stakes held for pending requests.
    #[serde(default)]
    reserved: Decimal,
    positions: BTreeMap<Identity, Decimal>,
}

impl LiquidityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value owned by shareholders: everything not reserved for pending stakes.
    pub fn free_value(&self) -> Decimal {
        (self.total_value - self.reserved).max(Decimal::ZERO)
    }

    /// Shares `amount` would mint at the current share price.
    ///
    /// Bootstraps 1:1 when the pool is empty.
    ///
    /// # Errors
    /// `SharePriceUndefined` when shares exist with no value behind them, or
    /// value exists with no shares; minting then would dilute or gift value.
    pub fn shares_for_deposit(&self, amount: Decimal) -> SettlementResult<Decimal> {
        let free = self.free_value();
        match (self.total_shares.is_zero(), free.is_zero()) {
            (true, true) => Ok(amount),
            (false, false) => Ok((amount * self.total_shares / free)
                .round_dp_with_strategy(SHARE_SCALE, RoundingStrategy::ToZero)),
            _ => Err(SettlementError::SharePriceUndefined {
                free_value: free,
                total_shares: self.total_shares,
            }),
        }
    }

    /// Value redeemable for `shares` at the current share price.
    pub fn value_of_shares(&self, shares: Decimal) -> Decimal {
        if self.total_shares.is_zero() {
            return Decimal::ZERO;
        }
        let free = self.free_value();
        if shares == self.total_shares {
            return free;
        }
        (shares * free / self.total_shares)
            .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
    }

    /// Credits `owner` with shares for a deposit of `amount`.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is not positive
    /// - `SharePriceUndefined` if the pool cannot price a deposit
    pub fn add_liquidity(&mut self, owner: &Identity, amount: Decimal) -> SettlementResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(amount));
        }
        let shares = self.shares_for_deposit(amount)?;
        self.total_value += amount;
        self.total_shares += shares;
        *self.positions.entry(owner.clone()).or_default() += shares;

        debug!(
            owner = %owner,
            amount = %amount,
            shares = %shares,
            total_value = %self.total_value,
            "Liquidity added"
        );
        Ok(shares)
    }

    /// Burns all of `owner`'s shares and returns `(shares, payout)`.
    ///
    /// # Errors
    /// `NoPosition` if the owner holds no shares.
    pub fn remove_liquidity(&mut self, owner: &Identity) -> SettlementResult<(Decimal, Decimal)> {
        let shares = self.shares_of(owner);
        if shares <= Decimal::ZERO {
            return Err(SettlementError::NoPosition(owner.clone()));
        }
        let payout = self.value_of_shares(shares);
        self.total_value -= payout;
        self.total_shares -= shares;
        self.positions.remove(owner);

        debug!(
            owner = %owner,
            shares = %shares,
            payout = %payout,
            total_value = %self.total_value,
            "Liquidity removed"
        );
        Ok((shares, payout))
    }

    /// Books unowned free value to `house` as a 1:1 position.
    ///
    /// Value without shares appears when capital arrives at an empty pool
    /// or a pending stake is kept after every provider left. Returns the
    /// shares minted, zero when there was nothing to adopt.
    pub fn adopt_unowned(&mut self, house: &Identity) -> Decimal {
        let free = self.free_value();
        if !self.total_shares.is_zero() || free.is_zero() {
            return Decimal::ZERO;
        }
        self.total_shares = free;
        self.positions.insert(house.clone(), free);
        debug!(owner = %house, shares = %free, "Unowned value booked to house");
        free
    }

    /// Adds value without minting shares.
    pub fn credit(&mut self, amount: Decimal) {
        self.total_value += amount;
    }

    /// Checks that `amount` of free value can be released.
    pub fn ensure_available(&self, amount: Decimal) -> SettlementResult<()> {
        let free = self.free_value();
        if amount > free {
            return Err(SettlementError::PoolInsolvent {
                requested: amount,
                available: free,
            });
        }
        Ok(())
    }

    /// Releases free value without burning shares.
    ///
    /// # Errors
    /// `PoolInsolvent` if `amount` exceeds the free value; nothing is
    /// released in that case.
    pub fn debit(&mut self, amount: Decimal) -> SettlementResult<()> {
        self.ensure_available(amount)?;
        self.total_value -= amount;
        Ok(())
    }

    /// Accepts a stake: `net` joins the pool, the full `stake` is reserved.
    ///
    /// # Errors
    /// `PoolInsolvent` if free value cannot cover the part of the reserve
    /// the net amount does not bring in.
    pub fn place_stake(&mut self, stake: Decimal, net: Decimal) -> SettlementResult<()> {
        let shortfall = stake - net;
        self.ensure_available(shortfall)?;
        self.total_value += net;
        self.reserved += stake;
        Ok(())
    }

    /// Checks that a pending `stake` can be closed with `payout`.
    ///
    /// The stake's own reserve plus free value may be paid; other pending
    /// reserves are never touched.
    pub fn ensure_settleable(&self, stake: Decimal, payout: Decimal) -> SettlementResult<()> {
        let available = self.free_value() + stake.min(self.reserved);
        if payout > available {
            return Err(SettlementError::PoolInsolvent {
                requested: payout,
                available,
            });
        }
        Ok(())
    }

    /// Releases a pending `stake` and pays `payout` out of the pool.
    ///
    /// # Errors
    /// `PoolInsolvent` as for `ensure_settleable`; nothing changes then.
    pub fn settle_stake(&mut self, stake: Decimal, payout: Decimal) -> SettlementResult<()> {
        self.ensure_settleable(stake, payout)?;
        self.reserved -= stake.min(self.reserved);
        self.total_value -= payout;
        Ok(())
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub fn total_shares(&self) -> Decimal {
        self.total_shares
    }

    pub fn reserved(&self) -> Decimal {
        self.reserved
    }

    pub fn shares_of(&self, owner: &Identity) -> Decimal {
        self.positions.get(owner).copied().unwrap_or_default()
    }

    /// Current redeemable value of `owner`'s position.
    pub fn position_value(&self, owner: &Identity) -> Decimal {
        self.value_of_shares(self.shares_of(owner))
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Identity, Decimal)> {
        self.positions.iter().map(|(owner, shares)| (owner, *shares))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn id(name: &str) -> Identity {
        Identity::new(name)
    }

    #[test]
    fn test_bootstrap_mints_one_to_one() {
        let mut pool = LiquidityPool::new();
        let shares = pool.add_liquidity(&id("a"), dec!(30)).unwrap();
        assert_eq!(shares, dec!(30));
        assert_eq!(pool.total_value(), dec!(30));
        let (burned, payout) = pool.remove_liquidity(&id("a")).unwrap();
        assert_eq!((burned, payout), (dec!(30), dec!(30)));
        assert_eq!(pool.total_value(), dec!(0));
        assert_eq!(pool.total_shares(), dec!(0));
    }

    #[test]
    fn test_readding_extends_position() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(10)).unwrap();
        pool.add_liquidity(&id("a"), dec!(5)).unwrap();
        assert_eq!(pool.shares_of(&id("a")), dec!(15));
        assert_eq!(pool.positions().count(), 1);
    }

    #[test]
    fn test_gain_is_shared_proportionally() {
        let mut pool = LiquidityPool::new();
        for name in ["a", "b", "c"] {
            pool.add_liquidity(&id(name), dec!(50)).unwrap();
        }
        pool.credit(dec!(150));
        for name in ["a", "b", "c"] {
            assert_eq!(pool.remove_liquidity(&id(name)).unwrap().1, dec!(100));
        }
        assert_eq!(pool.total_value(), dec!(0));
    }

    #[test]
    fn test_dynamic_liquidity_scenario() {
        let mut pool = LiquidityPool::new();
        for name in ["a", "b", "c"] {
            pool.add_liquidity(&id(name), dec!(100)).unwrap();
        }
        pool.debit(dec!(12)).unwrap();
        assert_eq!(pool.total_value(), dec!(288));
        assert_eq!(pool.remove_liquidity(&id("a")).unwrap().1, dec!(96));
        pool.credit(dec!(100));
        assert_eq!(pool.total_value(), dec!(292));
        assert_eq!(pool.remove_liquidity(&id("b")).unwrap().1, dec!(146));
        assert_eq!(pool.remove_liquidity(&id("c")).unwrap().1, dec!(146));
    }

    #[test]
    fn test_late_depositor_pays_current_share_price() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(100)).unwrap();
        pool.credit(dec!(100));
        let shares = pool.add_liquidity(&id("b"), dec!(100)).unwrap();
        assert_eq!(shares, dec!(50));
        assert_eq!(pool.position_value(&id("b")), dec!(100));
    }

    #[test]
    fn test_rounding_favors_pool() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(1)).unwrap();
        pool.credit(dec!(2));
        pool.add_liquidity(&id("b"), dec!(1)).unwrap();
        let (_, payout) = pool.remove_liquidity(&id("b")).unwrap();
        assert!(payout <= dec!(1));
        assert!(pool.total_value() >= dec!(3));
    }

    #[test]
    fn test_remove_without_position_fails() {
        let mut pool = LiquidityPool::new();
        assert!(matches!(
            pool.remove_liquidity(&id("nobody")),
            Err(SettlementError::NoPosition(_))
        ));
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(10)).unwrap();
        assert!(matches!(
            pool.debit(dec!(11)),
            Err(SettlementError::PoolInsolvent { .. })
        ));
        assert_eq!(pool.total_value(), dec!(10));
    }

    #[test]
    fn test_non_positive_deposit_rejected() {
        let mut pool = LiquidityPool::new();
        assert!(pool.add_liquidity(&id("a"), dec!(0)).is_err());
        assert!(pool.add_liquidity(&id("a"), dec!(-5)).is_err());
        assert_eq!(pool.total_shares(), dec!(0));
    }

    #[test]
    fn test_capital_without_shares_goes_to_house() {
        let mut pool = LiquidityPool::new();
        pool.credit(dec!(1000));
        assert!(matches!(
            pool.add_liquidity(&id("lp"), dec!(1)),
            Err(SettlementError::SharePriceUndefined { .. })
        ));

        assert_eq!(pool.adopt_unowned(&id("house")), dec!(1000));
        assert_eq!(pool.adopt_unowned(&id("house")), dec!(0));
        pool.add_liquidity(&id("lp"), dec!(1)).unwrap();
        assert_eq!(pool.remove_liquidity(&id("lp")).unwrap().1, dec!(1));
        assert_eq!(pool.position_value(&id("house")), dec!(1000));
    }

    #[test]
    fn test_worthless_shares_block_deposits() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(10)).unwrap();
        pool.debit(dec!(10)).unwrap();
        assert!(pool.add_liquidity(&id("b"), dec!(5)).is_err());
        pool.credit(dec!(20));
        assert_eq!(pool.add_liquidity(&id("b"), dec!(20)).unwrap(), dec!(10));
    }

    #[test]
    fn test_reserved_stake_is_not_withdrawable() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(100)).unwrap();
        pool.place_stake(dec!(10), dec!(9.5)).unwrap();
        assert_eq!(pool.total_value(), dec!(109.5));
        assert_eq!(pool.reserved(), dec!(10));
        assert_eq!(pool.position_value(&id("a")), dec!(99.5));

        assert_eq!(pool.remove_liquidity(&id("a")).unwrap().1, dec!(99.5));
        assert_eq!(pool.total_value(), dec!(10));
        assert!(pool.debit(dec!(1)).is_err());

        pool.settle_stake(dec!(10), dec!(10)).unwrap();
        assert_eq!(pool.total_value(), dec!(0));
        assert_eq!(pool.reserved(), dec!(0));
    }

    #[test]
    fn test_settlement_never_spends_other_reserves() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(&id("a"), dec!(10)).unwrap();
        pool.place_stake(dec!(1), dec!(1)).unwrap();
        pool.place_stake(dec!(1), dec!(1)).unwrap();
        // A 36x win on one stake may only use free value plus its own reserve.
        assert!(matches!(
            pool.settle_stake(dec!(1), dec!(36)),
            Err(SettlementError::PoolInsolvent { available, .. }) if available == dec!(11)
        ));
        assert_eq!(pool.reserved(), dec!(2));
        pool.settle_stake(dec!(1), dec!(11)).unwrap();
        pool.settle_stake(dec!(1), dec!(1)).unwrap();
        assert_eq!(pool.total_value(), dec!(0));
    }

    #[test]
    fn test_stake_reserve_needs_free_value_for_fee() {
        let mut pool = LiquidityPool::new();
        assert!(pool.place_stake(dec!(10), dec!(9)).is_err());
        assert_eq!(pool.reserved(), dec!(0));
    }
}
