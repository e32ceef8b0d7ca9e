//! Liquidity Provision - Deposits, Withdrawals and Capital Events
//!
//! Providers buy pool shares at the current share price and sell all of
//! them back in one withdrawal. Capital events change pool value without
//! touching shares, spreading a gain or loss across every provider.

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::error::{SettlementError, SettlementResult};
use crate::domain::event::SettlementEvent;
use crate::domain::identity::Identity;
use crate::ports::clock::Clock;
use crate::ports::ledger::AssetLedger;
use crate::ports::oracle::RandomnessOracle;

use super::settlement::SettlementEngine;

impl<L: AssetLedger, O: RandomnessOracle, C: Clock> SettlementEngine<L, O, C> {
  /// Deposit `amount` from `owner` and mint shares for it.
  ///
  /// # Errors
  /// - `InvalidAmount` if `amount` is not positive
  /// - `InsufficientBalance` if `owner` cannot fund the deposit
  /// - `SharePriceUndefined` if outstanding shares have no value behind them
  pub async fn add_liquidity(&self, owner: &Identity, amount: Decimal) -> SettlementResult<Decimal> {
    if amount <= Decimal::ZERO {
      return Err(SettlementError::InvalidAmount(amount));
    }

    let mut state = self.lock().await;
    state.pool.shares_for_deposit(amount)?;
    self.ensure_balance(owner, amount).await?;
    self.ledger.debit(owner, amount).await?;

    let shares = state.pool.add_liquidity(owner, amount)?;
    let total_liquidity = state.pool.total_value();
    drop(state);

    let at = self.now();
    info!(
      owner = %owner,
      amount = %amount,
      shares = %shares,
      total_liquidity = %total_liquidity,
      "Liquidity added"
    );
    self.emit(SettlementEvent::LiquidityAdded {
      owner: owner.clone(),
      amount,
      shares,
      total_liquidity,
      at,
    });
    Ok(shares)
  }

  /// Burn every share `owner` holds and pay out their value.
  ///
  /// # Errors
  /// `NoPosition` if `owner` holds no shares.
  pub async fn remove_liquidity(&self, owner: &Identity) -> SettlementResult<Decimal> {
    let mut state = self.lock().await;
    let shares = state.pool.shares_of(owner);
    if shares <= Decimal::ZERO {
      return Err(SettlementError::NoPosition(owner.clone()));
    }
    let payout = state.pool.value_of_shares(shares);

    if payout > Decimal::ZERO {
      self.ledger.credit(owner, payout).await?;
    }

    let (shares, payout) = state.pool.remove_liquidity(owner)?;
    let total_liquidity = state.pool.total_value();
    drop(state);

    let at = self.now();
    info!(
      owner = %owner,
      shares = %shares,
      payout = %payout,
      total_liquidity = %total_liquidity,
      "Liquidity removed"
    );
    self.emit(SettlementEvent::LiquidityRemoved {
      owner: owner.clone(),
      shares,
      payout,
      total_liquidity,
      at,
    });
    Ok(payout)
  }

  /// Add house capital to the pool.
  ///
  /// With providers present the capital is a gain spread over their
  /// shares. Into a pool with no shares it opens a house position at 1:1.
  ///
  /// # Errors
  /// - `Unauthorized` unless `caller` is the administrator
  /// - `InvalidAmount` if `amount` is not positive
  pub async fn inject_capital(&self, caller: &Identity, amount: Decimal) -> SettlementResult<Decimal> {
    self.ensure_admin(caller, "inject capital")?;
    if amount <= Decimal::ZERO {
      return Err(SettlementError::InvalidAmount(amount));
    }

    let mut state = self.lock().await;
    state.pool.credit(amount);
    state.pool.adopt_unowned(&self.admin);
    let total_liquidity = state.pool.total_value();
    drop(state);

    self.capital_adjusted(amount, total_liquidity);
    Ok(total_liquidity)
  }

  /// Remove capital from the pool without burning shares.
  ///
  /// # Errors
  /// - `Unauthorized` unless `caller` is the administrator
  /// - `InvalidAmount` if `amount` is not positive
  /// - `PoolInsolvent` if `amount` exceeds the unreserved pool value
  pub async fn drain_capital(&self, caller: &Identity, amount: Decimal) -> SettlementResult<Decimal> {
    self.ensure_admin(caller, "drain capital")?;
    if amount <= Decimal::ZERO {
      return Err(SettlementError::InvalidAmount(amount));
    }

    let mut state = self.lock().await;
    state.pool.debit(amount)?;
    let total_liquidity = state.pool.total_value();
    drop(state);

    self.capital_adjusted(-amount, total_liquidity);
    Ok(total_liquidity)
  }

  fn capital_adjusted(&self, delta: Decimal, total_liquidity: Decimal) {
    info!(delta = %delta, total_liquidity = %total_liquidity, "Pool capital adjusted");
    self.emit(SettlementEvent::CapitalAdjusted {
      delta,
      total_liquidity,
      at: self.now(),
    });
  }
}
