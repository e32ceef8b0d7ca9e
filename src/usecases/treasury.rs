//! Treasury - House Fee Administration
//!
//! The administrator sets the fee rate and sweeps accrued fees. Rate
//! changes apply to requests submitted afterwards only.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::error::SettlementResult;
use crate::domain::event::SettlementEvent;
use crate::domain::identity::Identity;
use crate::ports::clock::Clock;
use crate::ports::ledger::AssetLedger;
use crate::ports::oracle::RandomnessOracle;

use super::settlement::SettlementEngine;

impl<L: AssetLedger, O: RandomnessOracle, C: Clock> SettlementEngine<L, O, C> {
  /// # Errors
  /// - `Unauthorized` unless `caller` is the administrator
  /// - `InvalidFeeRate` if `rate` is outside [0, 1)
  pub async fn set_bet_fee(&self, caller: &Identity, rate: Decimal) -> SettlementResult<()> {
    self.ensure_admin(caller, "set the bet fee")?;

    let mut state = self.lock().await;
    let previous = state.fees.rate();
    state.fees.set_rate(rate)?;
    drop(state);

    let at = self.now();
    info!(previous = %previous, rate = %rate, "Bet fee changed");
    self.emit(SettlementEvent::FeeRateChanged { rate, at });
    Ok(())
  }

  /// Pay all accrued fees to the administrator.
  ///
  /// Returns the amount paid; zero, with no transfer, when nothing has
  /// accrued.
  ///
  /// # Errors
  /// `Unauthorized` unless `caller` is the administrator.
  pub async fn withdraw_fees(&self, caller: &Identity) -> SettlementResult<Decimal> {
    self.ensure_admin(caller, "withdraw fees")?;

    let mut state = self.lock().await;
    let amount = state.fees.accrued();
    if amount.is_zero() {
      debug!("No fees to withdraw");
      return Ok(Decimal::ZERO);
    }

    self.ledger.credit(caller, amount).await?;
    state.fees.take();
    drop(state);

    let at = self.now();
    info!(recipient = %caller, amount = %amount, "Fees withdrawn");
    self.emit(SettlementEvent::FeesWithdrawn {
      recipient: caller.clone(),
      amount,
      at,
    });
    Ok(amount)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::{Duration, Utc};
  use rust_decimal_macros::dec;

  use crate::adapters::clock::ManualClock;
  use crate::adapters::ledger::InMemoryLedger;
  use crate::adapters::oracle::ChannelOracle;
  use crate::domain::bet::Bet;
  use crate::domain::betting::BetEngine;
  use crate::domain::error::SettlementError;
  use crate::usecases::settlement::TableSettings;

  use super::*;

  #[tokio::test]
  async fn test_fee_lifecycle() {
    let ledger = Arc::new(InMemoryLedger::new());
    let (oracle, _rx) = ChannelOracle::new();
    let settings = TableSettings {
      bets: BetEngine::default(),
      bet_fee: dec!(0),
      timelock: Duration::hours(2),
      admin: Identity::new("house"),
      oracle: Identity::new("vrf"),
    };
    let engine = SettlementEngine::new(
      settings,
      ledger.clone(),
      Arc::new(oracle),
      Arc::new(ManualClock::new(Utc::now())),
    )
    .unwrap();
    let house = Identity::new("house");
    let player = Identity::new("player");
    let lp = Identity::new("lp");
    ledger.mint(&lp, dec!(1000)).await.unwrap();
    ledger.mint(&player, dec!(10)).await.unwrap();
    engine.add_liquidity(&lp, dec!(1000)).await.unwrap();

    assert!(matches!(
      engine.set_bet_fee(&player, dec!(0.1)).await,
      Err(SettlementError::Unauthorized { .. })
    ));
    assert!(matches!(
      engine.set_bet_fee(&house, dec!(1)).await,
      Err(SettlementError::InvalidFeeRate(_))
    ));
    assert_eq!(engine.withdraw_fees(&house).await.unwrap(), dec!(0));

    engine.set_bet_fee(&house, dec!(0.1)).await.unwrap();
    engine.submit(&player, vec![Bet::number(5, dec!(2))]).await.unwrap();
    assert_eq!(engine.collected_fees().await, dec!(0.2));
    assert_eq!(engine.total_liquidity().await, dec!(1001.8));

    assert_eq!(engine.withdraw_fees(&house).await.unwrap(), dec!(0.2));
    assert_eq!(engine.collected_fees().await, dec!(0));
    assert_eq!(ledger.balance_of(&house).await.unwrap(), dec!(0.2));
  }
}
