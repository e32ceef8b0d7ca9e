//! Settlement Engine - Bet Requests, Outcomes and Refunds
//!
//! Owns the table state (pool, fee ledger, request records) behind one
//! async mutex. Every mutating operation holds that mutex across its
//! ledger calls and follows the same shape:
//!
//! 1. Validate and compute against the locked state
//! 2. Move funds through the `AssetLedger`
//! 3. Commit the state change and emit a `SettlementEvent`
//!
//! A ledger failure in step 2 leaves the state exactly as it was.
//! Liquidity and treasury operations live in sibling modules as further
//! `impl` blocks on the same engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, MAX_REDEEM_TIMELOCK_SECONDS};
use crate::domain::bet::{Bet, Outcome};
use crate::domain::betting::BetEngine;
use crate::domain::error::{SettlementError, SettlementResult};
use crate::domain::event::SettlementEvent;
use crate::domain::fees::FeeLedger;
use crate::domain::identity::{Identity, RequestId};
use crate::domain::pool::LiquidityPool;
use crate::domain::request::{BetRequest, Resolution};
use crate::ports::clock::Clock;
use crate::ports::ledger::AssetLedger;
use crate::ports::oracle::RandomnessOracle;
use crate::ports::repository::{PositionSnapshot, TableSnapshot};

use super::gateway::RandomnessGateway;

/// Snapshot format version.
const SNAPSHOT_VERSION: &str = "1";

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 1024;

/// Static table policy.
#[derive(Debug, Clone)]
pub struct TableSettings {
  pub bets: BetEngine,
  /// Initial fee rate; changed later through `set_bet_fee`.
  pub bet_fee: Decimal,
  pub timelock: Duration,
  pub admin: Identity,
  pub oracle: Identity,
}

impl TableSettings {
  pub fn from_config(config: &AppConfig) -> Self {
    let table = &config.table;
    let secs = table.redeem_timelock_seconds.min(MAX_REDEEM_TIMELOCK_SECONDS);
    let secs = i64::try_from(secs).unwrap_or_default();
    Self {
      bets: BetEngine::new(
        table.fixed_max_bet,
        table.max_bet_divisor,
        table.max_bets_per_request,
      ),
      bet_fee: table.bet_fee,
      timelock: Duration::seconds(secs),
      admin: Identity::new(config.identities.admin.as_str()),
      oracle: Identity::new(config.identities.oracle.as_str()),
    }
  }
}

/// Everything guarded by the table lock.
#[derive(Debug, Default)]
pub(crate) struct TableState {
  pub(crate) pool: LiquidityPool,
  pub(crate) fees: FeeLedger,
  pub(crate) requests: BTreeMap<RequestId, BetRequest>,
  pub(crate) last_request_id: Option<RequestId>,
}

/// Pooled-liquidity roulette table.
pub struct SettlementEngine<L: AssetLedger, O: RandomnessOracle, C: Clock> {
  pub(crate) bets: BetEngine,
  pub(crate) timelock: Duration,
  pub(crate) admin: Identity,
  pub(crate) gateway: RandomnessGateway<O>,
  pub(crate) ledger: Arc<L>,
  pub(crate) clock: Arc<C>,
  state: Mutex<TableState>,
  events: broadcast::Sender<SettlementEvent>,
}

impl<L: AssetLedger, O: RandomnessOracle, C: Clock> SettlementEngine<L, O, C> {
  /// Build an empty table.
  ///
  /// # Errors
  /// `InvalidFeeRate` if the initial fee is outside [0, 1).
  pub fn new(
    settings: TableSettings,
    ledger: Arc<L>,
    oracle: Arc<O>,
    clock: Arc<C>,
  ) -> SettlementResult<Self> {
    let fees = FeeLedger::new(settings.bet_fee)?;
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    info!(
      admin = %settings.admin,
      oracle = %settings.oracle,
      fee_rate = %settings.bet_fee,
      timelock_secs = settings.timelock.num_seconds(),
      "Settlement engine initialized"
    );

    Ok(Self {
      bets: settings.bets,
      timelock: settings.timelock,
      admin: settings.admin,
      gateway: RandomnessGateway::new(oracle, settings.oracle),
      ledger,
      clock,
      state: Mutex::new(TableState {
        fees,
        ..TableState::default()
      }),
      events,
    })
  }

  pub(crate) async fn lock(&self) -> MutexGuard<'_, TableState> {
    self.state.lock().await
  }

  pub(crate) fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  pub(crate) fn emit(&self, event: SettlementEvent) {
    debug!(event = event.name(), "Settlement event");
    // No subscribers is fine.
    let _ = self.events.send(event);
  }

  pub(crate) fn ensure_admin(&self, caller: &Identity, action: &'static str) -> SettlementResult<()> {
    if caller == &self.admin {
      Ok(())
    } else {
      warn!(caller = %caller, action, "Rejected admin action");
      Err(SettlementError::Unauthorized {
        caller: caller.clone(),
        action,
      })
    }
  }

  pub(crate) async fn ensure_balance(&self, owner: &Identity, required: Decimal) -> SettlementResult<()> {
    let available = self.ledger.balance_of(owner).await?;
    if available < required {
      return Err(SettlementError::InsufficientBalance {
        owner: owner.clone(),
        required,
        available,
      });
    }
    Ok(())
  }

  /// Place a list of bets as one request.
  ///
  /// The stake is debited from `owner`, the fee is booked, and the rest
  /// joins the pool. The oracle is asked for an outcome once the request
  /// is committed; if that request is lost the bet stays pending and can
  /// be redeemed after the timelock.
  ///
  /// # Errors
  /// - `InvalidBet` for a malformed list
  /// - `BetTooLarge` if any bet exceeds the current max bet
  /// - `InsufficientLiquidity` if free pool value could not cover the best
  ///   outcome or the refund reserve
  /// - `InsufficientBalance` if `owner` cannot fund the stake
  pub async fn submit(&self, owner: &Identity, bets: Vec<Bet>) -> SettlementResult<RequestId> {
    self.bets.validate(&bets)?;

    let mut state = self.lock().await;
    self.bets.enforce_max_bet(&bets, state.pool.total_value())?;
    let stake = BetEngine::total_stake(&bets)?;
    let worst_case = BetEngine::worst_case_payout(&bets)?;

    // Pending stakes of other requests are reserved; only free value counts.
    let available = state.pool.free_value() + stake - state.fees.fee_for(stake);
    let required = worst_case.max(stake);
    if required > available {
      return Err(SettlementError::InsufficientLiquidity {
        worst_case: required,
        available,
      });
    }

    self.ensure_balance(owner, stake).await?;
    self.ledger.debit(owner, stake).await?;

    let id = state.last_request_id.map_or(RequestId::new(1), RequestId::next);
    let fee = state.fees.accrue(stake);
    state.pool.place_stake(stake, stake - fee)?;
    let now = self.now();
    let bet_count = bets.len();
    state
      .requests
      .insert(id, BetRequest::new(id, owner.clone(), bets, stake, fee, now));
    state.last_request_id = Some(id);
    let total_liquidity = state.pool.total_value();
    drop(state);

    info!(
      request_id = %id,
      owner = %owner,
      stake = %stake,
      fee = %fee,
      bet_count,
      "Bet request placed"
    );
    self.emit(SettlementEvent::BetPlaced {
      request_id: id,
      owner: owner.clone(),
      stake,
      fee,
      bet_count,
      total_liquidity,
      at: now,
    });

    if !self.gateway.request(id).await {
      self.emit(SettlementEvent::OracleRequestFailed {
        request_id: id,
        at: self.now(),
      });
    }
    Ok(id)
  }

  /// Deliver an outcome for a pending request.
  ///
  /// A repeated delivery for a completed request returns the recorded
  /// resolution without paying again.
  ///
  /// # Errors
  /// - `Unauthorized` unless `caller` is the oracle
  /// - `InvalidOutcome` for a number above 36
  /// - `UnknownRequest` for an id never issued
  /// - `PoolInsolvent` if free value plus this request's reserve cannot
  ///   cover the payout; the request stays pending and redeemable
  pub async fn fulfill(
    &self,
    caller: &Identity,
    request_id: RequestId,
    outcome: u8,
  ) -> SettlementResult<Resolution> {
    self.gateway.authorize(caller)?;
    let outcome = Outcome::new(outcome)?;

    let mut state = self.lock().await;
    let request = state
      .requests
      .get(&request_id)
      .ok_or(SettlementError::UnknownRequest(request_id))?;

    if let Some(resolution) = request.resolution() {
      debug!(request_id = %request_id, "Outcome for completed request ignored");
      return Ok(resolution.clone());
    }

    let owner = request.owner.clone();
    let stake = request.total_stake;
    let payout = BetEngine::resolve(&request.bets, outcome)?;
    state.pool.ensure_settleable(stake, payout)?;

    if payout > Decimal::ZERO {
      self.ledger.credit(&owner, payout).await?;
    }

    let now = self.now();
    state.pool.settle_stake(stake, payout)?;
    // A kept stake with no providers left belongs to the house.
    state.pool.adopt_unowned(&self.admin);
    let resolution = Resolution::Fulfilled { outcome, payout };
    if let Some(request) = state.requests.get_mut(&request_id) {
      request.complete(resolution.clone(), now)?;
    }
    let total_liquidity = state.pool.total_value();
    drop(state);

    info!(
      request_id = %request_id,
      owner = %owner,
      outcome = %outcome,
      stake = %stake,
      payout = %payout,
      "Bet request fulfilled"
    );
    self.emit(SettlementEvent::BetFulfilled {
      request_id,
      owner,
      outcome,
      stake,
      payout,
      total_liquidity,
      at: now,
    });

    Ok(resolution)
  }

  /// Refund a request whose outcome never arrived.
  ///
  /// Anyone may call this; the full stake goes back to the request's
  /// owner. The fee booked at submission stays with the house.
  ///
  /// # Errors
  /// - `UnknownRequest` for an id never issued
  /// - `AlreadyCompleted` if the request was already resolved
  /// - `NotElapsed` before the timelock runs out
  pub async fn redeem(&self, request_id: RequestId) -> SettlementResult<Decimal> {
    let mut state = self.lock().await;
    let now = self.now();
    let request = state
      .requests
      .get(&request_id)
      .ok_or(SettlementError::UnknownRequest(request_id))?;
    request.ensure_redeemable(now, self.timelock)?;

    let owner = request.owner.clone();
    let amount = request.total_stake;
    state.pool.ensure_settleable(amount, amount)?;

    self.ledger.credit(&owner, amount).await?;

    state.pool.settle_stake(amount, amount)?;
    if let Some(request) = state.requests.get_mut(&request_id) {
      request.complete(Resolution::Refunded { amount }, now)?;
    }
    let total_liquidity = state.pool.total_value();
    drop(state);

    info!(
      request_id = %request_id,
      owner = %owner,
      amount = %amount,
      "Bet request refunded"
    );
    self.emit(SettlementEvent::BetRefunded {
      request_id,
      owner,
      amount,
      total_liquidity,
      at: now,
    });

    Ok(amount)
  }

  // Queries

  pub async fn total_liquidity(&self) -> Decimal {
    self.lock().await.pool.total_value()
  }

  pub async fn total_shares(&self) -> Decimal {
    self.lock().await.pool.total_shares()
  }

  /// Largest single bet accepted right now.
  pub async fn max_bet(&self) -> Decimal {
    let liquidity = self.total_liquidity().await;
    self.bets.max_bet(liquidity)
  }

  pub async fn bet_fee(&self) -> Decimal {
    self.lock().await.fees.rate()
  }

  pub async fn collected_fees(&self) -> Decimal {
    self.lock().await.fees.accrued()
  }

  pub async fn last_request_id(&self) -> Option<RequestId> {
    self.lock().await.last_request_id
  }

  pub async fn request(&self, request_id: RequestId) -> Option<BetRequest> {
    self.lock().await.requests.get(&request_id).cloned()
  }

  /// `(shares, value)` held by `owner`, if any.
  pub async fn position(&self, owner: &Identity) -> Option<(Decimal, Decimal)> {
    let state = self.lock().await;
    let shares = state.pool.shares_of(owner);
    (shares > Decimal::ZERO).then(|| (shares, state.pool.position_value(owner)))
  }

  pub async fn pending_requests(&self) -> Vec<RequestId> {
    let state = self.lock().await;
    state
      .requests
      .values()
      .filter(|r| r.is_pending())
      .map(|r| r.id)
      .collect()
  }

  /// Pending requests whose timelock has run out.
  pub async fn expired_requests(&self) -> Vec<RequestId> {
    let now = self.now();
    let state = self.lock().await;
    state
      .requests
      .values()
      .filter(|r| {
        r.is_pending() && r.redeemable_at(self.timelock).is_some_and(|at| at <= now)
      })
      .map(|r| r.id)
      .collect()
  }

  /// Point-in-time view of the whole table.
  pub async fn snapshot(&self) -> TableSnapshot {
    let state = self.lock().await;
    let positions = state
      .pool
      .positions()
      .map(|(owner, shares)| PositionSnapshot {
        owner: owner.clone(),
        shares,
        value: state.pool.value_of_shares(shares),
      })
      .collect();

    TableSnapshot {
      version: SNAPSHOT_VERSION.to_string(),
      taken_at: self.now(),
      total_liquidity: state.pool.total_value(),
      total_shares: state.pool.total_shares(),
      reserved_liquidity: state.pool.reserved(),
      positions,
      fee_rate: state.fees.rate(),
      collected_fees: state.fees.accrued(),
      last_request_id: state.last_request_id,
      pending_requests: state.requests.values().filter(|r| r.is_pending()).count(),
    }
  }

  /// Receive every event committed from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
    self.events.subscribe()
  }

  pub fn admin(&self) -> &Identity {
    &self.admin
  }

  pub fn oracle(&self) -> &Identity {
    self.gateway.oracle_identity()
  }

  pub fn timelock(&self) -> Duration {
    self.timelock
  }

  pub async fn oracle_healthy(&self) -> bool {
    self.gateway.is_healthy().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::clock::ManualClock;
  use crate::adapters::ledger::InMemoryLedger;
  use crate::adapters::oracle::ChannelOracle;
  use rust_decimal_macros::dec;

  type Engine = SettlementEngine<InMemoryLedger, ChannelOracle, ManualClock>;

  fn settings() -> TableSettings {
    TableSettings {
      bets: BetEngine::default(),
      bet_fee: dec!(0),
      timelock: Duration::hours(2),
      admin: Identity::new("house"),
      oracle: Identity::new("vrf"),
    }
  }

  async fn table(liquidity: Decimal) -> (Engine, Arc<InMemoryLedger>, Arc<ManualClock>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let (oracle, _rx) = ChannelOracle::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = Engine::new(settings(), ledger.clone(), Arc::new(oracle), clock.clone()).unwrap();
    let lp = Identity::new("lp");
    ledger.mint(&lp, liquidity).await.unwrap();
    engine.add_liquidity(&lp, liquidity).await.unwrap();
    (engine, ledger, clock)
  }

  #[tokio::test]
  async fn test_submit_assigns_increasing_ids() {
    let (engine, ledger, _) = table(dec!(1000)).await;
    let player = Identity::new("player");
    ledger.mint(&player, dec!(10)).await.unwrap();

    assert_eq!(engine.last_request_id().await, None);
    let first = engine.submit(&player, vec![Bet::number(1, dec!(1))]).await.unwrap();
    let second = engine.submit(&player, vec![Bet::number(2, dec!(1))]).await.unwrap();
    assert!(second > first);
    assert_eq!(engine.last_request_id().await, Some(second));
    assert_eq!(engine.pending_requests().await, vec![first, second]);
  }

  #[tokio::test]
  async fn test_rejected_submit_changes_nothing() {
    let (engine, ledger, _) = table(dec!(1000)).await;
    let player = Identity::new("player");
    ledger.mint(&player, dec!(100)).await.unwrap();

    let err = engine
      .submit(&player, vec![Bet::number(1, dec!(11))])
      .await
      .unwrap_err();
    assert!(matches!(err, SettlementError::BetTooLarge { .. }));
    assert_eq!(engine.total_liquidity().await, dec!(1000));
    assert_eq!(ledger.balance_of(&player).await.unwrap(), dec!(100));
    assert_eq!(engine.last_request_id().await, None);
  }

  #[tokio::test]
  async fn test_unfunded_player_is_rejected() {
    let (engine, _, _) = table(dec!(1000)).await;
    let err = engine
      .submit(&Identity::new("broke"), vec![Bet::number(1, dec!(1))])
      .await
      .unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientBalance { .. }));
  }

  #[tokio::test]
  async fn test_fulfill_requires_oracle_and_known_request() {
    let (engine, ledger, _) = table(dec!(1000)).await;
    let player = Identity::new("player");
    ledger.mint(&player, dec!(1)).await.unwrap();
    let id = engine.submit(&player, vec![Bet::number(14, dec!(1))]).await.unwrap();

    assert!(matches!(
      engine.fulfill(&player, id, 14).await,
      Err(SettlementError::Unauthorized { .. })
    ));
    assert!(matches!(
      engine.fulfill(&Identity::new("vrf"), RequestId::new(99), 14).await,
      Err(SettlementError::UnknownRequest(_))
    ));
    assert!(matches!(
      engine.fulfill(&Identity::new("vrf"), id, 37).await,
      Err(SettlementError::InvalidOutcome(37))
    ));
  }

  #[tokio::test]
  async fn test_duplicate_fulfill_pays_once() {
    let (engine, ledger, _) = table(dec!(1000)).await;
    let player = Identity::new("player");
    let oracle = Identity::new("vrf");
    ledger.mint(&player, dec!(1)).await.unwrap();
    let id = engine.submit(&player, vec![Bet::number(14, dec!(1))]).await.unwrap();

    let first = engine.fulfill(&oracle, id, 14).await.unwrap();
    let second = engine.fulfill(&oracle, id, 3).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(ledger.balance_of(&player).await.unwrap(), dec!(36));
    assert_eq!(engine.total_liquidity().await, dec!(965));
  }

  #[tokio::test]
  async fn test_expired_requests_follow_clock() {
    let (engine, ledger, clock) = table(dec!(1000)).await;
    let player = Identity::new("player");
    ledger.mint(&player, dec!(1)).await.unwrap();
    let id = engine.submit(&player, vec![Bet::number(0, dec!(1))]).await.unwrap();

    assert!(engine.expired_requests().await.is_empty());
    clock.advance(Duration::hours(2));
    assert_eq!(engine.expired_requests().await, vec![id]);
  }

  #[tokio::test]
  async fn test_events_follow_commits() {
    let (engine, ledger, _) = table(dec!(1000)).await;
    let mut events = engine.subscribe();
    let player = Identity::new("player");
    ledger.mint(&player, dec!(1)).await.unwrap();
    let id = engine.submit(&player, vec![Bet::number(0, dec!(1))]).await.unwrap();

    match events.recv().await.unwrap() {
      SettlementEvent::BetPlaced {
        request_id,
        total_liquidity,
        ..
      } => {
        assert_eq!(request_id, id);
        assert_eq!(total_liquidity, dec!(1001));
      }
      other => panic!("unexpected event {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_snapshot_reports_table() {
    let (engine, _, _) = table(dec!(500)).await;
    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.total_liquidity, dec!(500));
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].value, dec!(500));
    assert_eq!(snapshot.pending_requests, 0);
    assert_eq!(snapshot.reserved_liquidity, dec!(0));
  }

  #[tokio::test]
  async fn test_pending_stake_is_reserved_until_settled() {
    let (engine, ledger, _) = table(dec!(1000)).await;
    let player = Identity::new("player");
    ledger.mint(&player, dec!(4)).await.unwrap();
    let id = engine.submit(&player, vec![Bet::number(0, dec!(4))]).await.unwrap();

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.total_liquidity, dec!(1004));
    assert_eq!(snapshot.reserved_liquidity, dec!(4));
    assert_eq!(snapshot.positions[0].value, dec!(1000));

    engine.fulfill(&Identity::new("vrf"), id, 9).await.unwrap();
    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.reserved_liquidity, dec!(0));
    assert_eq!(snapshot.positions[0].value, dec!(1004));
  }
}
