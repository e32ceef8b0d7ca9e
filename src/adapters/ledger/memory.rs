//! In-memory Asset Ledger
//!
//! Keeps balances in a map behind an async `RwLock`. Used by the binary
//! for a self-contained table and by tests to fund actors via `mint`.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::identity::Identity;
use crate::ports::ledger::AssetLedger;

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<Identity, Decimal>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_positive(amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            bail!("transfer amount must be positive, got {amount}");
        }
        Ok(())
    }

    async fn withdraw(&self, owner: &Identity, amount: Decimal) -> Result<()> {
        Self::ensure_positive(amount)?;
        let mut balances = self.balances.write().await;
        let balance = balances.get(owner).copied().unwrap_or_default();
        if balance < amount {
            bail!("{owner} holds {balance}, needs {amount}");
        }
        balances.insert(owner.clone(), balance - amount);
        Ok(())
    }

    async fn deposit(&self, owner: &Identity, amount: Decimal) -> Result<()> {
        Self::ensure_positive(amount)?;
        *self.balances.write().await.entry(owner.clone()).or_default() += amount;
        Ok(())
    }
}

#[async_trait]
impl AssetLedger for InMemoryLedger {
    async fn balance_of(&self, owner: &Identity) -> Result<Decimal> {
        Ok(self.balances.read().await.get(owner).copied().unwrap_or_default())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn debit(&self, owner: &Identity, amount: Decimal) -> Result<()> {
        self.withdraw(owner, amount).await?;
        debug!(amount = %amount, "Ledger debit");
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn credit(&self, owner: &Identity, amount: Decimal) -> Result<()> {
        self.deposit(owner, amount).await?;
        debug!(amount = %amount, "Ledger credit");
        Ok(())
    }

    async fn mint(&self, owner: &Identity, amount: Decimal) -> Result<()> {
        self.deposit(owner, amount).await
    }

    async fn burn(&self, owner: &Identity, amount: Decimal) -> Result<()> {
        self.withdraw(owner, amount).await
    }
}
