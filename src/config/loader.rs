//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::{AppConfig, MAX_REDEEM_TIMELOCK_SECONDS};

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    fixed_max_bet = %config.table.fixed_max_bet,
    bet_fee = %config.table.bet_fee,
    timelock_secs = config.table.redeem_timelock_seconds,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive table limits
/// - Fee rate in [0, 1)
/// - Distinct, non-empty privileged identities
fn validate_config(config: &AppConfig) -> Result<()> {
  let table = &config.table;

  anyhow::ensure!(
    table.fixed_max_bet > Decimal::ZERO,
    "fixed_max_bet must be positive, got {}",
    table.fixed_max_bet
  );
  anyhow::ensure!(
    table.max_bet_divisor > Decimal::ZERO,
    "max_bet_divisor must be positive, got {}",
    table.max_bet_divisor
  );
  anyhow::ensure!(
    table.max_bets_per_request > 0,
    "max_bets_per_request must be at least 1"
  );
  anyhow::ensure!(
    table.bet_fee >= Decimal::ZERO && table.bet_fee < Decimal::ONE,
    "bet_fee must be in [0, 1), got {}",
    table.bet_fee
  );
  anyhow::ensure!(
    table.redeem_timelock_seconds > 0
      && table.redeem_timelock_seconds <= MAX_REDEEM_TIMELOCK_SECONDS,
    "redeem_timelock_seconds must be in (0, {}], got {}",
    MAX_REDEEM_TIMELOCK_SECONDS,
    table.redeem_timelock_seconds
  );
  anyhow::ensure!(
    table.bootstrap_capital >= Decimal::ZERO,
    "bootstrap_capital must not be negative"
  );

  // Identity validation
  anyhow::ensure!(
    !config.identities.admin.is_empty(),
    "Admin identity must not be empty"
  );
  anyhow::ensure!(
    !config.identities.oracle.is_empty(),
    "Oracle identity must not be empty"
  );
  anyhow::ensure!(
    config.identities.admin != config.identities.oracle,
    "Admin and oracle identities must differ"
  );

  anyhow::ensure!(
    config.persistence.snapshot_interval_seconds > 0,
    "snapshot_interval_seconds must be positive"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  const MINIMAL: &str = r#"
    [service]
    name = "table-1"

    [identities]
    admin = "house"
    oracle = "vrf"
  "#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.table.fixed_max_bet, dec!(100));
    assert_eq!(config.table.max_bet_divisor, dec!(100));
    assert_eq!(config.table.redeem_timelock_seconds, 7_200);
    assert_eq!(config.table.bet_fee, dec!(0));
    assert!(!config.oracle.simulate);
    assert_eq!(config.persistence.data_dir, "data");
  }

  #[test]
  fn test_fractional_fee_parses() {
    let text = format!("{MINIMAL}\n[table]\nbet_fee = 0.02\n");
    let config = parse_config(&text).unwrap();
    assert_eq!(config.table.bet_fee, dec!(0.02));
  }

  #[test]
  fn test_rejects_full_fee() {
    let text = format!("{MINIMAL}\n[table]\nbet_fee = 1\n");
    assert!(parse_config(&text).is_err());
  }

  #[test]
  fn test_rejects_timelock_beyond_a_year() {
    let text = format!("{MINIMAL}\n[table]\nredeem_timelock_seconds = 10000000000000\n");
    let err = parse_config(&text).unwrap_err();
    assert!(err.to_string().contains("redeem_timelock_seconds"));
  }

  #[test]
  fn test_rejects_shared_identity() {
    let text = r#"
      [service]
      name = "t"
      [identities]
      admin = "same"
      oracle = "same"
    "#;
    assert!(parse_config(text).is_err());
  }
}
