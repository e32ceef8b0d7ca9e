//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Table limits, fee rate, timelock and the privileged identities are
//! externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the engine is built.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Betting limits, fees and timelock.
  #[serde(default)]
  pub table: TableConfig,
  /// Privileged identities.
  pub identities: IdentityConfig,
  /// Randomness oracle wiring.
  #[serde(default)]
  pub oracle: OracleConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Longest accepted redeem timelock: one year.
pub const MAX_REDEEM_TIMELOCK_SECONDS: u64 = 365 * 24 * 3_600;

/// Table policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
  /// Absolute ceiling on any single bet.
  #[serde(default = "default_fixed_max_bet")]
  pub fixed_max_bet: Decimal,
  /// Max bet is `floor(liquidity / max_bet_divisor)` below the ceiling.
  #[serde(default = "default_max_bet_divisor")]
  pub max_bet_divisor: Decimal,
  /// Maximum bets accepted in one request.
  #[serde(default = "default_max_bets_per_request")]
  pub max_bets_per_request: usize,
  /// Fee charged on each stake, as a fraction in [0, 1).
  #[serde(default)]
  pub bet_fee: Decimal,
  /// Seconds after submission before an unresolved request is refundable.
  #[serde(default = "default_timelock")]
  pub redeem_timelock_seconds: u64,
  /// House capital injected into the pool at startup.
  #[serde(default)]
  pub bootstrap_capital: Decimal,
}

impl Default for TableConfig {
  fn default() -> Self {
    Self {
      fixed_max_bet: default_fixed_max_bet(),
      max_bet_divisor: default_max_bet_divisor(),
      max_bets_per_request: default_max_bets_per_request(),
      bet_fee: Decimal::ZERO,
      redeem_timelock_seconds: default_timelock(),
      bootstrap_capital: Decimal::ZERO,
    }
  }
}

/// Privileged identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
  /// Administrator: fee rate, fee withdrawal, capital events.
  pub admin: String,
  /// The only identity allowed to deliver outcomes.
  pub oracle: String,
}

/// Oracle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
  /// Run the in-process simulated oracle (development only).
  #[serde(default)]
  pub simulate: bool,
  /// Delay before the simulated oracle answers (milliseconds).
  #[serde(default = "default_fulfill_delay")]
  pub fulfill_delay_ms: u64,
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      simulate: false,
      fulfill_delay_ms: default_fulfill_delay(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for the JSONL journal and snapshots.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Snapshot interval (seconds).
  #[serde(default = "default_snapshot_interval")]
  pub snapshot_interval_seconds: u64,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      snapshot_interval_seconds: default_snapshot_interval(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_fixed_max_bet() -> Decimal {
  dec!(100)
}

fn default_max_bet_divisor() -> Decimal {
  dec!(100)
}

fn default_max_bets_per_request() -> usize {
  10
}

fn default_timelock() -> u64 {
  7_200 // 2 hours
}

fn default_fulfill_delay() -> u64 {
  500
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_snapshot_interval() -> u64 {
  60
}
