//! Clock Port - Time Source for Timelocks
//!
//! Redeem eligibility depends on wall time; routing it through a trait
//! lets tests move time forward instead of sleeping.

use chrono::{DateTime, Utc};

/// Trait for wall-clock providers.
pub trait Clock: Send + Sync + 'static {
  /// Current instant.
  fn now(&self) -> DateTime<Utc>;
}
