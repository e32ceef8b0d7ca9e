//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export on :9090 and the health and
//! table query endpoints (/live, /ready, /table) via axum 0.7.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState, TableProbe};
pub use prometheus::MetricsRegistry;
