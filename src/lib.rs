//! Roulette Pool — Library Root
//!
//! Pooled-liquidity roulette table: providers fund a shared pool,
//! players bet against it, and a randomness oracle settles each request.
//! Re-exports all modules for integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
