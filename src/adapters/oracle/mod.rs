//! Randomness Oracle Adapters
//!
//! - `channel`: queue-backed `RandomnessOracle` port implementation
//! - `local`: simulated oracle task answering that queue

pub mod channel;
pub mod local;

pub use channel::ChannelOracle;
pub use local::run_simulated_oracle;
