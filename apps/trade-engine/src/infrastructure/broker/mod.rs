//! Broker Adapters
//!
//! Implementations of `BrokerPort` for various brokers.

pub mod coinbase;

pub use coinbase::{CoinbaseBrokerAdapter, CoinbaseConfig, CoinbaseError};
