//! Coinbase Advanced Trade Broker Adapter
//!
//! Production implementation of `BrokerPort` against the Coinbase Advanced
//! Trade REST API: CDP JWT (ES256) request signing, market-IOC order
//! placement, balance/fill/order-history reads, and a fixed-schedule retry
//! policy for transient broker errors.

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;
mod jwt;

pub use adapter::CoinbaseBrokerAdapter;
pub use config::CoinbaseConfig;
pub use error::CoinbaseError;
