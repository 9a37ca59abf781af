//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer.
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `persistence/`: Turso-backed repository adapters
//!   - `broker/`: Broker API adapters (Coinbase Advanced Trade)
//!
//! - **Driver Adapters (Inbound)**: Expose application to external world
//!   - `http/`: REST API controllers

pub mod broker;
pub mod http;
pub mod persistence;
