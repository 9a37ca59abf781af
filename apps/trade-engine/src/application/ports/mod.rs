//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): How the world uses our application
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems

mod broker_port;
mod event_publisher_port;

pub use broker_port::{
    BrokerError, BrokerPort, OrderHistoryEntry, PlaceOrderRequest, PlaceOrderResponse,
    PlaceOrderSize, PreviewResult,
};
pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
