//! Order Execution Bounded Context
//!
//! Manages the complete lifecycle of a market-IOC order from submission
//! through broker acknowledgment, fill reconciliation, and terminal status.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: the root entity managing order state transitions
//! - **Fills**: reconciled execution rows folded into `filled_qty`/`avg_fill_price`
//! - **Domain Events**: fed into the run's append-only event log

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod repository;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order, OrderSize, OrderType, ReconstitutedOrderParams};
pub use errors::OrderError;
pub use events::{
    OrderAccepted, OrderCanceled, OrderEvent, OrderFilled, OrderPartiallyFilled, OrderRejected,
    OrderSubmitted,
};
pub use repository::OrderRepository;
pub use value_objects::{CancelReason, Fill, LiquidityIndicator, OrderSide, OrderStatus, RejectReason};
