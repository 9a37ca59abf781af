//! Order Repository Trait
//!
//! Defines the persistence abstraction for orders.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;

use super::aggregate::Order;
use super::errors::OrderError;
use super::value_objects::OrderStatus;
use crate::domain::shared::{BrokerId, OrderId, RunId};

/// Repository trait for Order persistence.
///
/// This is a domain interface (port) implemented by infrastructure adapters
/// (Turso, in-memory, etc.). `save` must upsert keyed by `client_order_id`
/// (`INSERT OR IGNORE` semantics) so a retried submission never creates a
/// duplicate order.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Save an order (insert or update).
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn save(&self, order: &Order) -> Result<(), OrderError>;

    /// Find an order by its internal ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;

    /// Find an order by its client order ID (the idempotency key).
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_client_order_id(
        &self,
        client_order_id: &str,
    ) -> Result<Option<Order>, OrderError>;

    /// Find an order by broker's order ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_broker_id(&self, broker_id: &BrokerId) -> Result<Option<Order>, OrderError>;

    /// Find all orders belonging to a run.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_run(&self, run_id: &RunId) -> Result<Vec<Order>, OrderError>;

    /// Find all orders with a given status.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError>;

    /// Find all active (non-terminal) orders, e.g. for the fill-reconciliation poller.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_active(&self) -> Result<Vec<Order>, OrderError>;
}

#[async_trait]
impl<T: OrderRepository + ?Sized> OrderRepository for std::sync::Arc<T> {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        (**self).save(order).await
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_client_order_id(
        &self,
        client_order_id: &str,
    ) -> Result<Option<Order>, OrderError> {
        (**self).find_by_client_order_id(client_order_id).await
    }

    async fn find_by_broker_id(&self, broker_id: &BrokerId) -> Result<Option<Order>, OrderError> {
        (**self).find_by_broker_id(broker_id).await
    }

    async fn find_by_run(&self, run_id: &RunId) -> Result<Vec<Order>, OrderError> {
        (**self).find_by_run(run_id).await
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        (**self).find_by_status(status).await
    }

    async fn find_active(&self) -> Result<Vec<Order>, OrderError> {
        (**self).find_active().await
    }
}
