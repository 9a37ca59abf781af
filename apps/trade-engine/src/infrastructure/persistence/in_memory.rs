//! In-Memory Order Repository
//!
//! Reference implementation of `OrderRepository` for tests and local
//! development. Mirrors the indexing strategy (primary map keyed by
//! internal ID, secondary maps for broker ID and client order ID lookups)
//! that a real Turso-backed adapter would express as indexed columns.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::order_execution::value_objects::OrderStatus;
use crate::domain::shared::{BrokerId, OrderId, RunId};

/// In-memory, process-local `OrderRepository`.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
    broker_index: RwLock<HashMap<String, String>>,
    client_order_index: RwLock<HashMap<String, String>>,
}

impl InMemoryOrderRepository {
    /// Construct an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        let mut orders = self.orders.write().unwrap();
        let mut broker_index = self.broker_index.write().unwrap();
        let mut client_index = self.client_order_index.write().unwrap();

        if let Some(broker_id) = order.broker_order_id() {
            broker_index.insert(
                broker_id.as_str().to_string(),
                order.id().as_str().to_string(),
            );
        }
        client_index
            .entry(order.client_order_id().to_string())
            .or_insert_with(|| order.id().as_str().to_string());
        orders.insert(order.id().as_str().to_string(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.get(id.as_str()).cloned())
    }

    async fn find_by_client_order_id(
        &self,
        client_order_id: &str,
    ) -> Result<Option<Order>, OrderError> {
        let index = self.client_order_index.read().unwrap();
        let orders = self.orders.read().unwrap();
        Ok(index
            .get(client_order_id)
            .and_then(|id| orders.get(id))
            .cloned())
    }

    async fn find_by_broker_id(&self, broker_id: &BrokerId) -> Result<Option<Order>, OrderError> {
        let index = self.broker_index.read().unwrap();
        let orders = self.orders.read().unwrap();
        Ok(index
            .get(broker_id.as_str())
            .and_then(|id| orders.get(id))
            .cloned())
    }

    async fn find_by_run(&self, run_id: &RunId) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.run_id() == run_id)
            .cloned()
            .collect())
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.status() == status)
            .cloned()
            .collect())
    }

    async fn find_active(&self) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.status().is_active())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::aggregate::{CreateOrderCommand, OrderSize};
    use crate::domain::order_execution::value_objects::OrderSide;
    use crate::domain::shared::{Money, Symbol, TenantId};

    fn make_order(client_order_id: &str) -> Order {
        Order::new(CreateOrderCommand {
            run_id: RunId::new("run-1"),
            tenant_id: TenantId::new("tenant-1"),
            provider: "coinbase".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Buy,
            size: OrderSize::Notional(Money::usd(3.0)),
            client_order_id: client_order_id.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let repo = InMemoryOrderRepository::new();
        let order = make_order("coid-1");
        let id = order.id().clone();

        repo.save(&order).await.unwrap();

        let found = repo.find_by_id(&id).await.unwrap();
        assert_eq!(found.unwrap().id(), &id);
    }

    #[tokio::test]
    async fn find_by_client_order_id_is_idempotent_key() {
        let repo = InMemoryOrderRepository::new();
        repo.save(&make_order("coid-1")).await.unwrap();

        assert!(repo
            .find_by_client_order_id("coid-1")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_client_order_id("coid-missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn find_active_excludes_terminal_orders() {
        let repo = InMemoryOrderRepository::new();

        repo.save(&make_order("coid-1")).await.unwrap();

        let mut order2 = make_order("coid-2");
        order2
            .accept(BrokerId::new("broker-2"), OrderStatus::Open)
            .unwrap();
        repo.save(&order2).await.unwrap();

        let mut order3 = make_order("coid-3");
        order3
            .reject(crate::domain::order_execution::value_objects::RejectReason::order_rejected(
                "nope",
            ))
            .unwrap();
        repo.save(&order3).await.unwrap();

        let active = repo.find_active().await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn find_by_run_filters_by_run_id() {
        let repo = InMemoryOrderRepository::new();
        repo.save(&make_order("coid-1")).await.unwrap();

        let found = repo.find_by_run(&RunId::new("run-1")).await.unwrap();
        assert_eq!(found.len(), 1);

        let none = repo.find_by_run(&RunId::new("other-run")).await.unwrap();
        assert!(none.is_empty());
    }
}
