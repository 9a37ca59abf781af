//! Get Run Use Case
//!
//! Backs `GET /api/v1/runs/{run_id}`: assembles a tenant-scoped view of a
//! run together with its DAG nodes and orders, the way the donor's
//! `GetOrderStateResponse` assembles multiple repository reads into one
//! response shape.

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::run::{DagNode, Run, RunRepository};
use crate::domain::shared::{RunId, TenantId};

/// A run plus its DAG nodes and the orders it placed.
#[derive(Debug, Clone)]
pub struct RunView {
    /// The run row itself.
    pub run: Run,
    /// DAG nodes recorded for the run, in start order.
    pub nodes: Vec<DagNode>,
    /// Orders placed under the run.
    pub orders: Vec<Order>,
}

/// Error surfaced by [`GetRunUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum GetRunError {
    /// No run exists for this id under this tenant.
    #[error("run not found")]
    NotFound,
    /// Looking up the run's orders failed.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Assembles a tenant-scoped view of a run.
pub struct GetRunUseCase<R: RunRepository, O: OrderRepository> {
    runs: R,
    orders: O,
}

impl<R: RunRepository, O: OrderRepository> GetRunUseCase<R, O> {
    /// Construct the use case over a run repository and order repository.
    pub const fn new(runs: R, orders: O) -> Self {
        Self { runs, orders }
    }

    /// Fetch `run_id` for `tenant_id`, with its nodes and orders.
    pub async fn execute(
        &self,
        tenant_id: &TenantId,
        run_id: &RunId,
    ) -> Result<RunView, GetRunError> {
        let run = self
            .runs
            .get_run(tenant_id, run_id)
            .await
            .ok_or(GetRunError::NotFound)?;

        let nodes = self.runs.list_nodes(run_id).await;
        let orders = self.orders.find_by_run(run_id).await?;

        Ok(RunView { run, nodes, orders })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::AssetClass;
    use crate::infrastructure::persistence::{InMemoryOrderRepository, InMemoryRunRepository};
    use serde_json::json;

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let use_case = GetRunUseCase::new(InMemoryRunRepository::new(), InMemoryOrderRepository::new());
        let result = use_case
            .execute(&TenantId::new("tenant-1"), &RunId::new("run-missing"))
            .await;
        assert!(matches!(result, Err(GetRunError::NotFound)));
    }

    #[tokio::test]
    async fn returns_run_scoped_to_tenant() {
        let runs = InMemoryRunRepository::new();
        let tenant_id = TenantId::new("tenant-1");
        let run = Run::start(
            tenant_id.clone(),
            "PAPER",
            AssetClass::Crypto,
            json!({"actions": []}),
            None,
            None,
        );
        let run_id = run.run_id.clone();
        runs.insert_run(run).await;

        let use_case = GetRunUseCase::new(runs, InMemoryOrderRepository::new());
        let view = use_case.execute(&tenant_id, &run_id).await.unwrap();
        assert_eq!(view.run.run_id, run_id);
        assert!(view.nodes.is_empty());
        assert!(view.orders.is_empty());

        let wrong_tenant = use_case.runs.get_run(&TenantId::new("tenant-2"), &run_id).await;
        assert!(wrong_tenant.is_none());
    }
}
