//! In-Memory Portfolio Snapshot Repository
//!
//! Only the latest snapshot per tenant is retained — a new `save` replaces
//! whatever that tenant had before.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::portfolio_snapshot::{PortfolioSnapshot, PortfolioSnapshotRepository};
use crate::domain::shared::TenantId;

/// In-memory, process-local `PortfolioSnapshotRepository`.
#[derive(Debug, Default)]
pub struct InMemoryPortfolioSnapshotRepository {
    snapshots: RwLock<HashMap<String, PortfolioSnapshot>>,
}

impl InMemoryPortfolioSnapshotRepository {
    /// Construct an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioSnapshotRepository for InMemoryPortfolioSnapshotRepository {
    async fn save(&self, snapshot: PortfolioSnapshot) {
        self.snapshots
            .write()
            .unwrap()
            .insert(snapshot.tenant_id.as_str().to_string(), snapshot);
    }

    async fn latest(&self, tenant_id: &TenantId) -> Option<PortfolioSnapshot> {
        self.snapshots.read().unwrap().get(tenant_id.as_str()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Timestamp;

    #[tokio::test]
    async fn latest_returns_none_before_any_save() {
        let repo = InMemoryPortfolioSnapshotRepository::new();
        assert!(repo.latest(&TenantId::new("tenant-1")).await.is_none());
    }

    #[tokio::test]
    async fn save_replaces_the_prior_snapshot_for_that_tenant() {
        let repo = InMemoryPortfolioSnapshotRepository::new();
        let tenant = TenantId::new("tenant-1");
        repo.save(PortfolioSnapshot {
            tenant_id: tenant.clone(),
            balances: HashMap::new(),
            captured_at: Timestamp::now(),
        })
        .await;
        let mut balances = HashMap::new();
        balances.insert(
            "BTC".to_string(),
            crate::domain::asset_resolution::ExecutableBalance {
                currency: "BTC".to_string(),
                available_qty: rust_decimal::Decimal::ONE,
                hold_qty: rust_decimal::Decimal::ZERO,
                account_uuid: "acct-1".to_string(),
                updated_at: Timestamp::now(),
            },
        );
        repo.save(PortfolioSnapshot {
            tenant_id: tenant.clone(),
            balances,
            captured_at: Timestamp::now(),
        })
        .await;

        let latest = repo.latest(&tenant).await.unwrap();
        assert_eq!(latest.balances.len(), 1);
    }
}
