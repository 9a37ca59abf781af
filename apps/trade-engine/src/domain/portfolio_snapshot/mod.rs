//! Portfolio Snapshot
//!
//! The Executable State Fetcher's degrade path. In PAPER mode the broker's
//! live balance endpoint is never called; in LIVE mode, a failed balance
//! fetch degrades rather than blocking every action. Both fall back to the
//! most recently persisted [`PortfolioSnapshot`], reported with `hold_qty`
//! zeroed out since a stale snapshot cannot know what's currently on hold.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::asset_resolution::ExecutableBalance;
use crate::domain::shared::{TenantId, Timestamp};

/// Where a context's balances actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSource {
    /// Fetched live from the broker this call.
    Live,
    /// The broker was skipped (PAPER) or its fetch failed (LIVE);
    /// degraded to the last persisted snapshot.
    PortfolioSnapshotFallback,
}

/// A point-in-time record of executable balances, captured after a
/// successful LIVE fetch, for PAPER mode and LIVE-failure degrade paths to
/// read back later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Tenant this snapshot belongs to.
    pub tenant_id: TenantId,
    /// Balances as last observed live, keyed by currency.
    pub balances: HashMap<String, ExecutableBalance>,
    /// When this snapshot was captured.
    pub captured_at: Timestamp,
}

impl PortfolioSnapshot {
    /// Rebuild this snapshot's balances as executable state for a degraded
    /// read: `hold_qty` zeroed, since a snapshot can't say what's currently
    /// on hold.
    #[must_use]
    pub fn as_degraded_balances(&self) -> HashMap<String, ExecutableBalance> {
        self.balances
            .iter()
            .map(|(currency, balance)| {
                (
                    currency.clone(),
                    ExecutableBalance {
                        currency: balance.currency.clone(),
                        available_qty: balance.available_qty,
                        hold_qty: rust_decimal::Decimal::ZERO,
                        account_uuid: balance.account_uuid.clone(),
                        updated_at: self.captured_at,
                    },
                )
            })
            .collect()
    }
}

/// Repository for the latest portfolio snapshot per tenant. Only the most
/// recent snapshot is kept; there is no history to browse.
#[async_trait]
pub trait PortfolioSnapshotRepository: Send + Sync {
    /// Persist `snapshot`, replacing any prior snapshot for its tenant.
    async fn save(&self, snapshot: PortfolioSnapshot);

    /// Fetch the most recently persisted snapshot for a tenant, if any.
    async fn latest(&self, tenant_id: &TenantId) -> Option<PortfolioSnapshot>;
}

#[async_trait]
impl<T: PortfolioSnapshotRepository + ?Sized> PortfolioSnapshotRepository for std::sync::Arc<T> {
    async fn save(&self, snapshot: PortfolioSnapshot) {
        (**self).save(snapshot).await;
    }

    async fn latest(&self, tenant_id: &TenantId) -> Option<PortfolioSnapshot> {
        (**self).latest(tenant_id).await
    }
}
