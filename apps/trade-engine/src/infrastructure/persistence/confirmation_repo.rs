//! In-Memory Confirmation Repository
//!
//! `transition` implements the compare-and-swap the trait contract
//! demands: the write lock is held across the status check and the
//! mutation so two concurrent confirm/cancel calls can never both win.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::confirmation::{Confirmation, ConfirmationError, ConfirmationRepository, ConfirmationStatus};
use crate::domain::shared::{ConfirmationId, RunId, TenantId};

/// In-memory, process-local `ConfirmationRepository`.
#[derive(Debug, Default)]
pub struct InMemoryConfirmationRepository {
    confirmations: RwLock<HashMap<String, Confirmation>>,
}

impl InMemoryConfirmationRepository {
    /// Construct an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationRepository for InMemoryConfirmationRepository {
    async fn insert(&self, confirmation: Confirmation) {
        self.confirmations
            .write()
            .unwrap()
            .insert(confirmation.id.as_str().to_string(), confirmation);
    }

    async fn get_by_id(&self, tenant_id: &TenantId, id: &ConfirmationId) -> Option<Confirmation> {
        self.confirmations
            .read()
            .unwrap()
            .get(id.as_str())
            .filter(|c| &c.tenant_id == tenant_id)
            .cloned()
    }

    async fn transition(
        &self,
        tenant_id: &TenantId,
        id: &ConfirmationId,
        expected_status: ConfirmationStatus,
        new_status: ConfirmationStatus,
        run_id: Option<RunId>,
    ) -> Result<(), ConfirmationError> {
        let mut confirmations = self.confirmations.write().unwrap();
        let confirmation = confirmations
            .get_mut(id.as_str())
            .filter(|c| &c.tenant_id == tenant_id)
            .ok_or(ConfirmationError::NotFound)?;

        if confirmation.status != expected_status {
            return Err(ConfirmationError::ConcurrentModification);
        }

        confirmation.status = new_status;
        if run_id.is_some() {
            confirmation.run_id = run_id;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::ConversationId;
    use serde_json::json;

    fn sample(tenant: &str) -> Confirmation {
        Confirmation::create_pending(
            TenantId::new(tenant),
            ConversationId::new("conv-1"),
            "PAPER",
            json!({"actions": []}),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn insert_and_get_round_trips_for_owning_tenant() {
        let repo = InMemoryConfirmationRepository::new();
        let confirmation = sample("tenant-1");
        let id = confirmation.id.clone();
        repo.insert(confirmation).await;

        let found = repo.get_by_id(&TenantId::new("tenant-1"), &id).await;
        assert!(found.is_some());

        let wrong_tenant = repo.get_by_id(&TenantId::new("tenant-2"), &id).await;
        assert!(wrong_tenant.is_none());
    }

    #[tokio::test]
    async fn transition_rejects_mismatched_expected_status() {
        let repo = InMemoryConfirmationRepository::new();
        let confirmation = sample("tenant-1");
        let id = confirmation.id.clone();
        let tenant_id = confirmation.tenant_id.clone();
        repo.insert(confirmation).await;

        let result = repo
            .transition(
                &tenant_id,
                &id,
                ConfirmationStatus::Confirmed,
                ConfirmationStatus::Cancelled,
                None,
            )
            .await;
        assert_eq!(result, Err(ConfirmationError::ConcurrentModification));
    }

    #[tokio::test]
    async fn transition_applies_new_status_and_run_id() {
        let repo = InMemoryConfirmationRepository::new();
        let confirmation = sample("tenant-1");
        let id = confirmation.id.clone();
        let tenant_id = confirmation.tenant_id.clone();
        repo.insert(confirmation).await;

        let run_id = RunId::new("run-1");
        repo.transition(
            &tenant_id,
            &id,
            ConfirmationStatus::Pending,
            ConfirmationStatus::Confirmed,
            Some(run_id.clone()),
        )
        .await
        .unwrap();

        let found = repo.get_by_id(&tenant_id, &id).await.unwrap();
        assert_eq!(found.status, ConfirmationStatus::Confirmed);
        assert_eq!(found.run_id, Some(run_id));
    }
}
