//! Confirmation Staging
//!
//! A `Confirmation` holds a staged trade proposal awaiting explicit user
//! approval. Transitions are guarded by optimistic CAS so two concurrent
//! confirm/cancel requests can never both win, and expiry is enforced
//! lazily on read rather than by a background sweeper.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::shared::{ConfirmationId, ConversationId, ProductId, RunId, TenantId, Timestamp};

/// How long a newly staged confirmation remains `PENDING` before it is
/// treated as expired on next read.
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(300);

/// Lifecycle state of a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfirmationStatus {
    /// Staged, awaiting user action, not yet expired.
    Pending,
    /// User approved; a run has been (or is being) started.
    Confirmed,
    /// User explicitly declined.
    Cancelled,
    /// TTL elapsed before the user acted.
    Expired,
}

/// Error returned by a confirmation state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationError {
    /// The confirmation no longer exists, or belongs to a different tenant.
    #[error("confirmation not found")]
    NotFound,
    /// The requested transition is invalid from the confirmation's current
    /// status (e.g. confirming an already-cancelled confirmation).
    #[error("confirmation is in terminal state {0:?} and cannot be confirmed or cancelled")]
    TerminalState(ConfirmationStatus),
    /// The CAS write lost a race to a concurrent transition.
    #[error("confirmation was concurrently modified")]
    ConcurrentModification,
}

/// A staged trade proposal awaiting user approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmation {
    /// `conf_`-prefixed identifier.
    pub id: ConfirmationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Conversation this proposal was raised in.
    pub conversation_id: ConversationId,
    /// Current lifecycle status.
    pub status: ConfirmationStatus,
    /// `PAPER` or `LIVE`.
    pub mode: String,
    /// The serialized `TradeAction` list the user is being asked to approve.
    pub proposal_json: JsonValue,
    /// Optional reasoner narrative shown alongside the proposal.
    pub insight_json: Option<JsonValue>,
    /// Product this confirmation is locked to, preventing a race where the
    /// market moves to a different listing between staging and execution.
    pub locked_product_id: Option<ProductId>,
    /// When this confirmation was staged.
    pub created_at: Timestamp,
    /// `created_at + CONFIRMATION_TTL`.
    pub expires_at: Timestamp,
    /// The run started once this confirmation was confirmed, if any.
    pub run_id: Option<RunId>,
}

impl Confirmation {
    /// Stage a new confirmation with the standard 300s TTL.
    #[must_use]
    pub fn create_pending(
        tenant_id: TenantId,
        conversation_id: ConversationId,
        mode: impl Into<String>,
        proposal_json: JsonValue,
        insight_json: Option<JsonValue>,
        locked_product_id: Option<ProductId>,
    ) -> Self {
        let created_at = Timestamp::now();
        let expires_at = Timestamp::from(
            created_at.as_datetime() + chrono::Duration::seconds(CONFIRMATION_TTL.as_secs() as i64),
        );
        Self {
            id: ConfirmationId::generate(),
            tenant_id,
            conversation_id,
            status: ConfirmationStatus::Pending,
            mode: mode.into(),
            proposal_json,
            insight_json,
            locked_product_id,
            created_at,
            expires_at,
            run_id: None,
        }
    }

    /// Whether this confirmation's TTL has elapsed, regardless of its
    /// stored status. The expiry guard calls this lazily on every read.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.as_datetime() >= self.expires_at.as_datetime()
    }

    /// Apply the expiry guard: a `PENDING` confirmation past its TTL is
    /// reported (and should be persisted) as `EXPIRED`.
    #[must_use]
    pub fn status_as_of(&self, now: Timestamp) -> ConfirmationStatus {
        if self.status == ConfirmationStatus::Pending && self.is_expired(now) {
            ConfirmationStatus::Expired
        } else {
            self.status
        }
    }

    /// Transition to `CONFIRMED`. Idempotent: confirming an
    /// already-`CONFIRMED` confirmation returns `Ok` with no state change,
    /// since the caller may be retrying after a dropped response.
    pub fn confirm(&mut self, run_id: RunId, now: Timestamp) -> Result<(), ConfirmationError> {
        match self.status_as_of(now) {
            ConfirmationStatus::Confirmed => Ok(()),
            ConfirmationStatus::Pending => {
                self.status = ConfirmationStatus::Confirmed;
                self.run_id = Some(run_id);
                Ok(())
            }
            other => Err(ConfirmationError::TerminalState(other)),
        }
    }

    /// Transition to `CANCELLED`. The user may cancel a `PENDING`
    /// confirmation at any time before it expires or is confirmed.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), ConfirmationError> {
        match self.status_as_of(now) {
            ConfirmationStatus::Pending => {
                self.status = ConfirmationStatus::Cancelled;
                Ok(())
            }
            ConfirmationStatus::Cancelled => Ok(()),
            other => Err(ConfirmationError::TerminalState(other)),
        }
    }
}

/// Persistence abstraction for confirmations. Transitions must be
/// implemented as an atomic compare-and-swap on status (e.g. a SQL
/// `UPDATE ... WHERE status = ?`), never a read-then-write.
#[async_trait::async_trait]
pub trait ConfirmationRepository: Send + Sync {
    /// Persist a newly staged confirmation.
    async fn insert(&self, confirmation: Confirmation);

    /// Look up a confirmation, scoped to the caller's tenant.
    async fn get_by_id(&self, tenant_id: &TenantId, id: &ConfirmationId) -> Option<Confirmation>;

    /// Atomically transition a confirmation's status. The repository must
    /// reject (return `Err(ConcurrentModification)`) if the confirmation's
    /// stored status no longer matches `expected_status` at write time.
    async fn transition(
        &self,
        tenant_id: &TenantId,
        id: &ConfirmationId,
        expected_status: ConfirmationStatus,
        new_status: ConfirmationStatus,
        run_id: Option<RunId>,
    ) -> Result<(), ConfirmationError>;
}

#[async_trait::async_trait]
impl<T: ConfirmationRepository + ?Sized> ConfirmationRepository for std::sync::Arc<T> {
    async fn insert(&self, confirmation: Confirmation) {
        (**self).insert(confirmation).await;
    }

    async fn get_by_id(&self, tenant_id: &TenantId, id: &ConfirmationId) -> Option<Confirmation> {
        (**self).get_by_id(tenant_id, id).await
    }

    async fn transition(
        &self,
        tenant_id: &TenantId,
        id: &ConfirmationId,
        expected_status: ConfirmationStatus,
        new_status: ConfirmationStatus,
        run_id: Option<RunId>,
    ) -> Result<(), ConfirmationError> {
        (**self)
            .transition(tenant_id, id, expected_status, new_status, run_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Confirmation {
        Confirmation::create_pending(
            TenantId::new("tenant-1"),
            ConversationId::new("conv-1"),
            "PAPER",
            json!({"actions": []}),
            None,
            Some(ProductId::new("BTC-USD")),
        )
    }

    #[test]
    fn create_pending_has_300_second_ttl() {
        let confirmation = sample();
        let delta = confirmation
            .expires_at
            .as_datetime()
            .signed_duration_since(confirmation.created_at.as_datetime());
        assert_eq!(delta.num_seconds(), 300);
        assert_eq!(confirmation.status, ConfirmationStatus::Pending);
    }

    #[test]
    fn confirm_transitions_to_confirmed_and_records_run() {
        let mut confirmation = sample();
        let now = confirmation.created_at;
        let run_id = RunId::generate();
        confirmation.confirm(run_id.clone(), now).unwrap();
        assert_eq!(confirmation.status, ConfirmationStatus::Confirmed);
        assert_eq!(confirmation.run_id, Some(run_id));
    }

    #[test]
    fn confirm_is_idempotent_on_replay() {
        let mut confirmation = sample();
        let now = confirmation.created_at;
        let run_id = RunId::generate();
        confirmation.confirm(run_id.clone(), now).unwrap();
        // A retried confirm call for the same already-confirmed row must
        // not error.
        confirmation.confirm(RunId::generate(), now).unwrap();
        assert_eq!(confirmation.run_id, Some(run_id));
    }

    #[test]
    fn expired_confirmation_cannot_be_confirmed() {
        let confirmation = sample();
        let later = Timestamp::from(
            confirmation.created_at.as_datetime() + chrono::Duration::seconds(301),
        );
        assert_eq!(confirmation.status_as_of(later), ConfirmationStatus::Expired);

        let mut confirmation = confirmation;
        let err = confirmation.confirm(RunId::generate(), later).unwrap_err();
        assert_eq!(err, ConfirmationError::TerminalState(ConfirmationStatus::Expired));
    }

    #[test]
    fn cancel_is_idempotent_but_rejects_after_confirm() {
        let mut confirmation = sample();
        let now = confirmation.created_at;
        confirmation.cancel(now).unwrap();
        confirmation.cancel(now).unwrap();

        let mut confirmed = sample();
        confirmed.confirm(RunId::generate(), now).unwrap();
        let err = confirmed.cancel(now).unwrap_err();
        assert_eq!(err, ConfirmationError::TerminalState(ConfirmationStatus::Confirmed));
    }
}
