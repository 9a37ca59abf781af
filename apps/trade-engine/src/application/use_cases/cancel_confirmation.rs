//! Cancel Confirmation Use Case
//!
//! Implements `POST /api/v1/confirmations/{conf_id}/cancel`: transitions a
//! `PENDING` confirmation to `CANCELLED`. Cancelling an already-cancelled
//! confirmation is a no-op; cancelling a confirmed or expired one is
//! rejected so the caller can distinguish "already running" from
//! "nothing to cancel".

use crate::domain::confirmation::{ConfirmationError, ConfirmationRepository, ConfirmationStatus};
use crate::domain::shared::{ConfirmationId, TenantId, Timestamp};

/// Error surfaced by [`CancelConfirmationUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum CancelConfirmationError {
    /// No confirmation exists for this id under this tenant.
    #[error("confirmation not found")]
    NotFound,
    /// The confirmation already moved past `PENDING` (confirmed/expired).
    #[error("confirmation is in terminal state {0:?} and cannot be cancelled")]
    TerminalState(ConfirmationStatus),
    /// A concurrent confirm/cancel won the race.
    #[error("confirmation was concurrently modified, retry the read")]
    ConcurrentModification,
}

impl From<ConfirmationError> for CancelConfirmationError {
    fn from(error: ConfirmationError) -> Self {
        match error {
            ConfirmationError::NotFound => Self::NotFound,
            ConfirmationError::TerminalState(status) => Self::TerminalState(status),
            ConfirmationError::ConcurrentModification => Self::ConcurrentModification,
        }
    }
}

/// Cancels a pending trade confirmation.
pub struct CancelConfirmationUseCase<C: ConfirmationRepository> {
    confirmations: C,
}

impl<C: ConfirmationRepository> CancelConfirmationUseCase<C> {
    /// Construct the use case over a confirmation repository.
    pub const fn new(confirmations: C) -> Self {
        Self { confirmations }
    }

    /// Cancel `confirmation_id` for `tenant_id`.
    pub async fn execute(
        &self,
        tenant_id: &TenantId,
        confirmation_id: &ConfirmationId,
    ) -> Result<(), CancelConfirmationError> {
        let confirmation = self
            .confirmations
            .get_by_id(tenant_id, confirmation_id)
            .await
            .ok_or(CancelConfirmationError::NotFound)?;

        match confirmation.status_as_of(Timestamp::now()) {
            ConfirmationStatus::Cancelled => Ok(()),
            ConfirmationStatus::Pending => {
                self.confirmations
                    .transition(
                        tenant_id,
                        confirmation_id,
                        ConfirmationStatus::Pending,
                        ConfirmationStatus::Cancelled,
                        None,
                    )
                    .await?;
                Ok(())
            }
            other => Err(CancelConfirmationError::TerminalState(other)),
        }
    }
}
