//! Confirm Trade Use Case
//!
//! Implements the `POST /api/v1/confirmations/{conf_id}/confirm` contract:
//! an atomic CAS on the confirmation's status, then a new `Run` started
//! from the confirmation's locked proposal. Confirming an already-CONFIRMED
//! confirmation is idempotent and replays the existing `run_id` rather than
//! starting a second run for the same handle.
//!
//! Once the run is inserted and the confirmation transitions to
//! `Confirmed`, its DAG is handed to [`ExecuteRunUseCase`] on a detached
//! task: the HTTP response returns `EXECUTING` immediately, and the run
//! progresses to a terminal status in the background.

use std::sync::Arc;

use crate::application::ports::BrokerPort;
use crate::domain::confirmation::{ConfirmationError, ConfirmationRepository, ConfirmationStatus};
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::product_catalog::ProductCatalogRepository;
use crate::domain::run::{AssetClass, Run, RunRepository};
use crate::domain::shared::{ConfirmationId, RunId, TenantId, Timestamp};

use super::execute_run::ExecuteRunUseCase;

/// Outcome of a confirm request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// A new run was started.
    Started(RunId),
    /// The confirmation was already confirmed; this is the prior run.
    AlreadyConfirmed(RunId),
}

/// Error surfaced by [`ConfirmTradeUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum ConfirmTradeError {
    /// No confirmation exists for this id under this tenant.
    #[error("confirmation not found")]
    NotFound,
    /// The confirmation is cancelled or expired and cannot be confirmed.
    #[error("confirmation is in terminal state {0:?}")]
    TerminalState(ConfirmationStatus),
    /// A concurrent confirm/cancel won the race.
    #[error("confirmation was concurrently modified, retry the read")]
    ConcurrentModification,
}

impl From<ConfirmationError> for ConfirmTradeError {
    fn from(error: ConfirmationError) -> Self {
        match error {
            ConfirmationError::NotFound => Self::NotFound,
            ConfirmationError::TerminalState(status) => Self::TerminalState(status),
            ConfirmationError::ConcurrentModification => Self::ConcurrentModification,
        }
    }
}

/// Confirms a staged trade proposal, starts its run, and spawns the
/// background DAG executor for it.
pub struct ConfirmTradeUseCase<C, R, B, O, P>
where
    C: ConfirmationRepository,
    R: RunRepository + Clone + Send + Sync + 'static,
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    confirmations: C,
    runs: R,
    executor: Arc<ExecuteRunUseCase<B, O, R, P>>,
}

impl<C, R, B, O, P> ConfirmTradeUseCase<C, R, B, O, P>
where
    C: ConfirmationRepository,
    R: RunRepository + Clone + Send + Sync + 'static,
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    /// Construct the use case over a confirmation repository, run
    /// repository, and the DAG executor confirmed runs are handed to.
    pub const fn new(confirmations: C, runs: R, executor: Arc<ExecuteRunUseCase<B, O, R, P>>) -> Self {
        Self { confirmations, runs, executor }
    }

    /// Confirm `confirmation_id` for `tenant_id`, starting a run on first
    /// confirmation and replaying the existing run on any retry.
    pub async fn execute(
        &self,
        tenant_id: &TenantId,
        confirmation_id: &ConfirmationId,
    ) -> Result<ConfirmOutcome, ConfirmTradeError> {
        let confirmation = self
            .confirmations
            .get_by_id(tenant_id, confirmation_id)
            .await
            .ok_or(ConfirmTradeError::NotFound)?;

        let now = Timestamp::now();
        match confirmation.status_as_of(now) {
            ConfirmationStatus::Confirmed => {
                return confirmation
                    .run_id
                    .clone()
                    .map(ConfirmOutcome::AlreadyConfirmed)
                    .ok_or(ConfirmTradeError::NotFound);
            }
            ConfirmationStatus::Pending => {}
            other => return Err(ConfirmTradeError::TerminalState(other)),
        }

        let run = Run::start(
            tenant_id.clone(),
            confirmation.mode.clone(),
            AssetClass::Crypto,
            confirmation.proposal_json.clone(),
            Some(confirmation_id.clone()),
            confirmation.locked_product_id.clone(),
        );
        let run_id = run.run_id.clone();
        let spawned_run = run.clone();

        self.runs.insert_run(run).await;

        self.confirmations
            .transition(
                tenant_id,
                confirmation_id,
                ConfirmationStatus::Pending,
                ConfirmationStatus::Confirmed,
                Some(run_id.clone()),
            )
            .await?;

        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            executor.execute(spawned_run).await;
        });

        Ok(ConfirmOutcome::Started(run_id))
    }
}
