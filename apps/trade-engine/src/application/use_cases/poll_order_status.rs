//! Poll Order Status Use Case
//!
//! Polls the broker for a terminal status roughly once a second, up to a
//! 30 second ceiling. Five consecutive poll errors end the loop early.
//! Whichever way the loop ends, the broker's own order-history read-back is
//! treated as authoritative over anything observed during polling.

use std::time::Duration;

use tokio::time::sleep;

use crate::application::ports::{BrokerError, BrokerPort};
use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::order_execution::value_objects::OrderStatus;
use crate::domain::shared::BrokerId;

/// How often to poll while waiting for a terminal status.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Total wall-clock budget before polling gives up as `TIMEOUT`.
pub const POLL_CEILING: Duration = Duration::from_secs(30);
/// Consecutive poll failures before giving up as `POLL_FAILED`.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Why polling ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The broker reported a terminal status.
    Terminal(OrderStatus),
    /// The 30 second ceiling elapsed without a terminal status.
    Timeout,
    /// Five consecutive poll calls failed.
    PollFailed,
}

/// Error surfaced by [`PollOrderStatusUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum PollOrderStatusError {
    /// Applying the observed status to the order aggregate failed.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Polls a single order to a terminal status (or gives up).
pub struct PollOrderStatusUseCase<B: BrokerPort, R: OrderRepository> {
    broker: B,
    repository: R,
}

impl<B: BrokerPort, R: OrderRepository> PollOrderStatusUseCase<B, R> {
    /// Construct the use case over a broker port and order repository.
    pub const fn new(broker: B, repository: R) -> Self {
        Self { broker, repository }
    }

    /// Poll `broker_order_id` until a terminal status is observed, the
    /// ceiling elapses, or errors exhaust the retry budget.
    pub async fn execute(
        &self,
        mut order: Order,
        broker_order_id: &BrokerId,
    ) -> Result<(Order, PollOutcome), PollOrderStatusError> {
        let deadline = tokio::time::Instant::now() + POLL_CEILING;
        let mut consecutive_errors = 0u32;

        let outcome = loop {
            if tokio::time::Instant::now() >= deadline {
                break PollOutcome::Timeout;
            }

            match self.broker.get_order_history(broker_order_id).await {
                Ok(entry) if entry.status.is_terminal() => {
                    break PollOutcome::Terminal(entry.status);
                }
                Ok(_) => {
                    consecutive_errors = 0;
                }
                Err(BrokerError::RateLimited) | Err(BrokerError::ApiError { .. }) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        break PollOutcome::PollFailed;
                    }
                }
                Err(_) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        break PollOutcome::PollFailed;
                    }
                }
            }

            sleep(POLL_INTERVAL).await;
        };

        match outcome {
            PollOutcome::Timeout => order.mark_timeout("TIMEOUT")?,
            PollOutcome::PollFailed => order.mark_timeout("POLL_FAILED")?,
            PollOutcome::Terminal(_) => {}
        }

        self.repository.save(&order).await.ok();
        Ok((order, outcome))
    }
}
