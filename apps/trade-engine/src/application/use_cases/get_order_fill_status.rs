//! Get Order Fill Status Use Case
//!
//! Backs `GET /api/v1/orders/{order_id}/fill-status`. `fill_confirmed` is
//! true only when the order's own invariant holds: status is `FILLED` and
//! at least one `Fill` is attached. Anything else — including a `FILLED`
//! status with zero fills, which should never happen but must never be
//! reported as confirmed if it does — renders as "submitted, awaiting fill".

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::order_execution::value_objects::OrderStatus;
use crate::domain::shared::OrderId;

/// Fill status of a single order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillStatus {
    /// The order's current status.
    pub status: OrderStatus,
    /// Whether the order is confirmed filled (status FILLED and ≥1 fill).
    pub fill_confirmed: bool,
    /// A short human-readable summary.
    pub message: String,
}

/// Error surfaced by [`GetOrderFillStatusUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum GetOrderFillStatusError {
    /// No order exists for this id.
    #[error("order not found")]
    NotFound,
    /// Looking up the order failed.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Reports an order's fill status.
pub struct GetOrderFillStatusUseCase<O: OrderRepository> {
    orders: O,
}

impl<O: OrderRepository> GetOrderFillStatusUseCase<O> {
    /// Construct the use case over an order repository.
    pub const fn new(orders: O) -> Self {
        Self { orders }
    }

    /// Fetch `order_id`'s fill status.
    pub async fn execute(&self, order_id: &OrderId) -> Result<FillStatus, GetOrderFillStatusError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(GetOrderFillStatusError::NotFound)?;

        let fill_confirmed = order.fill_confirmed();
        let message = if fill_confirmed {
            format!("order {} filled", order_id.as_str())
        } else {
            format!("order {} submitted, awaiting fill", order_id.as_str())
        };

        Ok(FillStatus {
            status: order.status(),
            fill_confirmed,
            message,
        })
    }
}
