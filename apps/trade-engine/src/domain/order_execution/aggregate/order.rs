//! Order Aggregate Root
//!
//! The Order aggregate manages the complete lifecycle of a single
//! market-IOC order placed against a broker, from submission through
//! reconciliation of its fills.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::{
    OrderAccepted, OrderCanceled, OrderEvent, OrderFilled, OrderPartiallyFilled, OrderRejected,
    OrderSubmitted,
};
use crate::domain::order_execution::value_objects::{
    CancelReason, Fill, OrderSide, OrderStatus, RejectReason,
};
use crate::domain::shared::{BrokerId, Money, OrderId, Quantity, RunId, Symbol, TenantId, Timestamp};

/// The only order type this engine places: an immediate-or-cancel market
/// order. Kept as an enum (rather than a bare string) so a future order
/// type is a non-breaking addition at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order, immediate-or-cancel.
    Market,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MARKET")
    }
}

/// How an order's size was specified by the trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSize {
    /// Sized by base-asset quantity (typical for sells).
    Quantity(Quantity),
    /// Sized by quote-currency notional (typical for buys).
    Notional(Money),
}

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Run this order belongs to.
    pub run_id: RunId,
    /// Tenant placing the order.
    pub tenant_id: TenantId,
    /// Broker provider, e.g. `"coinbase"`.
    pub provider: String,
    /// Product symbol, e.g. `"BTC-USD"`.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// How the order is sized.
    pub size: OrderSize,
    /// Idempotency key sent to the broker and used for `INSERT OR IGNORE`.
    pub client_order_id: String,
}

impl CreateOrderCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns error if required parameters are missing or invalid.
    pub fn validate(&self) -> Result<(), OrderError> {
        self.symbol
            .validate()
            .map_err(|e| OrderError::InvalidParameters {
                field: "symbol".to_string(),
                message: e.to_string(),
            })?;

        match self.size {
            OrderSize::Quantity(qty) => {
                qty.validate_for_order()
                    .map_err(|e| OrderError::InvalidParameters {
                        field: "qty".to_string(),
                        message: e.to_string(),
                    })?;
            }
            OrderSize::Notional(notional) => {
                notional
                    .validate_for_order()
                    .map_err(|e| OrderError::InvalidParameters {
                        field: "notional_usd".to_string(),
                        message: e.to_string(),
                    })?;
            }
        }

        if self.client_order_id.is_empty() {
            return Err(OrderError::InvalidParameters {
                field: "client_order_id".to_string(),
                message: "client_order_id must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Fields needed to reconstitute an `Order` from a persisted row, without
/// generating domain events.
#[derive(Debug, Clone)]
pub struct ReconstitutedOrderParams {
    /// Order ID.
    pub id: OrderId,
    /// Run this order belongs to.
    pub run_id: RunId,
    /// Tenant placing the order.
    pub tenant_id: TenantId,
    /// Broker provider.
    pub provider: String,
    /// Product symbol.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Order type (always market-IOC today).
    pub order_type: OrderType,
    /// Base-asset quantity, when known.
    pub qty: Option<Quantity>,
    /// Quote-currency notional.
    pub notional_usd: Money,
    /// Current status.
    pub status: OrderStatus,
    /// Client order ID.
    pub client_order_id: String,
    /// Broker-side order ID, once accepted.
    pub broker_order_id: Option<BrokerId>,
    /// Cumulative filled quantity.
    pub filled_qty: Quantity,
    /// Volume-weighted average fill price.
    pub avg_fill_price: Money,
    /// Total fees across all fills.
    pub total_fees: Money,
    /// Human-readable status detail (e.g. `"POLL_FAILED"`).
    pub status_reason: Option<String>,
    /// When the order was created.
    pub created_at: Timestamp,
    /// When the status last changed.
    pub status_updated_at: Timestamp,
}

/// Order Aggregate Root.
///
/// An order is reported as filled to the user only when `status == Filled`
/// **and** at least one fill has been recorded; any other status with
/// `filled_qty == 0` renders as "submitted, awaiting fill".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    run_id: RunId,
    tenant_id: TenantId,
    provider: String,
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    qty: Option<Quantity>,
    notional_usd: Money,
    status: OrderStatus,
    client_order_id: String,
    broker_order_id: Option<BrokerId>,
    filled_qty: Quantity,
    avg_fill_price: Money,
    total_fees: Money,
    status_reason: Option<String>,
    fills: Vec<Fill>,
    #[serde(skip)]
    events: Vec<OrderEvent>,
    created_at: Timestamp,
    status_updated_at: Timestamp,
}

impl Order {
    /// Create a new order from a command.
    ///
    /// Generates an `OrderSubmitted` event.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn new(cmd: CreateOrderCommand) -> Result<Self, OrderError> {
        cmd.validate()?;

        let id = OrderId::generate();
        let now = Timestamp::now();

        let (qty, notional_usd) = match cmd.size {
            OrderSize::Quantity(qty) => (Some(qty), Money::ZERO),
            OrderSize::Notional(notional) => (None, notional),
        };

        let mut order = Self {
            id: id.clone(),
            run_id: cmd.run_id.clone(),
            tenant_id: cmd.tenant_id,
            provider: cmd.provider,
            symbol: cmd.symbol.clone(),
            side: cmd.side,
            order_type: OrderType::Market,
            qty,
            notional_usd,
            status: OrderStatus::Submitted,
            client_order_id: cmd.client_order_id,
            broker_order_id: None,
            filled_qty: Quantity::ZERO,
            avg_fill_price: Money::ZERO,
            total_fees: Money::ZERO,
            status_reason: None,
            fills: Vec::new(),
            events: Vec::new(),
            created_at: now,
            status_updated_at: now,
        };

        order.events.push(OrderEvent::Submitted(OrderSubmitted {
            order_id: id,
            run_id: cmd.run_id,
            symbol: cmd.symbol,
            side: cmd.side,
            quantity: qty,
            occurred_at: now,
        }));

        Ok(order)
    }

    /// Reconstitute an order from stored state (no events generated).
    #[must_use]
    pub fn reconstitute(params: ReconstitutedOrderParams) -> Self {
        Self {
            id: params.id,
            run_id: params.run_id,
            tenant_id: params.tenant_id,
            provider: params.provider,
            symbol: params.symbol,
            side: params.side,
            order_type: params.order_type,
            qty: params.qty,
            notional_usd: params.notional_usd,
            status: params.status,
            client_order_id: params.client_order_id,
            broker_order_id: params.broker_order_id,
            filled_qty: params.filled_qty,
            avg_fill_price: params.avg_fill_price,
            total_fees: params.total_fees,
            status_reason: params.status_reason,
            fills: Vec::new(),
            events: Vec::new(),
            created_at: params.created_at,
            status_updated_at: params.status_updated_at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the owning run.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Get the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Get the broker provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Get the symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the requested base-asset quantity, if sized by quantity.
    #[must_use]
    pub fn qty(&self) -> Option<Quantity> {
        self.qty
    }

    /// Get the requested quote-currency notional.
    #[must_use]
    pub fn notional_usd(&self) -> Money {
        self.notional_usd
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the client order ID (idempotency key).
    #[must_use]
    pub fn client_order_id(&self) -> &str {
        &self.client_order_id
    }

    /// Get the broker order ID.
    #[must_use]
    pub fn broker_order_id(&self) -> Option<&BrokerId> {
        self.broker_order_id.as_ref()
    }

    /// Get the cumulative filled quantity.
    #[must_use]
    pub fn filled_qty(&self) -> Quantity {
        self.filled_qty
    }

    /// Get the volume-weighted average fill price.
    #[must_use]
    pub fn avg_fill_price(&self) -> Money {
        self.avg_fill_price
    }

    /// Get the total fees paid across all fills.
    #[must_use]
    pub fn total_fees(&self) -> Money {
        self.total_fees
    }

    /// Get the human-readable status detail, if any.
    #[must_use]
    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    /// Get the fills recorded against this order.
    #[must_use]
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// True only when the order is reported as filled to the user:
    /// `status == Filled` **and** at least one fill is attached.
    #[must_use]
    pub fn fill_confirmed(&self) -> bool {
        self.status == OrderStatus::Filled && !self.fills.is_empty()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last status-change timestamp.
    #[must_use]
    pub const fn status_updated_at(&self) -> Timestamp {
        self.status_updated_at
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Mark the order as accepted/opened by the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the transition from the current status is illegal.
    pub fn accept(&mut self, broker_id: BrokerId, status: OrderStatus) -> Result<(), OrderError> {
        self.ensure_can_transition_to(status)?;

        self.broker_order_id = Some(broker_id.clone());
        self.set_status(status);

        self.events.push(OrderEvent::Accepted(OrderAccepted {
            order_id: self.id.clone(),
            broker_order_id: broker_id,
            occurred_at: self.status_updated_at,
        }));

        Ok(())
    }

    /// Apply a reconciled fill to the order.
    ///
    /// Updates `filled_qty`, `avg_fill_price` (VWAP), and `total_fees`, and
    /// transitions to `PartiallyFilled` or `Filled`.
    ///
    /// # Errors
    ///
    /// Returns error if the order cannot receive fills or the fill would
    /// exceed the requested quantity.
    pub fn apply_fill(&mut self, fill: Fill, target_qty: Quantity) -> Result<(), OrderError> {
        if !self.status.can_fill() {
            return Err(OrderError::CannotFill {
                status: self.status,
            });
        }

        let new_filled = self.filled_qty + fill.size;
        if new_filled > target_qty {
            return Err(OrderError::FillExceedsRemaining {
                fill_qty: fill.size.to_string(),
                remaining_qty: (target_qty - self.filled_qty).to_string(),
            });
        }

        let old_value = self.avg_fill_price.amount() * self.filled_qty.amount();
        let fill_value = fill.price.amount() * fill.size.amount();
        if !new_filled.is_zero() {
            self.avg_fill_price = Money::new((old_value + fill_value) / new_filled.amount());
        }
        self.filled_qty = new_filled;
        self.total_fees = self.total_fees + fill.fee;
        self.fills.push(fill);

        let now = Timestamp::now();
        self.status = if self.filled_qty >= target_qty {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.status_updated_at = now;

        self.events
            .push(OrderEvent::PartiallyFilled(OrderPartiallyFilled {
                order_id: self.id.clone(),
                fill_quantity: self.fills.last().expect("just pushed").size,
                fill_price: self.fills.last().expect("just pushed").price,
                cumulative_quantity: self.filled_qty,
                avg_fill_price: self.avg_fill_price,
                occurred_at: now,
            }));

        if self.status == OrderStatus::Filled {
            self.events.push(OrderEvent::Filled(OrderFilled {
                order_id: self.id.clone(),
                total_quantity: self.filled_qty,
                average_price: self.avg_fill_price,
                occurred_at: now,
            }));
        }

        Ok(())
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns error if the order cannot be canceled from its current status.
    pub fn cancel(&mut self, reason: CancelReason) -> Result<(), OrderError> {
        if !self.status.is_cancelable() {
            return Err(OrderError::CannotCancel {
                status: self.status,
            });
        }

        let filled_qty = self.filled_qty;
        self.set_status(OrderStatus::Canceled);
        self.status_reason = Some(reason.code.clone());

        self.events.push(OrderEvent::Canceled(OrderCanceled {
            order_id: self.id.clone(),
            reason,
            filled_quantity: filled_qty,
            occurred_at: self.status_updated_at,
        }));

        Ok(())
    }

    /// Reject the order.
    ///
    /// # Errors
    ///
    /// Returns error if the order has already left a rejectable status.
    pub fn reject(&mut self, reason: RejectReason) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Rejected,
                reason: "order already reached a terminal status".to_string(),
            });
        }

        self.status_reason = Some(reason.code.clone());
        self.set_status(OrderStatus::Rejected);

        self.events.push(OrderEvent::Rejected(OrderRejected {
            order_id: self.id.clone(),
            reason,
            occurred_at: self.status_updated_at,
        }));

        Ok(())
    }

    /// Mark the order as expired without filling.
    ///
    /// # Errors
    ///
    /// Returns error if the order is already in a terminal status.
    pub fn expire(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Expired,
                reason: "cannot expire a terminal order".to_string(),
            });
        }

        self.set_status(OrderStatus::Expired);

        self.events.push(OrderEvent::Canceled(OrderCanceled {
            order_id: self.id.clone(),
            reason: CancelReason::new("EXPIRED", "Order expired without filling"),
            filled_quantity: self.filled_qty,
            occurred_at: self.status_updated_at,
        }));

        Ok(())
    }

    /// Stop polling without having observed a terminal broker status.
    ///
    /// Used after five consecutive polling errors, or when the run's
    /// execution timeout fires first. Leaves `filled_qty`/`fills` untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the order is already in a terminal status.
    pub fn mark_timeout(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Timeout,
                reason: "cannot time out a terminal order".to_string(),
            });
        }

        self.status_reason = Some(reason.into());
        self.set_status(OrderStatus::Timeout);
        Ok(())
    }

    /// Mark the order as failed (broker placement or reconciliation error
    /// that isn't a broker-level rejection).
    ///
    /// # Errors
    ///
    /// Returns error if the order is already in a terminal status.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Failed,
                reason: "cannot fail a terminal order".to_string(),
            });
        }

        self.status_reason = Some(reason.into());
        self.set_status(OrderStatus::Failed);
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Drain accumulated domain events.
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get pending events without draining.
    #[must_use]
    pub fn pending_events(&self) -> &[OrderEvent] {
        &self.events
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.status_updated_at = Timestamp::now();
    }

    fn ensure_can_transition_to(&self, target: OrderStatus) -> Result<(), OrderError> {
        use OrderStatus::{Canceled, Failed, Open, Pending, PendingFill, Rejected, Submitted};

        let valid = matches!(
            (self.status, target),
            (Submitted, Open)
                | (Submitted, Pending)
                | (Submitted, PendingFill)
                | (Submitted, Rejected)
                | (Submitted, Canceled)
                | (Submitted, Failed)
                | (Pending, Open)
                | (Pending, PendingFill)
                | (Pending, Rejected)
                | (Pending, Canceled)
        );

        if valid {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: target,
                reason: "illegal broker-acknowledgment transition".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::value_objects::LiquidityIndicator;
    use crate::domain::shared::FillId;

    fn make_create_command() -> CreateOrderCommand {
        CreateOrderCommand {
            run_id: RunId::new("run-1"),
            tenant_id: TenantId::new("tenant-1"),
            provider: "coinbase".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Buy,
            size: OrderSize::Notional(Money::usd(3.0)),
            client_order_id: "coid-1".to_string(),
        }
    }

    fn make_fill(order_id: &OrderId, qty_cents: i64, price: f64) -> Fill {
        use rust_decimal::Decimal;
        Fill {
            fill_id: FillId::generate(),
            order_id: order_id.clone(),
            run_id: RunId::new("run-1"),
            product_id: crate::domain::shared::ProductId::new("BTC-USD"),
            price: Money::usd(price),
            size: Quantity::new(Decimal::new(qty_cents, 4)),
            fee: Money::usd(0.01),
            trade_id: format!("trade-{qty_cents}"),
            liquidity_indicator: LiquidityIndicator::Taker,
            filled_at: Timestamp::now(),
        }
    }

    #[test]
    fn new_generates_submitted_event_and_starts_submitted() {
        let order = Order::new(make_create_command()).unwrap();

        assert_eq!(order.status(), OrderStatus::Submitted);
        assert_eq!(order.pending_events().len(), 1);
        assert!(matches!(
            order.pending_events()[0],
            OrderEvent::Submitted(_)
        ));
    }

    #[test]
    fn validation_fails_for_empty_client_order_id() {
        let mut cmd = make_create_command();
        cmd.client_order_id = String::new();

        assert!(Order::new(cmd).is_err());
    }

    #[test]
    fn accept_transitions_to_open() {
        let mut order = Order::new(make_create_command()).unwrap();
        order.drain_events();

        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Open);
        assert_eq!(order.broker_order_id().unwrap().as_str(), "broker-123");
        assert!(matches!(order.pending_events()[0], OrderEvent::Accepted(_)));
    }

    #[test]
    fn accept_fails_once_already_open() {
        let mut order = Order::new(make_create_command()).unwrap();
        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();

        let result = order.accept(BrokerId::new("another"), OrderStatus::Open);
        assert!(result.is_err());
    }

    #[test]
    fn apply_fill_partial_then_complete_tracks_vwap_and_fees() {
        let mut order = Order::new(make_create_command()).unwrap();
        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();
        order.drain_events();

        let id = order.id().clone();
        let target = Quantity::from_i64(1);

        order
            .apply_fill(make_fill(&id, 5_000, 65_000.0), target)
            .unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        assert!(!order.fill_confirmed());

        order
            .apply_fill(make_fill(&id, 5_000, 66_000.0), target)
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert!(order.fill_confirmed());
        assert_eq!(order.total_fees(), Money::usd(0.02));
    }

    #[test]
    fn apply_fill_exceeding_target_is_rejected() {
        let mut order = Order::new(make_create_command()).unwrap();
        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();
        let id = order.id().clone();

        let result = order.apply_fill(make_fill(&id, 20_000, 65_000.0), Quantity::from_i64(1));
        assert!(result.is_err());
    }

    #[test]
    fn cancel_from_open_preserves_partial_fill() {
        let mut order = Order::new(make_create_command()).unwrap();
        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();
        let id = order.id().clone();
        order
            .apply_fill(make_fill(&id, 5_000, 65_000.0), Quantity::from_i64(1))
            .unwrap();
        order.drain_events();

        order.cancel(CancelReason::order_timeout()).unwrap();

        assert_eq!(order.status(), OrderStatus::Canceled);
        assert_eq!(order.filled_qty(), Quantity::new(rust_decimal::Decimal::new(5_000, 4)));
    }

    #[test]
    fn cancel_fails_once_filled() {
        let mut order = Order::new(make_create_command()).unwrap();
        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();
        let id = order.id().clone();
        order
            .apply_fill(make_fill(&id, 10_000, 65_000.0), Quantity::from_i64(1))
            .unwrap();

        assert!(order.cancel(CancelReason::user_requested()).is_err());
    }

    #[test]
    fn reject_before_broker_ack() {
        let mut order = Order::new(make_create_command()).unwrap();
        order.drain_events();

        order
            .reject(RejectReason::broker_api_error("503"))
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Rejected);
        assert!(matches!(order.pending_events()[0], OrderEvent::Rejected(_)));
    }

    #[test]
    fn mark_timeout_stops_polling_without_altering_fills() {
        let mut order = Order::new(make_create_command()).unwrap();
        order
            .accept(BrokerId::new("broker-123"), OrderStatus::Open)
            .unwrap();

        order.mark_timeout("POLL_FAILED").unwrap();

        assert_eq!(order.status(), OrderStatus::Timeout);
        assert_eq!(order.status_reason(), Some("POLL_FAILED"));
    }

    #[test]
    fn mark_failed_is_terminal() {
        let mut order = Order::new(make_create_command()).unwrap();
        order.mark_failed("broker unreachable").unwrap();

        assert_eq!(order.status(), OrderStatus::Failed);
        assert!(order.mark_failed("again").is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let order = Order::new(make_create_command()).unwrap();

        let json = serde_json::to_string(&order).unwrap();
        let parsed: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id(), order.id());
        assert_eq!(parsed.symbol(), order.symbol());
        assert_eq!(parsed.status(), order.status());
    }
}
