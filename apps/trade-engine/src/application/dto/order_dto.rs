//! Order DTOs

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::{Order, OrderSize, OrderType};
use crate::domain::order_execution::value_objects::{Fill, OrderSide, OrderStatus};
use crate::domain::shared::Timestamp;

/// DTO representing a single reconciled fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillDto {
    /// Fill ID.
    pub fill_id: String,
    /// Product the fill occurred on.
    pub product_id: String,
    /// Fill price.
    pub price: String,
    /// Fill size.
    pub size: String,
    /// Fee charged on this fill.
    pub fee: String,
    /// Broker trade ID.
    pub trade_id: String,
    /// Maker/taker/unknown.
    pub liquidity_indicator: String,
    /// When the fill was reported.
    pub filled_at: Timestamp,
}

impl FillDto {
    /// Build from a domain Fill.
    #[must_use]
    pub fn from_fill(fill: &Fill) -> Self {
        Self {
            fill_id: fill.fill_id.to_string(),
            product_id: fill.product_id.to_string(),
            price: fill.price.to_string(),
            size: fill.size.to_string(),
            fee: fill.fee.to_string(),
            trade_id: fill.trade_id.clone(),
            liquidity_indicator: fill.liquidity_indicator.to_string(),
            filled_at: fill.filled_at,
        }
    }
}

/// DTO representing an order, shaped for the fill-status endpoint and
/// confirmation-cancel responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDto {
    /// Internal order ID.
    pub order_id: String,
    /// The run this order belongs to.
    pub run_id: String,
    /// Broker-assigned order ID, once acknowledged.
    pub broker_order_id: Option<String>,
    /// Tenant that owns the run.
    pub tenant_id: String,
    /// Broker/provider name, e.g. "coinbase".
    pub provider: String,
    /// Normalized trading symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Always MARKET; IOC semantics are implicit.
    pub order_type: OrderType,
    /// Requested quantity, if the order was sized by quantity.
    pub qty: Option<String>,
    /// Requested notional in USD, if the order was sized by notional.
    pub notional_usd: String,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Client-supplied idempotency key.
    pub client_order_id: String,
    /// Cumulative filled quantity folded from reconciled fills.
    pub filled_qty: String,
    /// Volume-weighted average fill price.
    pub avg_fill_price: String,
    /// Cumulative fees across all fills.
    pub total_fees: String,
    /// Whether this order is reported as filled to the user: `status ==
    /// FILLED` and at least one Fill row is attached.
    pub fill_confirmed: bool,
    /// Reconciled fills.
    pub fills: Vec<FillDto>,
    /// Human-readable reason for the current status, if any.
    pub status_reason: Option<String>,
    /// When the order was created.
    pub created_at: Timestamp,
    /// When the status last changed.
    pub status_updated_at: Timestamp,
}

impl OrderDto {
    /// Build from a domain Order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            run_id: order.run_id().to_string(),
            broker_order_id: order.broker_order_id().map(ToString::to_string),
            tenant_id: order.tenant_id().to_string(),
            provider: order.provider().to_string(),
            symbol: order.symbol().to_string(),
            side: order.side(),
            order_type: order.order_type(),
            qty: order.qty().map(|q| q.to_string()),
            notional_usd: order.notional_usd().to_string(),
            status: order.status(),
            client_order_id: order.client_order_id().to_string(),
            filled_qty: order.filled_qty().to_string(),
            avg_fill_price: order.avg_fill_price().to_string(),
            total_fees: order.total_fees().to_string(),
            fill_confirmed: order.fill_confirmed(),
            fills: order.fills().iter().map(FillDto::from_fill).collect(),
            status_reason: order.status_reason().map(ToString::to_string),
            created_at: order.created_at(),
            status_updated_at: order.status_updated_at(),
        }
    }
}

/// Response DTO for the fill-status endpoint (`GET
/// /api/v1/orders/{order_id}/fill-status`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillStatusResponseDto {
    /// The order.
    pub order: OrderDto,
}

/// `OrderSize` as received over the wire: exactly one of the two variants is
/// populated by the caller, per the order's side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OrderSizeDto {
    /// Sized by asset quantity (typical for sells).
    Quantity(rust_decimal::Decimal),
    /// Sized by USD notional (typical for buys).
    Notional(rust_decimal::Decimal),
}

impl OrderSizeDto {
    /// Convert to the domain `OrderSize`.
    #[must_use]
    pub fn to_domain(self) -> OrderSize {
        match self {
            Self::Quantity(amount) => {
                OrderSize::Quantity(crate::domain::shared::Quantity::new(amount))
            }
            Self::Notional(amount) => {
                OrderSize::Notional(crate::domain::shared::Money::new(amount))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::aggregate::CreateOrderCommand;
    use crate::domain::shared::{Money, RunId, Symbol, TenantId};

    fn make_order() -> Order {
        Order::new(CreateOrderCommand {
            run_id: RunId::new("run-1"),
            tenant_id: TenantId::new("tenant-1"),
            provider: "coinbase".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Buy,
            size: OrderSize::Notional(Money::usd(25.0)),
            client_order_id: "coid-1".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn from_order_reports_unconfirmed_fill_before_any_fill() {
        let order = make_order();
        let dto = OrderDto::from_order(&order);
        assert!(!dto.fill_confirmed);
        assert_eq!(dto.status, OrderStatus::Submitted);
        assert!(dto.fills.is_empty());
    }

    #[test]
    fn order_size_dto_quantity_converts_to_domain() {
        let dto = OrderSizeDto::Quantity(rust_decimal::Decimal::new(100, 0));
        match dto.to_domain() {
            OrderSize::Quantity(q) => assert_eq!(q.amount(), rust_decimal::Decimal::new(100, 0)),
            OrderSize::Notional(_) => panic!("expected quantity"),
        }
    }
}
