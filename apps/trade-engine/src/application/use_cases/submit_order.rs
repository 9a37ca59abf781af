//! Submit Order Use Case
//!
//! The execution node's order-placement step: checks for an existing order
//! under the idempotency key before calling the broker, converts a
//! USD-notional sell into a base-asset quantity, enforces the defensive
//! minimum-notional floor, and persists whatever the broker returns before
//! control returns to the caller.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{
    BrokerError, BrokerPort, PlaceOrderRequest, PlaceOrderSize,
};
use crate::domain::order_execution::aggregate::{CreateOrderCommand, Order, OrderSize};
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::preflight::MIN_NOTIONAL_FLOOR_USD;
use crate::domain::shared::{RunId, Symbol, TenantId};

/// Error surfaced by [`SubmitOrderUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitOrderError {
    /// The requested notional is below the defensive floor.
    #[error("order notional ${0} is below the minimum of ${1}")]
    BelowMinNotional(Decimal, Decimal),
    /// A notional-sized sell was requested but no market price was supplied
    /// to convert it into a base-asset quantity.
    #[error("no market price available to size this sell order")]
    MissingPrice,
    /// The converted base-asset quantity falls below the product's
    /// `base_min_size`.
    #[error("order size {0} is below the exchange minimum of {1}")]
    BelowMinimumSize(Decimal, Decimal),
    /// Order aggregate construction/validation failed.
    #[error(transparent)]
    Order(#[from] OrderError),
    /// The broker rejected placement or the call itself failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Request to submit a single market order.
pub struct SubmitOrderCommand {
    /// Run this order belongs to.
    pub run_id: RunId,
    /// This order's position among the run's actions. Combined with
    /// `run_id`, this is the order's idempotency key — stable across
    /// retries of the same run, unlike a freshly minted random id.
    pub action_index: usize,
    /// Tenant placing the order.
    pub tenant_id: TenantId,
    /// Broker provider, e.g. `"coinbase"`.
    pub provider: String,
    /// Product symbol.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// How the order is sized.
    pub size: OrderSize,
    /// Market price, required to convert a notional-sized sell into a base
    /// quantity. Buys pass their notional straight through and don't need it.
    pub price: Option<Decimal>,
    /// The product's base-asset size increment, for rounding a converted
    /// sell quantity down to a tradable size.
    pub base_increment: Option<Decimal>,
    /// The product's minimum tradable base-asset size.
    pub base_min_size: Option<Decimal>,
}

/// Dust tolerance subtracted before flooring to `base_increment`, so a
/// quantity that lands exactly on an increment boundary isn't rounded down
/// an extra step by floating-point-like rounding noise in the division.
const SIZE_EPSILON: Decimal = dec!(0.00000001);

/// Convert a USD-notional sell into a tradable base-asset quantity:
/// `amount_usd / price`, floored to `base_increment`, validated against
/// `base_min_size`.
fn convert_notional_sell_to_base_size(
    amount_usd: Decimal,
    price: Decimal,
    base_increment: Decimal,
    base_min_size: Decimal,
) -> Result<Decimal, SubmitOrderError> {
    let raw_base_size = amount_usd / price;
    let base_size = if base_increment > Decimal::ZERO {
        ((raw_base_size - SIZE_EPSILON) / base_increment).floor() * base_increment
    } else {
        raw_base_size
    };

    if base_size <= Decimal::ZERO || base_size < base_min_size {
        return Err(SubmitOrderError::BelowMinimumSize(base_size, base_min_size));
    }

    Ok(base_size)
}

/// Places a single market order, idempotently, against the broker.
pub struct SubmitOrderUseCase<B: BrokerPort, R: OrderRepository> {
    broker: B,
    repository: R,
}

impl<B: BrokerPort, R: OrderRepository> SubmitOrderUseCase<B, R> {
    /// Construct the use case over a broker port and order repository.
    pub const fn new(broker: B, repository: R) -> Self {
        Self { broker, repository }
    }

    /// Submit an order. `client_order_id` is derived deterministically from
    /// `run_id` and `action_index`, so a retried submission for the same
    /// run action is a no-op rather than a duplicate trade.
    pub async fn execute(&self, cmd: SubmitOrderCommand) -> Result<Order, SubmitOrderError> {
        let notional = match cmd.size {
            OrderSize::Notional(money) => money.amount(),
            OrderSize::Quantity(_) => Decimal::ZERO,
        };
        if matches!(cmd.size, OrderSize::Notional(_)) && notional < MIN_NOTIONAL_FLOOR_USD {
            return Err(SubmitOrderError::BelowMinNotional(notional, MIN_NOTIONAL_FLOOR_USD));
        }

        let client_order_id = format!("{}-{}", cmd.run_id.as_str(), cmd.action_index);

        if let Some(existing) = self
            .repository
            .find_by_client_order_id(&client_order_id)
            .await?
        {
            return Ok(existing);
        }

        let size = match cmd.side {
            OrderSide::Buy => PlaceOrderSize::QuoteSize(notional),
            OrderSide::Sell => match cmd.size {
                OrderSize::Quantity(qty) => PlaceOrderSize::BaseSize(qty.amount()),
                OrderSize::Notional(money) => {
                    let price = cmd.price.ok_or(SubmitOrderError::MissingPrice)?;
                    let base_size = convert_notional_sell_to_base_size(
                        money.amount(),
                        price,
                        cmd.base_increment.unwrap_or(Decimal::ZERO),
                        cmd.base_min_size.unwrap_or(Decimal::ZERO),
                    )?;
                    PlaceOrderSize::BaseSize(base_size)
                }
            },
        };

        let mut order = Order::new(CreateOrderCommand {
            run_id: cmd.run_id,
            tenant_id: cmd.tenant_id,
            provider: cmd.provider,
            symbol: cmd.symbol.clone(),
            side: cmd.side,
            size: cmd.size,
            client_order_id: client_order_id.clone(),
        })?;

        let placed = self
            .broker
            .place_order(PlaceOrderRequest {
                client_order_id,
                symbol: cmd.symbol,
                side: cmd.side,
                size,
            })
            .await?;

        order.accept(placed.broker_order_id, placed.status)?;
        self.repository.save(&order).await?;

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        OrderHistoryEntry, PreviewResult,
    };
    use crate::domain::asset_resolution::ExecutableBalance;
    use crate::domain::order_execution::value_objects::{Fill, OrderStatus};
    use crate::domain::shared::{BrokerId, Money, ProductId};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubBroker {
        status: OrderStatus,
    }

    #[async_trait]
    impl BrokerPort for StubBroker {
        async fn place_order(
            &self,
            request: PlaceOrderRequest,
        ) -> Result<crate::application::ports::PlaceOrderResponse, BrokerError> {
            Ok(crate::application::ports::PlaceOrderResponse {
                broker_order_id: BrokerId::generate(),
                client_order_id: request.client_order_id,
                status: self.status,
            })
        }

        async fn get_balances(&self) -> Result<Vec<ExecutableBalance>, BrokerError> {
            Ok(vec![])
        }

        async fn get_fills(
            &self,
            _broker_order_id: &BrokerId,
            _order_id: &crate::domain::shared::OrderId,
            _run_id: &RunId,
        ) -> Result<Vec<Fill>, BrokerError> {
            Ok(vec![])
        }

        async fn get_order_history(
            &self,
            broker_order_id: &BrokerId,
        ) -> Result<OrderHistoryEntry, BrokerError> {
            Ok(OrderHistoryEntry {
                broker_order_id: broker_order_id.clone(),
                client_order_id: None,
                product_id: ProductId::new("BTC-USD"),
                status: self.status,
                filled_size: Decimal::ZERO,
            })
        }

        async fn preview_order(
            &self,
            _request: &PlaceOrderRequest,
        ) -> Result<PreviewResult, BrokerError> {
            Ok(PreviewResult {
                would_succeed: true,
                estimated_quote_cost: None,
                estimated_fee: None,
                rejection_reason: None,
            })
        }

        async fn get_market_price(&self, _product_id: &ProductId) -> Result<Decimal, BrokerError> {
            unreachable!("not exercised by submit_order tests")
        }
    }

    struct StubRepository {
        orders: Mutex<Vec<Order>>,
    }

    impl StubRepository {
        fn new() -> Self {
            Self {
                orders: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OrderRepository for StubRepository {
        async fn save(&self, order: &Order) -> Result<(), OrderError> {
            self.orders.lock().unwrap().push(order.clone());
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: &crate::domain::shared::OrderId,
        ) -> Result<Option<Order>, OrderError> {
            Ok(self.orders.lock().unwrap().iter().find(|o| o.id() == id).cloned())
        }

        async fn find_by_client_order_id(
            &self,
            client_order_id: &str,
        ) -> Result<Option<Order>, OrderError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.client_order_id() == client_order_id)
                .cloned())
        }

        async fn find_by_broker_id(
            &self,
            broker_id: &BrokerId,
        ) -> Result<Option<Order>, OrderError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.broker_order_id() == Some(broker_id))
                .cloned())
        }

        async fn find_by_run(
            &self,
            run_id: &RunId,
        ) -> Result<Vec<Order>, OrderError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.run_id() == run_id)
                .cloned()
                .collect())
        }

        async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.status() == status)
                .cloned()
                .collect())
        }

        async fn find_active(&self) -> Result<Vec<Order>, OrderError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.status().is_active())
                .cloned()
                .collect())
        }
    }

    fn buy_command() -> SubmitOrderCommand {
        SubmitOrderCommand {
            run_id: RunId::new("run-1"),
            action_index: 0,
            tenant_id: TenantId::new("tenant-1"),
            provider: "coinbase".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Buy,
            size: OrderSize::Notional(Money::usd(3.0)),
            price: None,
            base_increment: None,
            base_min_size: None,
        }
    }

    #[tokio::test]
    async fn submits_and_persists_an_order() {
        let use_case = SubmitOrderUseCase::new(
            StubBroker {
                status: OrderStatus::Open,
            },
            StubRepository::new(),
        );
        let order = use_case.execute(buy_command()).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Open);
        assert!(order.broker_order_id().is_some());
    }

    #[tokio::test]
    async fn rejects_notional_below_the_defensive_floor() {
        let use_case = SubmitOrderUseCase::new(
            StubBroker {
                status: OrderStatus::Open,
            },
            StubRepository::new(),
        );
        let mut cmd = buy_command();
        cmd.size = OrderSize::Notional(Money::usd(0.10));
        let result = use_case.execute(cmd).await;
        assert!(matches!(result, Err(SubmitOrderError::BelowMinNotional(_, _))));
    }

    #[tokio::test]
    async fn a_retried_submission_for_the_same_run_action_is_a_no_op() {
        let use_case = SubmitOrderUseCase::new(
            StubBroker {
                status: OrderStatus::Open,
            },
            StubRepository::new(),
        );
        let first = use_case.execute(buy_command()).await.unwrap();
        let second = use_case.execute(buy_command()).await.unwrap();
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn converts_notional_sell_to_a_floored_base_size() {
        // 100 / 50000 = 0.002 exactly; flooring against the epsilon steps
        // it down to the preceding 0.0001 increment rather than rounding
        // back up to the boundary it already sits on.
        let base_size = convert_notional_sell_to_base_size(
            Decimal::new(100, 0),
            Decimal::new(50000, 0),
            Decimal::new(1, 4),
            Decimal::new(1, 5),
        )
        .unwrap();
        assert_eq!(base_size, Decimal::new(19, 4));
    }

    #[test]
    fn converted_sell_below_base_min_size_is_rejected() {
        let result = convert_notional_sell_to_base_size(
            Decimal::new(1, 0),
            Decimal::new(50000, 0),
            Decimal::new(1, 8),
            Decimal::new(1, 5),
        );
        assert!(matches!(result, Err(SubmitOrderError::BelowMinimumSize(_, _))));
    }

    #[tokio::test]
    async fn sell_notional_is_converted_to_base_quantity_before_submission() {
        let use_case = SubmitOrderUseCase::new(
            StubBroker {
                status: OrderStatus::Open,
            },
            StubRepository::new(),
        );
        let cmd = SubmitOrderCommand {
            run_id: RunId::new("run-1"),
            action_index: 0,
            tenant_id: TenantId::new("tenant-1"),
            provider: "coinbase".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Sell,
            size: OrderSize::Notional(Money::usd(100.0)),
            price: Some(Decimal::new(50000, 0)),
            base_increment: Some(Decimal::new(1, 4)),
            base_min_size: Some(Decimal::new(1, 5)),
        };
        let order = use_case.execute(cmd).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Open);
    }

    #[tokio::test]
    async fn sell_notional_without_a_price_is_rejected() {
        let use_case = SubmitOrderUseCase::new(
            StubBroker {
                status: OrderStatus::Open,
            },
            StubRepository::new(),
        );
        let cmd = SubmitOrderCommand {
            run_id: RunId::new("run-1"),
            action_index: 0,
            tenant_id: TenantId::new("tenant-1"),
            provider: "coinbase".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Sell,
            size: OrderSize::Notional(Money::usd(100.0)),
            price: None,
            base_increment: None,
            base_min_size: None,
        };
        let result = use_case.execute(cmd).await;
        assert!(matches!(result, Err(SubmitOrderError::MissingPrice)));
    }
}
