//! Broker Port (Driven Port)
//!
//! The seam between the execution orchestrator and a live brokerage. The
//! Coinbase adapter under `infrastructure::broker` is the only production
//! implementor; paper-mode execution stubs this out entirely rather than
//! implementing a mock broker behind the same trait.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::asset_resolution::ExecutableBalance;
use crate::domain::order_execution::value_objects::{Fill, OrderSide, OrderStatus};
use crate::domain::shared::{BrokerId, OrderId, ProductId, RunId, Symbol};

/// Request to place a market-IOC order against the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Idempotency key; the broker must reject (or return the existing
    /// order for) a second submission carrying the same value.
    pub client_order_id: String,
    /// Product to trade, e.g. `BTC-USD`.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// `BUY` orders size by quote notional; `SELL` orders size by base
    /// quantity, per the exchange's side-aware sizing convention.
    pub size: PlaceOrderSize,
}

/// How a placed order's size is expressed, mirroring the exchange's
/// side-aware convention (quote size for buys, base size for sells).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaceOrderSize {
    /// Quote-currency (USD) notional, used for `BUY`.
    QuoteSize(Decimal),
    /// Base-asset quantity, used for `SELL`.
    BaseSize(Decimal),
}

/// Broker's acknowledgment after accepting an order for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    /// Broker-assigned order ID.
    pub broker_order_id: BrokerId,
    /// Client order ID echoed back.
    pub client_order_id: String,
    /// Status at acknowledgment time (not necessarily terminal).
    pub status: OrderStatus,
}

/// Result of a local pre-submission dry run against the broker's preview
/// endpoint. Used to surface rejections (insufficient funds, below
/// minimum size) before committing to a live order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResult {
    /// Whether the broker would accept this order as specified.
    pub would_succeed: bool,
    /// Estimated quote-currency cost, including fees.
    pub estimated_quote_cost: Option<Decimal>,
    /// Estimated taker fee.
    pub estimated_fee: Option<Decimal>,
    /// Rejection reason, if `would_succeed` is `false`.
    pub rejection_reason: Option<String>,
}

/// A row from the broker's order-history endpoint, used for read-back
/// reconciliation after polling ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    /// Broker-assigned order ID.
    pub broker_order_id: BrokerId,
    /// Client order ID, if the broker echoes it.
    pub client_order_id: Option<String>,
    /// Product traded.
    pub product_id: ProductId,
    /// Status as last reported by the broker.
    pub status: OrderStatus,
    /// Cumulative filled base-asset quantity.
    pub filled_size: Decimal,
}

/// Broker port error, mapped 1:1 onto the platform's stable error codes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// The broker rejected the order outright (`ORDER_REJECTED`).
    #[error("order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason as reported by the broker.
        reason: String,
    },

    /// The broker never reached a terminal state within the polling
    /// window (`ORDER_TIMEOUT`).
    #[error("order timed out waiting for a terminal status")]
    OrderTimeout,

    /// A non-business-logic failure from the broker API: malformed
    /// response, unexpected status code, signature failure, etc
    /// (`BROKER_API_ERROR`).
    #[error("broker API error: {message}")]
    ApiError {
        /// Error details.
        message: String,
    },

    /// The broker's rate limit was exceeded after exhausting retries
    /// (`RATE_LIMITED`).
    #[error("rate limited by broker")]
    RateLimited,

    /// API credentials are missing or malformed (`CREDENTIALS_MISSING`).
    #[error("broker credentials missing or invalid")]
    CredentialsMissing,
}

/// Driven port for Coinbase Advanced Trade order execution, balances, and
/// fills. All methods are side-effecting; nothing here is cached.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Submit an order. Implementors must check for an existing order
    /// under `client_order_id` before calling the exchange, so a retried
    /// submission is a no-op rather than a duplicate trade.
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlaceOrderResponse, BrokerError>;

    /// Fetch every executable-state balance for the account. This is the
    /// only balance source the asset resolver may consult; portfolio
    /// snapshots are never substituted in LIVE mode.
    async fn get_balances(&self) -> Result<Vec<ExecutableBalance>, BrokerError>;

    /// Fetch fills recorded against a broker order. `order_id`/`run_id` are
    /// threaded through from the caller's own records since the broker's
    /// fills endpoint knows nothing about our internal identifiers.
    async fn get_fills(
        &self,
        broker_order_id: &BrokerId,
        order_id: &OrderId,
        run_id: &RunId,
    ) -> Result<Vec<Fill>, BrokerError>;

    /// Fetch the broker's own order-history row for a broker order,
    /// treated as authoritative over any locally polled status.
    async fn get_order_history(
        &self,
        broker_order_id: &BrokerId,
    ) -> Result<OrderHistoryEntry, BrokerError>;

    /// Dry-run an order against the broker's preview endpoint without
    /// placing it.
    async fn preview_order(&self, request: &PlaceOrderRequest) -> Result<PreviewResult, BrokerError>;

    /// Fetch a best-effort display price for a product. Callers treat a
    /// failure here as "no price available" rather than fatal — it only
    /// feeds the context's display/sizing price, never balances or fills.
    async fn get_market_price(&self, product_id: &ProductId) -> Result<Decimal, BrokerError>;
}

#[async_trait]
impl<T: BrokerPort + ?Sized> BrokerPort for std::sync::Arc<T> {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlaceOrderResponse, BrokerError> {
        (**self).place_order(request).await
    }

    async fn get_balances(&self) -> Result<Vec<ExecutableBalance>, BrokerError> {
        (**self).get_balances().await
    }

    async fn get_fills(
        &self,
        broker_order_id: &BrokerId,
        order_id: &OrderId,
        run_id: &RunId,
    ) -> Result<Vec<Fill>, BrokerError> {
        (**self).get_fills(broker_order_id, order_id, run_id).await
    }

    async fn get_order_history(
        &self,
        broker_order_id: &BrokerId,
    ) -> Result<OrderHistoryEntry, BrokerError> {
        (**self).get_order_history(broker_order_id).await
    }

    async fn preview_order(&self, request: &PlaceOrderRequest) -> Result<PreviewResult, BrokerError> {
        (**self).preview_order(request).await
    }

    async fn get_market_price(&self, product_id: &ProductId) -> Result<Decimal, BrokerError> {
        (**self).get_market_price(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_order_size_variants_carry_distinct_decimals() {
        let buy = PlaceOrderSize::QuoteSize(Decimal::new(300, 2));
        let sell = PlaceOrderSize::BaseSize(Decimal::new(5, 4));
        assert_ne!(
            matches!(buy, PlaceOrderSize::QuoteSize(_)),
            matches!(sell, PlaceOrderSize::QuoteSize(_))
        );
    }

    #[test]
    fn preview_result_carries_rejection_reason_when_not_succeeding() {
        let result = PreviewResult {
            would_succeed: false,
            estimated_quote_cost: None,
            estimated_fee: None,
            rejection_reason: Some("INSUFFICIENT_CASH".to_string()),
        };
        assert!(!result.would_succeed);
        assert_eq!(result.rejection_reason.as_deref(), Some("INSUFFICIENT_CASH"));
    }
}
