//! Coinbase Advanced Trade API request and response shapes.
//!
//! These map directly to the wire contract: `POST /orders`, `GET
//! /orders/historical/{id}`, `GET /orders/historical/fills`, `GET
//! /products/{id}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::value_objects::{LiquidityIndicator, OrderStatus};

/// `POST /orders` request body.
#[derive(Debug, Clone, Serialize)]
pub struct CoinbaseOrderRequest {
    /// Product traded, e.g. `BTC-USD`.
    pub product_id: String,
    /// `BUY` or `SELL`.
    pub side: String,
    /// Market-IOC sizing configuration.
    pub order_configuration: OrderConfiguration,
    /// Idempotency key the exchange deduplicates on.
    pub client_order_id: String,
}

/// Order sizing configuration. Only the market-IOC shape is used; the
/// platform never places limit orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderConfiguration {
    /// Market, immediate-or-cancel order parameters.
    pub market_market_ioc: MarketMarketIoc,
}

/// Exactly one of `quote_size`/`base_size` is populated, per side.
#[derive(Debug, Clone, Serialize)]
pub struct MarketMarketIoc {
    /// USD notional, used for `BUY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_size: Option<String>,
    /// Base-asset quantity, used for `SELL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_size: Option<String>,
}

/// `POST /orders` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseSubmitResponse {
    /// Whether the order was accepted.
    pub success: bool,
    /// Present when `success` is true.
    #[serde(default)]
    pub success_response: Option<CoinbaseSuccessResponse>,
    /// Present when `success` is false.
    #[serde(default)]
    pub error_response: Option<CoinbaseErrorResponse>,
}

/// Broker-assigned order identifier on successful submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseSuccessResponse {
    /// Broker order ID.
    pub order_id: String,
}

/// Rejection detail on unsuccessful submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseErrorResponse {
    /// Machine-readable error.
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /orders/historical/{id}` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseOrderHistoryResponse {
    /// The order row.
    pub order: CoinbaseOrderRow,
}

/// A single row from the order-history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseOrderRow {
    /// Broker order ID.
    pub order_id: String,
    /// Client order ID, echoed back.
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Product traded.
    pub product_id: String,
    /// Exchange-reported status.
    pub status: String,
    /// Why the order was rejected, if it was.
    #[serde(default)]
    pub reject_reason: Option<String>,
    /// Cumulative filled base-asset quantity.
    #[serde(default)]
    pub filled_size: Decimal,
}

impl CoinbaseOrderRow {
    /// Map the exchange's status string onto our domain `OrderStatus`.
    #[must_use]
    pub fn to_order_status(&self) -> OrderStatus {
        parse_order_status(&self.status)
    }
}

/// `GET /orders/historical/fills` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseFillsResponse {
    /// Reconciled fills.
    pub fills: Vec<CoinbaseFillRow>,
}

/// A single reconciled fill row.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseFillRow {
    /// Exchange-assigned trade ID.
    pub trade_id: String,
    /// Product traded.
    pub product_id: String,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub size: Decimal,
    /// Fee charged on this fill.
    #[serde(default)]
    pub commission: Decimal,
    /// `MAKER`/`TAKER`/`UNKNOWN`.
    #[serde(default)]
    pub liquidity_indicator: Option<String>,
    /// When the fill was reported, RFC 3339.
    pub trade_time: String,
}

impl CoinbaseFillRow {
    /// Map the exchange's liquidity string onto our domain enum.
    #[must_use]
    pub fn to_liquidity_indicator(&self) -> LiquidityIndicator {
        match self.liquidity_indicator.as_deref().unwrap_or_default().to_uppercase().as_str() {
            "MAKER" => LiquidityIndicator::Maker,
            "TAKER" => LiquidityIndicator::Taker,
            _ => LiquidityIndicator::Unknown,
        }
    }
}

/// `GET /products/{id}` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseProductResponse {
    /// Product metadata row.
    pub product: CoinbaseProductRow,
}

/// A single row from the product-metadata endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseProductRow {
    /// Minimum order base-asset size.
    #[serde(default)]
    pub base_min_size: Option<Decimal>,
    /// Smallest base-asset size increment.
    #[serde(default)]
    pub base_increment: Option<Decimal>,
    /// Smallest quote-currency increment.
    #[serde(default)]
    pub quote_increment: Option<Decimal>,
    /// Minimum order notional in quote currency.
    #[serde(default)]
    pub min_market_funds: Option<Decimal>,
    /// Last-trade display price, in quote currency.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Exchange-reported trading status.
    #[serde(default)]
    pub status: Option<String>,
    /// Whether the exchange has disabled trading for this product.
    #[serde(default)]
    pub trading_disabled: bool,
}

/// Map the exchange's order status string onto our domain `OrderStatus`.
fn parse_order_status(status: &str) -> OrderStatus {
    match status.to_uppercase().as_str() {
        "OPEN" => OrderStatus::Open,
        "PENDING" => OrderStatus::Pending,
        "QUEUED" | "UNKNOWN_ORDER_STATUS" => OrderStatus::Submitted,
        "FILLED" => OrderStatus::Filled,
        "CANCELLED" | "CANCELED" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        "EXPIRED" | "FAILED" => OrderStatus::Expired,
        _ => OrderStatus::Submitted,
    }
}
