//! Coinbase Advanced Trade broker adapter implementing `BrokerPort`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::ports::{
    BrokerError, BrokerPort, OrderHistoryEntry, PlaceOrderRequest, PlaceOrderResponse,
    PlaceOrderSize, PreviewResult,
};
use crate::domain::asset_resolution::ExecutableBalance;
use crate::domain::order_execution::value_objects::Fill;
use crate::domain::product_catalog::{Product, ProductStatus};
use crate::domain::shared::{
    BrokerId, FillId, Money, OrderId, ProductId, Quantity, RunId, Timestamp,
};

use super::api_types::{
    CoinbaseFillsResponse, CoinbaseOrderHistoryResponse, CoinbaseOrderRequest,
    CoinbaseProductResponse, CoinbaseSubmitResponse, MarketMarketIoc, OrderConfiguration,
};
use super::config::CoinbaseConfig;
use super::error::CoinbaseError;
use super::http_client::CoinbaseHttpClient;

/// Coinbase Advanced Trade broker adapter.
#[derive(Debug, Clone)]
pub struct CoinbaseBrokerAdapter {
    client: CoinbaseHttpClient,
}

impl CoinbaseBrokerAdapter {
    /// Construct an adapter from configuration.
    pub fn new(config: CoinbaseConfig) -> Result<Self, CoinbaseError> {
        Ok(Self {
            client: CoinbaseHttpClient::new(&config)?,
        })
    }

    fn to_coinbase_order_request(request: &PlaceOrderRequest) -> CoinbaseOrderRequest {
        let market_market_ioc = match request.size {
            PlaceOrderSize::QuoteSize(amount) => MarketMarketIoc {
                quote_size: Some(amount.to_string()),
                base_size: None,
            },
            PlaceOrderSize::BaseSize(amount) => MarketMarketIoc {
                quote_size: None,
                base_size: Some(amount.to_string()),
            },
        };

        CoinbaseOrderRequest {
            product_id: request.symbol.to_string(),
            side: request.side.to_string(),
            order_configuration: OrderConfiguration { market_market_ioc },
            client_order_id: request.client_order_id.clone(),
        }
    }

    /// Fetch a single product's metadata row (used by the market metadata
    /// context, not directly by `BrokerPort`).
    pub async fn get_product(&self, product_id: &ProductId) -> Result<CoinbaseProductResponse, BrokerError> {
        self.client
            .get(&format!("/api/v3/brokerage/products/{}", product_id.as_str()))
            .await
            .map_err(BrokerError::from)
    }

    /// Fetch a product and translate it into the domain catalog shape, used
    /// by the background catalog-refresh loop in `main`.
    pub async fn get_product_metadata(&self, product_id: &ProductId) -> Result<Product, BrokerError> {
        let response = self.get_product(product_id).await?;
        let row = response.product;
        let (base_currency, quote_currency) = product_id
            .as_str()
            .split_once('-')
            .map_or_else(|| (product_id.as_str().to_string(), String::new()), |(b, q)| {
                (b.to_string(), q.to_string())
            });

        Ok(Product {
            product_id: product_id.clone(),
            base_currency,
            quote_currency,
            base_min_size: row.base_min_size.unwrap_or_default(),
            base_increment: row.base_increment.unwrap_or_default(),
            quote_increment: row.quote_increment.unwrap_or_default(),
            min_market_funds: row.min_market_funds.unwrap_or_default(),
            status: parse_product_status(row.status.as_deref()),
            trading_disabled: row.trading_disabled,
        })
    }
}

fn parse_product_status(status: Option<&str>) -> ProductStatus {
    match status.unwrap_or_default().to_ascii_lowercase().as_str() {
        "online" => ProductStatus::Online,
        "delisted" => ProductStatus::Delisted,
        "cancel_only" | "cancel-only" => ProductStatus::CancelOnly,
        _ => ProductStatus::Offline,
    }
}

#[async_trait]
impl BrokerPort for CoinbaseBrokerAdapter {
    async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, BrokerError> {
        let coinbase_request = Self::to_coinbase_order_request(&request);

        tracing::info!(
            client_order_id = %request.client_order_id,
            symbol = %request.symbol,
            side = %request.side,
            "Submitting order to Coinbase"
        );

        let response: CoinbaseSubmitResponse = self
            .client
            .post("/api/v3/brokerage/orders", &coinbase_request)
            .await
            .map_err(BrokerError::from)?;

        if !response.success {
            let reason = response
                .error_response
                .and_then(|e| e.message.or(e.error))
                .unwrap_or_else(|| "order rejected by exchange".to_string());
            return Err(BrokerError::OrderRejected { reason });
        }

        let success = response.success_response.ok_or_else(|| BrokerError::ApiError {
            message: "success=true but success_response missing".to_string(),
        })?;

        Ok(PlaceOrderResponse {
            broker_order_id: BrokerId::new(success.order_id),
            client_order_id: request.client_order_id,
            status: crate::domain::order_execution::value_objects::OrderStatus::Submitted,
        })
    }

    async fn get_balances(&self) -> Result<Vec<ExecutableBalance>, BrokerError> {
        #[derive(serde::Deserialize)]
        struct AccountsResponse {
            accounts: Vec<AccountRow>,
        }

        #[derive(serde::Deserialize)]
        struct AccountRow {
            currency: String,
            available_balance: BalanceAmount,
            hold: BalanceAmount,
            uuid: String,
        }

        #[derive(serde::Deserialize)]
        struct BalanceAmount {
            value: Decimal,
        }

        let response: AccountsResponse = self
            .client
            .get("/api/v3/brokerage/accounts")
            .await
            .map_err(BrokerError::from)?;

        Ok(response
            .accounts
            .into_iter()
            .map(|row| ExecutableBalance {
                currency: row.currency.to_uppercase(),
                available_qty: row.available_balance.value,
                hold_qty: row.hold.value,
                account_uuid: row.uuid,
                updated_at: Timestamp::now(),
            })
            .collect())
    }

    async fn get_fills(
        &self,
        broker_order_id: &BrokerId,
        order_id: &OrderId,
        run_id: &RunId,
    ) -> Result<Vec<Fill>, BrokerError> {
        let response: CoinbaseFillsResponse = self
            .client
            .get(&format!(
                "/api/v3/brokerage/orders/historical/fills?order_id={}",
                broker_order_id.as_str()
            ))
            .await
            .map_err(BrokerError::from)?;

        Ok(response
            .fills
            .into_iter()
            .map(|row| Fill {
                fill_id: FillId::new(&row.trade_id),
                order_id: order_id.clone(),
                run_id: run_id.clone(),
                product_id: ProductId::new(&row.product_id),
                price: Money::new(row.price),
                size: Quantity::new(row.size),
                fee: Money::new(row.commission),
                trade_id: row.trade_id.clone(),
                liquidity_indicator: row.to_liquidity_indicator(),
                filled_at: Timestamp::parse(&row.trade_time).unwrap_or_else(|_| Timestamp::now()),
            })
            .collect())
    }

    async fn get_order_history(
        &self,
        broker_order_id: &BrokerId,
    ) -> Result<OrderHistoryEntry, BrokerError> {
        let response: CoinbaseOrderHistoryResponse = self
            .client
            .get(&format!(
                "/api/v3/brokerage/orders/historical/{}",
                broker_order_id.as_str()
            ))
            .await
            .map_err(BrokerError::from)?;

        let row = response.order;
        Ok(OrderHistoryEntry {
            broker_order_id: BrokerId::new(&row.order_id),
            client_order_id: row.client_order_id.clone(),
            product_id: ProductId::new(&row.product_id),
            status: row.to_order_status(),
            filled_size: row.filled_size,
        })
    }

    async fn preview_order(&self, request: &PlaceOrderRequest) -> Result<PreviewResult, BrokerError> {
        #[derive(serde::Deserialize)]
        struct PreviewResponse {
            #[serde(default)]
            errs: Vec<String>,
            #[serde(default)]
            quote_size: Option<Decimal>,
            #[serde(default)]
            commission_total: Option<Decimal>,
        }

        let coinbase_request = Self::to_coinbase_order_request(request);
        let response: PreviewResponse = self
            .client
            .post("/api/v3/brokerage/orders/preview", &coinbase_request)
            .await
            .map_err(BrokerError::from)?;

        if response.errs.is_empty() {
            Ok(PreviewResult {
                would_succeed: true,
                estimated_quote_cost: response.quote_size,
                estimated_fee: response.commission_total,
                rejection_reason: None,
            })
        } else {
            Ok(PreviewResult {
                would_succeed: false,
                estimated_quote_cost: None,
                estimated_fee: None,
                rejection_reason: Some(response.errs.join("; ")),
            })
        }
    }

    async fn get_market_price(&self, product_id: &ProductId) -> Result<Decimal, BrokerError> {
        let response = self.get_product(product_id).await?;
        response.product.price.ok_or_else(|| BrokerError::ApiError {
            message: format!("no price reported for {}", product_id.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::value_objects::OrderSide;
    use crate::domain::shared::Symbol;

    #[test]
    fn buy_orders_are_sized_by_quote_notional() {
        let request = PlaceOrderRequest {
            client_order_id: "coid-1".to_string(),
            symbol: Symbol::new("BTC-USD"),
            side: OrderSide::Buy,
            size: PlaceOrderSize::QuoteSize(Decimal::new(2500, 2)),
        };
        let coinbase_request = CoinbaseBrokerAdapter::to_coinbase_order_request(&request);
        assert_eq!(coinbase_request.side, "BUY");
        assert_eq!(
            coinbase_request.order_configuration.market_market_ioc.quote_size,
            Some("25.00".to_string())
        );
        assert!(coinbase_request
            .order_configuration
            .market_market_ioc
            .base_size
            .is_none());
    }

    #[test]
    fn sell_orders_are_sized_by_base_quantity() {
        let request = PlaceOrderRequest {
            client_order_id: "coid-2".to_string(),
            symbol: Symbol::new("ETH-USD"),
            side: OrderSide::Sell,
            size: PlaceOrderSize::BaseSize(Decimal::new(5, 1)),
        };
        let coinbase_request = CoinbaseBrokerAdapter::to_coinbase_order_request(&request);
        assert_eq!(coinbase_request.side, "SELL");
        assert_eq!(
            coinbase_request.order_configuration.market_market_ioc.base_size,
            Some("0.5".to_string())
        );
    }
}
