//! Trade Context
//!
//! `TradeAction` and `TradeContext` are the immutable snapshot the Preflight
//! Engine evaluates against. The context is assembled exactly once per
//! intent (by an application-layer use case, since assembly requires I/O);
//! after construction nothing may mutate it or re-query its sources.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::asset_resolution::ExecutableBalance;
use crate::domain::market_metadata::ResolvedProductRules;
use crate::domain::shared::{ProductId, TenantId, Timestamp};

/// Which side of the market a trade action requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    /// Acquire the asset.
    Buy,
    /// Dispose of the asset.
    Sell,
}

/// How a trade action's size was expressed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountMode {
    /// A USD notional amount.
    QuoteUsd,
    /// A base-asset quantity.
    BaseQty,
    /// Sell the entire available balance.
    All,
}

/// A single proposed trade, prior to preflight evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    /// Buy or sell.
    pub side: TradeSide,
    /// Normalized asset symbol, e.g. `BTC`.
    pub asset: String,
    /// The resolved product this action trades against.
    pub product_id: ProductId,
    /// How the requested size was expressed.
    pub amount_mode: AmountMode,
    /// Requested USD notional (for `quote_usd` and adjusted `all` sells).
    pub amount_usd: Decimal,
    /// Whether this is a "sell all" intent.
    pub sell_all: bool,
    /// Requested base-asset quantity, if expressed that way.
    pub requested_qty: Option<Decimal>,
}

/// The immutable snapshot of everything the Preflight Engine needs: one
/// fetch of balances, one resolution per referenced product, and one
/// best-effort price lookup, built exactly once per intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeContext {
    tenant_id: TenantId,
    execution_mode: String,
    actions: Vec<TradeAction>,
    executable_balances: HashMap<String, ExecutableBalance>,
    resolved_products: HashMap<String, ResolvedProductRules>,
    market_prices: HashMap<String, Decimal>,
    built_at: Timestamp,
}

impl TradeContext {
    /// Build an immutable trade context. This is the only constructor; once
    /// built, nothing may add, remove, or replace its contents.
    #[must_use]
    pub fn build(
        tenant_id: TenantId,
        execution_mode: impl Into<String>,
        actions: Vec<TradeAction>,
        executable_balances: HashMap<String, ExecutableBalance>,
        resolved_products: HashMap<String, ResolvedProductRules>,
        market_prices: HashMap<String, Decimal>,
    ) -> Self {
        Self {
            tenant_id,
            execution_mode: execution_mode.into(),
            actions,
            executable_balances,
            resolved_products,
            market_prices,
            built_at: Timestamp::now(),
        }
    }

    /// Tenant this context was built for.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// `PAPER` or `LIVE`.
    #[must_use]
    pub fn execution_mode(&self) -> &str {
        &self.execution_mode
    }

    /// Every proposed action, in submission order.
    #[must_use]
    pub fn actions(&self) -> &[TradeAction] {
        &self.actions
    }

    /// Balance snapshot for a currency, if any was fetched.
    #[must_use]
    pub fn balance(&self, currency: &str) -> Option<&ExecutableBalance> {
        self.executable_balances.get(currency)
    }

    /// Every currency's balance snapshot, for building recycling candidates.
    pub fn balances(&self) -> impl Iterator<Item = (&str, &ExecutableBalance)> {
        self.executable_balances.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolved rules for a product, if it was referenced by an action.
    #[must_use]
    pub fn resolved_product(&self, product_id: &str) -> Option<&ResolvedProductRules> {
        self.resolved_products.get(product_id)
    }

    /// Best-effort display price for an asset, if one was fetched.
    #[must_use]
    pub fn market_price(&self, asset: &str) -> Option<Decimal> {
        self.market_prices.get(asset).copied()
    }

    /// When this context was assembled.
    #[must_use]
    pub const fn built_at(&self) -> Timestamp {
        self.built_at
    }
}
