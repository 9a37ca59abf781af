//! Build Trade Context Use Case
//!
//! Assembles the single immutable [`TradeContext`] snapshot a chat command's
//! actions are evaluated against: one authoritative balance fetch and one
//! product lookup per referenced asset. Per the context's own invariant,
//! this runs exactly once per intent; nothing downstream may re-fetch.
//!
//! PAPER mode never calls the broker's balance endpoint: the Executable
//! State Fetcher degrades straight to the last persisted
//! [`PortfolioSnapshot`], as does a LIVE balance fetch that fails outright.
//! Every successful LIVE fetch is itself persisted as the next snapshot.
//!
//! Rule resolution here covers the catalog and fallback tiers only — the
//! live broker preview tier (`MarketMetadataService`'s tier 1) requires a
//! `MetadataBrokerPort` implementation for the Coinbase adapter, which this
//! slice does not wire up. See `DESIGN.md` for the scoping note.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::ports::BrokerPort;
use crate::domain::asset_resolution::ExecutableBalance;
use crate::domain::market_metadata::{ResolvedProductRules, RuleSource};
use crate::domain::portfolio_snapshot::{BalanceSource, PortfolioSnapshot, PortfolioSnapshotRepository};
use crate::domain::product_catalog::{Product, ProductCatalogRepository, effective_base_min_size, safe_base_min_size};
use crate::domain::shared::{TenantId, Timestamp};
use crate::domain::trade_context::{TradeAction, TradeContext};

/// Error surfaced by [`BuildTradeContextUseCase::execute`].
#[derive(Debug, thiserror::Error)]
pub enum BuildTradeContextError {
    /// The balance fetch against the broker failed outright.
    #[error("failed to fetch executable balances: {0}")]
    BalanceFetch(#[from] crate::application::ports::BrokerError),
    /// No portfolio snapshot exists to degrade to (PAPER mode, or a LIVE
    /// fetch failure, with no prior successful LIVE fetch on record).
    #[error("no portfolio snapshot is available for this tenant")]
    NoPortfolioSnapshot,
}

/// The context plus the per-asset product rows the preflight engine's
/// tradability check needs, since [`TradeContext`] only carries resolved
/// rules, not the raw catalog row.
#[derive(Debug, Clone)]
pub struct TradeContextBundle {
    /// The immutable context snapshot.
    pub context: TradeContext,
    /// `(asset, product)` pairs for every action whose product resolved.
    pub products: Vec<(String, Product)>,
    /// Where this bundle's balances actually came from.
    pub balance_source: BalanceSource,
}

/// Builds a [`TradeContext`] from a broker balance fetch and catalog lookups.
pub struct BuildTradeContextUseCase<B: BrokerPort, C: ProductCatalogRepository> {
    broker: B,
    catalog: C,
    snapshots: Arc<dyn PortfolioSnapshotRepository>,
}

impl<B: BrokerPort, C: ProductCatalogRepository> BuildTradeContextUseCase<B, C> {
    /// Construct the use case over a broker port, the product catalog, and
    /// the portfolio snapshot repository backing the degrade path.
    pub const fn new(broker: B, catalog: C, snapshots: Arc<dyn PortfolioSnapshotRepository>) -> Self {
        Self { broker, catalog, snapshots }
    }

    /// Build the context for `actions`, fetching balances once and
    /// resolving one product per distinct action asset.
    pub async fn execute(
        &self,
        tenant_id: TenantId,
        mode: impl Into<String>,
        actions: Vec<TradeAction>,
    ) -> Result<TradeContextBundle, BuildTradeContextError> {
        let mode = mode.into();
        let (executable_balances, balance_source) = self.fetch_balances(&tenant_id, &mode).await?;

        let mut resolved_products = HashMap::new();
        let mut products = Vec::new();
        let mut market_prices: HashMap<String, Decimal> = HashMap::new();

        for action in &actions {
            if resolved_products.contains_key(action.product_id.as_str()) {
                continue;
            }
            let rules = match self.catalog.get_product(&action.product_id).await {
                Some(product) => {
                    let rules = ResolvedProductRules {
                        product_id: action.product_id.clone(),
                        rule_source: RuleSource::Catalog,
                        base_min_size: Some(effective_base_min_size(&product)),
                        base_increment: Some(product.base_increment),
                        min_market_funds: Some(product.min_market_funds),
                        trading_disabled: product.trading_disabled,
                        verified: false,
                    };
                    products.push((action.asset.clone(), product));
                    rules
                }
                None => fallback_rules(&action.asset, &action.product_id),
            };
            resolved_products.insert(action.product_id.as_str().to_string(), rules);

            match self.broker.get_market_price(&action.product_id).await {
                Ok(price) => {
                    market_prices.insert(action.asset.clone(), price);
                }
                Err(e) => {
                    tracing::warn!(
                        asset = %action.asset,
                        error = %e,
                        "No market price available; context will carry no price for this asset"
                    );
                }
            }
        }

        let context = TradeContext::build(
            tenant_id,
            mode,
            actions,
            executable_balances,
            resolved_products,
            market_prices,
        );

        Ok(TradeContextBundle { context, products, balance_source })
    }

    /// Fetch the balances backing this context, per the mode's rules: PAPER
    /// never touches the broker; LIVE does, and degrades on failure.
    async fn fetch_balances(
        &self,
        tenant_id: &TenantId,
        mode: &str,
    ) -> Result<(HashMap<String, ExecutableBalance>, BalanceSource), BuildTradeContextError> {
        if mode.eq_ignore_ascii_case("PAPER") {
            return self.degrade_to_snapshot(tenant_id).await;
        }

        match self.broker.get_balances().await {
            Ok(balances) => {
                let executable_balances: HashMap<String, ExecutableBalance> = balances
                    .into_iter()
                    .map(|b| (b.currency.clone(), b))
                    .collect();
                self.snapshots
                    .save(PortfolioSnapshot {
                        tenant_id: tenant_id.clone(),
                        balances: executable_balances.clone(),
                        captured_at: Timestamp::now(),
                    })
                    .await;
                Ok((executable_balances, BalanceSource::Live))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "LIVE balance fetch failed; degrading to the last portfolio snapshot"
                );
                self.degrade_to_snapshot(tenant_id).await
            }
        }
    }

    async fn degrade_to_snapshot(
        &self,
        tenant_id: &TenantId,
    ) -> Result<(HashMap<String, ExecutableBalance>, BalanceSource), BuildTradeContextError> {
        let snapshot = self
            .snapshots
            .latest(tenant_id)
            .await
            .ok_or(BuildTradeContextError::NoPortfolioSnapshot)?;
        Ok((snapshot.as_degraded_balances(), BalanceSource::PortfolioSnapshotFallback))
    }
}

fn fallback_rules(
    asset: &str,
    product_id: &crate::domain::shared::ProductId,
) -> ResolvedProductRules {
    let fallback_min = safe_base_min_size(asset);
    if fallback_min == crate::domain::product_catalog::GENERIC_BASE_MIN_SIZE_FLOOR
        && !["BTC", "ETH", "SOL", "USDC"].contains(&asset)
    {
        return ResolvedProductRules {
            product_id: product_id.clone(),
            rule_source: RuleSource::Unavailable,
            base_min_size: None,
            base_increment: None,
            min_market_funds: None,
            trading_disabled: true,
            verified: false,
        };
    }

    ResolvedProductRules {
        product_id: product_id.clone(),
        rule_source: RuleSource::Fallback,
        base_min_size: Some(fallback_min),
        base_increment: None,
        min_market_funds: None,
        trading_disabled: false,
        verified: false,
    }
}
