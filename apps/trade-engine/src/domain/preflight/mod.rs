//! Preflight Engine
//!
//! Pure evaluation of a [`TradeContext`](crate::domain::trade_context::TradeContext)
//! against the exchange's trading rules. Every action receives exactly one
//! reason code; checks run in a fixed order and the first failure wins.
//! Nothing here performs I/O — the context must already hold every balance,
//! product rule, and price the evaluation needs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::asset_resolution::{AssetResolutionInputs, AssetResolutionStatus, resolve};
use crate::domain::market_metadata::{ResolvedProductRules, RuleSource};
use crate::domain::product_catalog::Product;
use crate::domain::trade_context::{AmountMode, TradeAction, TradeContext, TradeSide};

/// Taker fee rate applied to every notional estimate.
pub const FEE_RATE: Decimal = dec!(0.006);

/// Defensive floor below which an order is rejected regardless of the
/// product's own minimum, per the $1 minimum-notional design note.
pub const MIN_NOTIONAL_FLOOR_USD: Decimal = dec!(1);

/// Outcome of evaluating a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PreflightStatus {
    /// May proceed unchanged.
    Ready,
    /// Cannot proceed; `reason_code` names why.
    Blocked,
    /// May proceed, but the requested amount was reduced to fit a
    /// constraint (e.g. "sell all" clamped to actual holdings).
    Adjusted,
}

/// Stable reason codes, matching the platform-wide error-code catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    NotHeld,
    NoProduct,
    NotTradable,
    LimitOnly,
    ProviderUnavailable,
    FundsOnHold,
    QtyZero,
    ExceedsHoldings,
    BelowMinimumSize,
    InsufficientCash,
    InsufficientBalance,
    MinMarketFundsNotMet,
    Ready,
}

/// Evaluation result for one action, carried alongside its index in the
/// originating [`TradeContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightResult {
    /// Index into `TradeContext::actions()`.
    pub action_index: usize,
    /// Normalized asset symbol.
    pub asset: String,
    /// Ready, Blocked, or Adjusted.
    pub status: PreflightStatus,
    /// Exactly one reason code per action.
    pub reason_code: ReasonCode,
    /// Human-facing explanation.
    pub message: String,
    /// Estimated taker fee at [`FEE_RATE`], for Ready/Adjusted actions.
    pub estimated_fee_usd: Option<Decimal>,
    /// Present only when `status == Adjusted`: the reduced USD notional.
    pub adjusted_amount_usd: Option<Decimal>,
    /// Present only on a `Blocked` `InsufficientCash` buy: the Funds
    /// Recycler's proposed sell to cover the shortfall, if one exists.
    pub auto_sell_proposal: Option<RecycleResult>,
}

/// Aggregate outcome across every action in a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    /// One result per action, in context order.
    pub results: Vec<PreflightResult>,
}

impl PreflightReport {
    /// `true` when every action is `Ready` or `Adjusted`.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.status != PreflightStatus::Blocked)
    }

    /// `true` when at least one action is `Blocked`.
    #[must_use]
    pub fn any_blocked(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.status == PreflightStatus::Blocked)
    }
}

fn blocked(index: usize, asset: &str, code: ReasonCode, message: impl Into<String>) -> PreflightResult {
    PreflightResult {
        action_index: index,
        asset: asset.to_string(),
        status: PreflightStatus::Blocked,
        reason_code: code,
        message: message.into(),
        estimated_fee_usd: None,
        adjusted_amount_usd: None,
        auto_sell_proposal: None,
    }
}

/// Evaluate every action in a context. Pure function: takes no locks, makes
/// no network calls, and consults only what the context already holds.
#[must_use]
pub fn run_preflight(ctx: &TradeContext, catalog_products: &[(&str, &Product)]) -> PreflightReport {
    let mut results = Vec::with_capacity(ctx.actions().len());
    let mut cash_committed_usd = Decimal::ZERO;

    for (index, action) in ctx.actions().iter().enumerate() {
        let result = evaluate_action(ctx, action, index, catalog_products, cash_committed_usd);
        if matches!(result.status, PreflightStatus::Ready | PreflightStatus::Adjusted)
            && action.side == TradeSide::Buy
        {
            cash_committed_usd += result
                .adjusted_amount_usd
                .unwrap_or(action.amount_usd);
        }
        results.push(result);
    }

    PreflightReport { results }
}

fn evaluate_action(
    ctx: &TradeContext,
    action: &TradeAction,
    index: usize,
    catalog_products: &[(&str, &Product)],
    cash_already_committed_usd: Decimal,
) -> PreflightResult {
    let asset = action.asset.as_str();
    let rules = ctx.resolved_product(action.product_id.as_str());

    // 1. Tradability (and 2. rule availability — verified via asset resolver,
    // which already folds in catalog-derived tradability/limit-only flags).
    let product = catalog_products
        .iter()
        .find(|(sym, _)| *sym == asset)
        .map(|(_, p)| *p);
    let balance = ctx.balance(asset);
    let limit_only = rules.is_some_and(|r| matches!(r.rule_source, RuleSource::Unavailable));
    let resolution = resolve(
        asset,
        &AssetResolutionInputs {
            balance,
            product,
            limit_only,
        },
        action.side == TradeSide::Sell,
    );

    if resolution.status != AssetResolutionStatus::Ok {
        let code = match resolution.status {
            AssetResolutionStatus::NotHeld => ReasonCode::NotHeld,
            AssetResolutionStatus::NoProduct => ReasonCode::NoProduct,
            AssetResolutionStatus::NotTradable => ReasonCode::NotTradable,
            AssetResolutionStatus::LimitOnly => ReasonCode::LimitOnly,
            AssetResolutionStatus::FundsOnHold => ReasonCode::FundsOnHold,
            AssetResolutionStatus::QtyZero => ReasonCode::QtyZero,
            AssetResolutionStatus::Ok => unreachable!(),
        };
        return blocked(index, asset, code, resolution.message);
    }

    let Some(rules) = rules else {
        return blocked(
            index,
            asset,
            ReasonCode::ProviderUnavailable,
            format!("No verified trading rules are available for {asset} (PROVIDER_UNAVAILABLE)."),
        );
    };
    if matches!(rules.rule_source, RuleSource::Unavailable) {
        return blocked(
            index,
            asset,
            ReasonCode::ProviderUnavailable,
            format!("No verified trading rules are available for {asset} (PROVIDER_UNAVAILABLE)."),
        );
    }

    match action.side {
        TradeSide::Sell => evaluate_sell(ctx, action, index, asset, rules, balance),
        TradeSide::Buy => evaluate_buy(ctx, action, index, asset, rules, cash_already_committed_usd),
    }
}

fn evaluate_sell(
    ctx: &TradeContext,
    action: &TradeAction,
    index: usize,
    asset: &str,
    rules: &ResolvedProductRules,
    balance: Option<&crate::domain::asset_resolution::ExecutableBalance>,
) -> PreflightResult {
    let Some(balance) = balance else {
        return blocked(index, asset, ReasonCode::NotHeld, format!("{asset} is not held (NOT_HELD)."));
    };
    let available_qty = balance.available_qty;

    // 3. SELL balance check.
    if available_qty <= Decimal::ZERO {
        return blocked(
            index,
            asset,
            ReasonCode::InsufficientBalance,
            format!("No available {asset} balance to sell (INSUFFICIENT_BALANCE)."),
        );
    }

    let price = ctx.market_price(asset).unwrap_or(Decimal::ZERO);
    let requested_qty = match action.requested_qty {
        Some(qty) => qty,
        None if action.amount_mode == AmountMode::QuoteUsd && price > Decimal::ZERO => {
            action.amount_usd / price
        }
        None => available_qty,
    };

    // 4. SELL ALL dust check: selling the full position for less than the
    // minimum notional is rejected rather than silently adjusted away.
    if action.sell_all {
        let notional = available_qty * price;
        if price > Decimal::ZERO && notional < MIN_NOTIONAL_FLOOR_USD {
            return blocked(
                index,
                asset,
                ReasonCode::BelowMinimumSize,
                format!("{asset} holding is dust and cannot be sold (BELOW_MINIMUM_SIZE)."),
            );
        }
    }

    // 5. SELL exceeds holdings -> ADJUSTED, clamp down to available_qty.
    let (effective_qty, adjusted_amount_usd, status, reason_code) = if requested_qty > available_qty {
        let adjusted_notional = available_qty * price;
        (
            available_qty,
            Some(adjusted_notional),
            PreflightStatus::Adjusted,
            ReasonCode::ExceedsHoldings,
        )
    } else {
        (requested_qty, None, PreflightStatus::Ready, ReasonCode::Ready)
    };

    // 6. SELL below base_min_size.
    let base_min_size = rules.base_min_size.unwrap_or(Decimal::ZERO);
    if effective_qty < base_min_size {
        return blocked(
            index,
            asset,
            ReasonCode::BelowMinimumSize,
            format!("{asset} order size is below the exchange minimum (BELOW_MINIMUM_SIZE)."),
        );
    }

    let notional = effective_qty * price;
    let fee = notional * FEE_RATE;

    PreflightResult {
        action_index: index,
        asset: asset.to_string(),
        status,
        reason_code,
        message: match status {
            PreflightStatus::Adjusted => {
                format!("Sell amount reduced to available {asset} holdings (EXCEEDS_HOLDINGS).")
            }
            _ => format!("{asset} sell is ready (READY)."),
        },
        estimated_fee_usd: Some(fee),
        adjusted_amount_usd,
        auto_sell_proposal: None,
    }
}

fn evaluate_buy(
    ctx: &TradeContext,
    action: &TradeAction,
    index: usize,
    asset: &str,
    rules: &ResolvedProductRules,
    cash_already_committed_usd: Decimal,
) -> PreflightResult {
    let fee = action.amount_usd * FEE_RATE;
    let total_cost = action.amount_usd + fee;

    // 7. BUY cash sufficiency, checked against whatever cash this context's
    // earlier actions have already committed.
    let available_cash = ctx.balance("USD").map_or(Decimal::ZERO, |b| b.available_qty);
    let remaining_cash = available_cash - cash_already_committed_usd;
    if remaining_cash < total_cost {
        let shortfall = total_cost - remaining_cash;
        let holdings: Vec<RecyclableHolding> = ctx
            .balances()
            .filter(|(symbol, _)| *symbol != "USD" && *symbol != asset)
            .filter_map(|(symbol, balance)| {
                let price = ctx.market_price(symbol)?;
                Some(RecyclableHolding {
                    symbol: symbol.to_string(),
                    usd_value: balance.available_qty * price,
                    acquired_at: balance.updated_at,
                })
            })
            .collect();
        let proposal = recycle_funds(shortfall, &holdings);
        let mut result = blocked(
            index,
            asset,
            ReasonCode::InsufficientCash,
            format!("Insufficient USD balance to fund this buy (INSUFFICIENT_CASH)."),
        );
        result.auto_sell_proposal = Some(proposal);
        return result;
    }

    // 8. Min market funds, plus the defensive $1 floor.
    let min_market_funds = rules
        .min_market_funds
        .unwrap_or(Decimal::ZERO)
        .max(MIN_NOTIONAL_FLOOR_USD);
    if action.amount_usd < min_market_funds {
        return blocked(
            index,
            asset,
            ReasonCode::MinMarketFundsNotMet,
            format!("{asset} buy is below the exchange's minimum market funds (BELOW_MINIMUM_SIZE)."),
        );
    }

    PreflightResult {
        action_index: index,
        asset: asset.to_string(),
        status: PreflightStatus::Ready,
        reason_code: ReasonCode::Ready,
        message: format!("{asset} buy is ready (READY)."),
        estimated_fee_usd: Some(fee),
        adjusted_amount_usd: None,
        auto_sell_proposal: None,
    }
}

/// Result of asking the Funds Recycler whether a buy needs to be funded by
/// selling something else first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleResult {
    /// Whether a prior sell is needed to fund the requested buy.
    pub needs_recycle: bool,
    /// The asset to sell, if `needs_recycle`.
    pub sell_symbol: Option<String>,
    /// The USD notional to raise via that sell.
    pub sell_amount_usd: Option<Decimal>,
    /// Human-facing explanation.
    pub reason: Option<String>,
}

impl RecycleResult {
    fn none() -> Self {
        Self {
            needs_recycle: false,
            sell_symbol: None,
            sell_amount_usd: None,
            reason: None,
        }
    }
}

/// A candidate holding the recycler may liquidate to free up cash.
#[derive(Debug, Clone)]
pub struct RecyclableHolding {
    /// Upper-cased currency code.
    pub symbol: String,
    /// Current USD value of the full position.
    pub usd_value: Decimal,
    /// When the asset was most recently bought.
    pub acquired_at: crate::domain::shared::Timestamp,
}

/// Minimum USD value a recycler will propose selling; below this, a
/// liquidation is considered dust and skipped.
pub const RECYCLE_DUST_FLOOR_USD: Decimal = dec!(0.50);

/// Decide whether funding `shortfall_usd` requires selling another holding
/// first. Prefers the most recently bought asset; ties break toward the
/// largest USD value. Never proposes a sell below [`RECYCLE_DUST_FLOOR_USD`].
#[must_use]
pub fn recycle_funds(shortfall_usd: Decimal, holdings: &[RecyclableHolding]) -> RecycleResult {
    if shortfall_usd <= Decimal::ZERO {
        return RecycleResult::none();
    }

    let mut candidates: Vec<&RecyclableHolding> = holdings
        .iter()
        .filter(|h| h.usd_value >= RECYCLE_DUST_FLOOR_USD)
        .collect();
    candidates.sort_by(|a, b| {
        b.acquired_at
            .cmp(&a.acquired_at)
            .then_with(|| b.usd_value.cmp(&a.usd_value))
    });

    let Some(chosen) = candidates.into_iter().next() else {
        return RecycleResult {
            needs_recycle: true,
            sell_symbol: None,
            sell_amount_usd: None,
            reason: Some("No recyclable holdings large enough to cover the shortfall.".to_string()),
        };
    };

    let sell_amount_usd = shortfall_usd.min(chosen.usd_value);
    RecycleResult {
        needs_recycle: true,
        sell_symbol: Some(chosen.symbol.clone()),
        sell_amount_usd: Some(sell_amount_usd),
        reason: Some(format!(
            "Selling {} to cover a ${shortfall_usd} shortfall.",
            chosen.symbol
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset_resolution::ExecutableBalance;
    use crate::domain::shared::{ProductId, TenantId, Timestamp};
    use crate::domain::trade_context::AmountMode;
    use std::collections::HashMap;

    fn ready_rules(product_id: &str) -> ResolvedProductRules {
        ResolvedProductRules {
            product_id: ProductId::new(product_id),
            rule_source: RuleSource::Catalog,
            base_min_size: Some(dec!(0.00001)),
            base_increment: Some(dec!(0.00000001)),
            min_market_funds: Some(dec!(1)),
            trading_disabled: false,
            verified: false,
        }
    }

    fn balance(symbol: &str, available: Decimal) -> ExecutableBalance {
        ExecutableBalance {
            currency: symbol.to_string(),
            available_qty: available,
            hold_qty: Decimal::ZERO,
            account_uuid: "acct-1".to_string(),
            updated_at: Timestamp::now(),
        }
    }

    fn product(symbol: &str) -> Product {
        Product {
            product_id: ProductId::new(format!("{symbol}-USD")),
            base_currency: symbol.to_string(),
            quote_currency: "USD".to_string(),
            base_min_size: dec!(0.00001),
            base_increment: dec!(0.00000001),
            quote_increment: dec!(0.01),
            min_market_funds: dec!(1),
            status: crate::domain::product_catalog::ProductStatus::Online,
            trading_disabled: false,
        }
    }

    #[test]
    fn buy_blocked_on_insufficient_cash() {
        let mut balances = HashMap::new();
        balances.insert("USD".to_string(), balance("USD", dec!(1)));
        let mut rules = HashMap::new();
        rules.insert("BTC-USD".to_string(), ready_rules("BTC-USD"));
        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), dec!(65000));

        let action = TradeAction {
            side: TradeSide::Buy,
            asset: "BTC".to_string(),
            product_id: ProductId::new("BTC-USD"),
            amount_mode: AmountMode::QuoteUsd,
            amount_usd: dec!(50),
            sell_all: false,
            requested_qty: None,
        };
        let ctx = TradeContext::build(
            TenantId::new("t1"),
            "PAPER",
            vec![action],
            balances,
            rules,
            prices,
        );
        let btc = product("BTC");
        let report = run_preflight(&ctx, &[("BTC", &btc)]);
        assert_eq!(report.results[0].reason_code, ReasonCode::InsufficientCash);
        assert!(report.any_blocked());
    }

    #[test]
    fn sell_exceeding_holdings_is_adjusted_down() {
        let mut balances = HashMap::new();
        balances.insert("BTC".to_string(), balance("BTC", dec!(0.01)));
        let mut rules = HashMap::new();
        rules.insert("BTC-USD".to_string(), ready_rules("BTC-USD"));
        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), dec!(65000));

        let action = TradeAction {
            side: TradeSide::Sell,
            asset: "BTC".to_string(),
            product_id: ProductId::new("BTC-USD"),
            amount_mode: AmountMode::BaseQty,
            amount_usd: Decimal::ZERO,
            sell_all: false,
            requested_qty: Some(dec!(1)),
        };
        let ctx = TradeContext::build(
            TenantId::new("t1"),
            "PAPER",
            vec![action],
            balances,
            rules,
            prices,
        );
        let btc = product("BTC");
        let report = run_preflight(&ctx, &[("BTC", &btc)]);
        assert_eq!(report.results[0].status, PreflightStatus::Adjusted);
        assert_eq!(report.results[0].reason_code, ReasonCode::ExceedsHoldings);
        assert!(report.all_ready());
    }

    #[test]
    fn sell_quote_usd_derives_qty_from_price() {
        let mut balances = HashMap::new();
        balances.insert("BTC".to_string(), balance("BTC", dec!(1)));
        let mut rules = HashMap::new();
        rules.insert("BTC-USD".to_string(), ready_rules("BTC-USD"));
        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), dec!(50000));

        let action = TradeAction {
            side: TradeSide::Sell,
            asset: "BTC".to_string(),
            product_id: ProductId::new("BTC-USD"),
            amount_mode: AmountMode::QuoteUsd,
            amount_usd: dec!(100),
            sell_all: false,
            requested_qty: None,
        };
        let ctx = TradeContext::build(
            TenantId::new("t1"),
            "PAPER",
            vec![action],
            balances,
            rules,
            prices,
        );
        let btc = product("BTC");
        let report = run_preflight(&ctx, &[("BTC", &btc)]);
        assert_eq!(report.results[0].status, PreflightStatus::Ready);
    }

    #[test]
    fn buy_blocked_on_insufficient_cash_proposes_a_recycle() {
        let mut balances = HashMap::new();
        balances.insert("USD".to_string(), balance("USD", dec!(1)));
        balances.insert("ETH".to_string(), balance("ETH", dec!(1)));
        let mut rules = HashMap::new();
        rules.insert("BTC-USD".to_string(), ready_rules("BTC-USD"));
        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), dec!(65000));
        prices.insert("ETH".to_string(), dec!(3000));

        let action = TradeAction {
            side: TradeSide::Buy,
            asset: "BTC".to_string(),
            product_id: ProductId::new("BTC-USD"),
            amount_mode: AmountMode::QuoteUsd,
            amount_usd: dec!(50),
            sell_all: false,
            requested_qty: None,
        };
        let ctx = TradeContext::build(
            TenantId::new("t1"),
            "PAPER",
            vec![action],
            balances,
            rules,
            prices,
        );
        let btc = product("BTC");
        let report = run_preflight(&ctx, &[("BTC", &btc)]);
        let proposal = report.results[0]
            .auto_sell_proposal
            .as_ref()
            .expect("recycle proposal expected");
        assert!(proposal.needs_recycle);
        assert_eq!(proposal.sell_symbol, Some("ETH".to_string()));
    }

    #[test]
    fn recycle_prefers_most_recently_bought_asset() {
        let older = RecyclableHolding {
            symbol: "ETH".to_string(),
            usd_value: dec!(100),
            acquired_at: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
        };
        let newer = RecyclableHolding {
            symbol: "SOL".to_string(),
            usd_value: dec!(20),
            acquired_at: Timestamp::parse("2026-06-01T00:00:00Z").unwrap(),
        };
        let result = recycle_funds(dec!(10), &[older, newer]);
        assert!(result.needs_recycle);
        assert_eq!(result.sell_symbol, Some("SOL".to_string()));
    }

    #[test]
    fn recycle_skips_dust_holdings() {
        let dust = RecyclableHolding {
            symbol: "DOGE".to_string(),
            usd_value: dec!(0.10),
            acquired_at: Timestamp::now(),
        };
        let result = recycle_funds(dec!(5), &[dust]);
        assert!(result.needs_recycle);
        assert!(result.sell_symbol.is_none());
    }

    #[test]
    fn no_recycle_needed_when_shortfall_is_zero() {
        let result = recycle_funds(Decimal::ZERO, &[]);
        assert!(!result.needs_recycle);
    }
}
