//! Asset Resolver
//!
//! A deterministic classifier over `(symbol, ExecutableBalance, product
//! catalog)`. Resolution is first-match-wins; statuses are never combined.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product_catalog::Product;
use crate::domain::shared::{Symbol, Timestamp};

/// A single currency balance, either fetched live from the broker's
/// executable-state endpoint or degraded from a persisted portfolio
/// snapshot (see [`crate::domain::portfolio_snapshot`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutableBalance {
    /// Upper-cased currency code.
    pub currency: String,
    /// Quantity immediately available to trade.
    pub available_qty: Decimal,
    /// Quantity currently on hold (e.g. behind an open order).
    pub hold_qty: Decimal,
    /// Exchange account identifier the balance came from.
    pub account_uuid: String,
    /// When this balance was fetched.
    pub updated_at: Timestamp,
}

impl ExecutableBalance {
    /// Total quantity the exchange reports for this currency.
    #[must_use]
    pub fn total_qty(&self) -> Decimal {
        self.available_qty + self.hold_qty
    }
}

/// Outcome of resolving a single asset against balances and the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetResolutionStatus {
    /// No balance at all for this currency.
    NotHeld,
    /// Balance exists but no online `<SYM>-USD`/`<SYM>-USDC` product.
    NoProduct,
    /// Product exists but is disabled or cancel-only.
    NotTradable,
    /// Product only accepts limit orders.
    LimitOnly,
    /// Nothing available; the balance is entirely on hold.
    FundsOnHold,
    /// Available quantity is exactly zero, with nothing on hold either.
    QtyZero,
    /// Fully resolvable: tradable product, non-zero available balance.
    Ok,
}

impl AssetResolutionStatus {
    /// `true` for every status except [`Self::Ok`].
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        !matches!(self, Self::Ok)
    }
}

/// Result of resolving one asset: a status plus a user-facing message naming
/// both the symbol and the status. Never contains the forbidden phrases
/// "quantity unavailable" or "position not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetResolution {
    /// The symbol resolved, e.g. `BTC`.
    pub symbol: String,
    /// The resolution outcome.
    pub status: AssetResolutionStatus,
    /// Human-facing message naming the symbol and the status.
    pub message: String,
}

/// Inputs needed to resolve a single asset: its balance (if any) and the
/// candidate USD/USDC products, flagged for tradability and limit-only.
pub struct AssetResolutionInputs<'a> {
    /// Balance for the asset's currency, if the tenant holds any.
    pub balance: Option<&'a ExecutableBalance>,
    /// The resolved `<SYM>-USD` or `<SYM>-USDC` product, if one is online.
    pub product: Option<&'a Product>,
    /// Whether the resolved product only accepts limit orders.
    pub limit_only: bool,
}

/// Resolve a single asset. First match wins; statuses are never combined.
///
/// `requires_holding` gates whether an absent balance blocks outright: a
/// SELL (or a holdings enumeration) has nothing to sell without one, but a
/// BUY never needs to already hold the asset it is acquiring — for a BUY,
/// pass `false` so resolution falls through to the product-tradability
/// checks instead of short-circuiting on [`AssetResolutionStatus::NotHeld`].
#[must_use]
pub fn resolve(symbol: &str, inputs: &AssetResolutionInputs<'_>, requires_holding: bool) -> AssetResolution {
    let status = match inputs.balance {
        None if requires_holding => AssetResolutionStatus::NotHeld,
        _ if inputs.product.is_none() => AssetResolutionStatus::NoProduct,
        _ if inputs.product.is_some_and(|p| !p.is_tradeable()) => {
            AssetResolutionStatus::NotTradable
        }
        _ if inputs.limit_only => AssetResolutionStatus::LimitOnly,
        Some(b) if b.available_qty <= Decimal::ZERO && b.hold_qty > Decimal::ZERO => {
            AssetResolutionStatus::FundsOnHold
        }
        Some(b) if b.available_qty <= Decimal::ZERO => AssetResolutionStatus::QtyZero,
        _ => AssetResolutionStatus::Ok,
    };

    AssetResolution {
        symbol: symbol.to_string(),
        message: message_for(symbol, status),
        status,
    }
}

fn message_for(symbol: &str, status: AssetResolutionStatus) -> String {
    match status {
        AssetResolutionStatus::NotHeld => format!("{symbol} is not held in this account (NOT_HELD)."),
        AssetResolutionStatus::NoProduct => {
            format!("No tradable product is listed for {symbol} (NO_PRODUCT).")
        }
        AssetResolutionStatus::NotTradable => {
            format!("{symbol} is currently not tradable on the exchange (NOT_TRADABLE).")
        }
        AssetResolutionStatus::LimitOnly => {
            format!("{symbol} only accepts limit orders right now (LIMIT_ONLY).")
        }
        AssetResolutionStatus::FundsOnHold => {
            format!("All {symbol} balance is currently on hold (FUNDS_ON_HOLD).")
        }
        AssetResolutionStatus::QtyZero => {
            format!("{symbol} balance is zero (QTY_ZERO).")
        }
        AssetResolutionStatus::Ok => format!("{symbol} is resolved and tradable (OK)."),
    }
}

/// Stablecoins and cash currencies excluded from holdings resolution.
const CASH_LIKE_CURRENCIES: &[&str] = &["USD", "USDC", "USDT", "DAI", "PYUSD"];

/// Partition a tenant's non-cash balances into tradable and skipped symbols.
/// Stablecoins and USD are always excluded from both lists.
#[must_use]
pub fn resolve_all_holdings(
    balances: &HashMap<String, ExecutableBalance>,
    products: &HashMap<String, Product>,
) -> (Vec<AssetResolution>, Vec<AssetResolution>) {
    let mut tradable = Vec::new();
    let mut skipped = Vec::new();

    for (currency, balance) in balances {
        let normalized = Symbol::normalize(currency).to_string();
        if CASH_LIKE_CURRENCIES.contains(&normalized.as_str()) {
            continue;
        }

        let product = products.get(&format!("{normalized}-USD"));
        let inputs = AssetResolutionInputs {
            balance: Some(balance),
            product,
            limit_only: false,
        };
        let resolution = resolve(&normalized, &inputs, true);
        if resolution.status == AssetResolutionStatus::Ok {
            tradable.push(resolution);
        } else {
            skipped.push(resolution);
        }
    }

    (tradable, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product_catalog::ProductStatus;
    use rust_decimal_macros::dec;

    fn product(status: ProductStatus, trading_disabled: bool) -> Product {
        Product {
            product_id: crate::domain::shared::ProductId::new("BTC-USD"),
            base_currency: "BTC".to_string(),
            quote_currency: "USD".to_string(),
            base_min_size: dec!(0.00001),
            base_increment: dec!(0.00000001),
            quote_increment: dec!(0.01),
            min_market_funds: dec!(1),
            status,
            trading_disabled,
        }
    }

    fn balance(available: Decimal, hold: Decimal) -> ExecutableBalance {
        ExecutableBalance {
            currency: "BTC".to_string(),
            available_qty: available,
            hold_qty: hold,
            account_uuid: "acct-1".to_string(),
            updated_at: Timestamp::now(),
        }
    }

    #[test]
    fn not_held_wins_over_everything_else() {
        let inputs = AssetResolutionInputs {
            balance: None,
            product: Some(&product(ProductStatus::Online, false)),
            limit_only: false,
        };
        assert_eq!(resolve("SOL", &inputs, true).status, AssetResolutionStatus::NotHeld);
    }

    #[test]
    fn no_product_when_balance_present_but_no_listing() {
        let b = balance(dec!(1), dec!(0));
        let inputs = AssetResolutionInputs {
            balance: Some(&b),
            product: None,
            limit_only: false,
        };
        assert_eq!(resolve("BTC", &inputs, true).status, AssetResolutionStatus::NoProduct);
    }

    #[test]
    fn funds_on_hold_wins_over_qty_zero() {
        let b = balance(Decimal::ZERO, dec!(0.5));
        let inputs = AssetResolutionInputs {
            balance: Some(&b),
            product: Some(&product(ProductStatus::Online, false)),
            limit_only: false,
        };
        assert_eq!(
            resolve("BTC", &inputs, true).status,
            AssetResolutionStatus::FundsOnHold
        );
    }

    #[test]
    fn qty_zero_when_nothing_held_or_on_hold() {
        let b = balance(Decimal::ZERO, Decimal::ZERO);
        let inputs = AssetResolutionInputs {
            balance: Some(&b),
            product: Some(&product(ProductStatus::Online, false)),
            limit_only: false,
        };
        assert_eq!(resolve("BTC", &inputs, true).status, AssetResolutionStatus::QtyZero);
    }

    #[test]
    fn ok_when_tradable_and_available() {
        let b = balance(dec!(0.5), Decimal::ZERO);
        let inputs = AssetResolutionInputs {
            balance: Some(&b),
            product: Some(&product(ProductStatus::Online, false)),
            limit_only: false,
        };
        assert_eq!(resolve("BTC", &inputs, true).status, AssetResolutionStatus::Ok);
    }

    #[test]
    fn messages_never_contain_forbidden_phrases() {
        let b = balance(Decimal::ZERO, Decimal::ZERO);
        let inputs = AssetResolutionInputs {
            balance: Some(&b),
            product: Some(&product(ProductStatus::Online, false)),
            limit_only: false,
        };
        let message = resolve("BTC", &inputs, true).message;
        assert!(!message.contains("quantity unavailable"));
        assert!(!message.contains("position not found"));
        assert!(message.contains("BTC"));
    }

    #[test]
    fn resolve_all_holdings_excludes_stablecoins_from_both_lists() {
        let mut balances = HashMap::new();
        balances.insert("USD".to_string(), balance(dec!(100), Decimal::ZERO));
        balances.insert("BTC".to_string(), balance(dec!(0.5), Decimal::ZERO));

        let mut products = HashMap::new();
        products.insert("BTC-USD".to_string(), product(ProductStatus::Online, false));

        let (tradable, skipped) = resolve_all_holdings(&balances, &products);
        assert_eq!(tradable.len(), 1);
        assert_eq!(tradable[0].symbol, "BTC");
        assert!(skipped.is_empty());
    }
}
