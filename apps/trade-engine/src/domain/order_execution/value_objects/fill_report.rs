//! Fill rows reconciled back from the broker.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{FillId, Money, OrderId, ProductId, Quantity, RunId, Timestamp};

/// A single execution reconciled from the broker's fills endpoint.
///
/// One order accumulates zero or more fills; `filled_qty`, `avg_fill_price`,
/// and `total_fees` on the owning [`super::super::aggregate::Order`] are
/// derived by folding over its fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Unique fill identifier.
    pub fill_id: FillId,
    /// Order this fill belongs to.
    pub order_id: OrderId,
    /// Run this fill belongs to.
    pub run_id: RunId,
    /// Product traded.
    pub product_id: ProductId,
    /// Execution price.
    pub price: Money,
    /// Quantity executed in this fill.
    pub size: Quantity,
    /// Fee charged for this fill.
    pub fee: Money,
    /// Broker-side trade identifier, used for idempotent upsert.
    pub trade_id: String,
    /// Maker/taker indicator as reported by the broker.
    pub liquidity_indicator: LiquidityIndicator,
    /// When the fill occurred at the venue.
    pub filled_at: Timestamp,
}

impl Fill {
    /// Notional value of this fill (`price * size`).
    #[must_use]
    pub fn notional(&self) -> Money {
        Money::new(self.price.amount() * self.size.amount())
    }
}

/// Liquidity side reported by the broker for a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquidityIndicator {
    /// Fill added liquidity to the book.
    Maker,
    /// Fill removed liquidity from the book.
    Taker,
    /// Broker did not report a liquidity side.
    Unknown,
}

impl fmt::Display for LiquidityIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maker => write!(f, "MAKER"),
            Self::Taker => write!(f, "TAKER"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn make_fill() -> Fill {
        Fill {
            fill_id: FillId::new("fill-1"),
            order_id: OrderId::new("ord-1"),
            run_id: RunId::new("run-1"),
            product_id: ProductId::new("BTC-USD"),
            price: Money::usd(65000.0),
            size: Quantity::new(Decimal::new(5, 2)),
            fee: Money::usd(0.10),
            trade_id: "trade-99".to_string(),
            liquidity_indicator: LiquidityIndicator::Taker,
            filled_at: Timestamp::now(),
        }
    }

    #[test]
    fn notional_multiplies_price_by_size() {
        let fill = make_fill();
        assert_eq!(fill.notional().amount(), Decimal::new(325000, 2));
    }

    #[test]
    fn serde_roundtrip() {
        let fill = make_fill();
        let json = serde_json::to_string(&fill).unwrap();
        let parsed: Fill = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fill);
    }

    #[test]
    fn liquidity_indicator_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&LiquidityIndicator::Maker).unwrap(),
            "\"MAKER\""
        );
    }
}
