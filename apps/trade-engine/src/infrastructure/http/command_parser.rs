//! Deterministic chat-command parser.
//!
//! The platform's real intent classification is an external LLM reasoner
//! (outside this engine's scope — see `DESIGN.md`). This module is a
//! deterministic stand-in covering the command shapes this engine's own
//! test scenarios exercise: a fixed-notional buy, a fixed-notional sell,
//! and "sell all" of a held asset. Anything else classifies as
//! `OutOfScope` rather than guessing at intent.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::domain::shared::ProductId;
use crate::domain::trade_context::{AmountMode, TradeAction, TradeSide};

/// The parsed intent of a chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedIntent {
    /// A conversational greeting with no trade content.
    Greeting,
    /// Text that names no recognizable trade action.
    OutOfScope,
    /// One or more trade actions were recognized.
    Trade(Vec<TradeAction>),
}

static GREETING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(hi|hello|hey|good (morning|afternoon|evening))\b").unwrap());

static BUY_NOTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbuy\s+\$?(?P<amount>[0-9]+(?:\.[0-9]+)?)\s+(?:of|worth of)\s+(?P<symbol>[a-z]{2,10})\b")
        .unwrap()
});

static SELL_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsell\s+all(?:\s+my)?\s+(?P<symbol>[a-z]{2,10})\b").unwrap());

static SELL_QUOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsell\s+\$?(?P<amount>[0-9]+(?:\.[0-9]+)?)\s+(?:of|worth of)\s+(?P<symbol>[a-z]{2,10})\b")
        .unwrap()
});

/// Parse a chat command's free text into a [`ParsedIntent`].
#[must_use]
pub fn parse_command(text: &str) -> ParsedIntent {
    if let Some(captures) = BUY_NOTIONAL.captures(text) {
        let symbol = captures["symbol"].to_uppercase();
        let amount =
            Decimal::from_str(&captures["amount"]).unwrap_or(Decimal::ZERO);
        return ParsedIntent::Trade(vec![TradeAction {
            side: TradeSide::Buy,
            asset: symbol.clone(),
            product_id: ProductId::new(format!("{symbol}-USD")),
            amount_mode: AmountMode::QuoteUsd,
            amount_usd: amount,
            sell_all: false,
            requested_qty: None,
        }]);
    }

    if let Some(captures) = SELL_ALL.captures(text) {
        let symbol = captures["symbol"].to_uppercase();
        return ParsedIntent::Trade(vec![TradeAction {
            side: TradeSide::Sell,
            asset: symbol.clone(),
            product_id: ProductId::new(format!("{symbol}-USD")),
            amount_mode: AmountMode::All,
            amount_usd: Decimal::ZERO,
            sell_all: true,
            requested_qty: None,
        }]);
    }

    if let Some(captures) = SELL_QUOTE.captures(text) {
        let symbol = captures["symbol"].to_uppercase();
        let amount =
            Decimal::from_str(&captures["amount"]).unwrap_or(Decimal::ZERO);
        return ParsedIntent::Trade(vec![TradeAction {
            side: TradeSide::Sell,
            asset: symbol.clone(),
            product_id: ProductId::new(format!("{symbol}-USD")),
            amount_mode: AmountMode::QuoteUsd,
            amount_usd: amount,
            sell_all: false,
            requested_qty: None,
        }]);
    }

    if GREETING.is_match(text) {
        return ParsedIntent::Greeting;
    }

    ParsedIntent::OutOfScope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_fixed_notional_buy() {
        let intent = parse_command("buy $3 of BTC");
        let ParsedIntent::Trade(actions) = intent else { panic!("expected a trade intent") };
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].side, TradeSide::Buy);
        assert_eq!(actions[0].asset, "BTC");
        assert_eq!(actions[0].amount_usd, Decimal::from_str("3").unwrap());
        assert_eq!(actions[0].product_id.as_str(), "BTC-USD");
    }

    #[test]
    fn parses_a_fixed_notional_sell() {
        let intent = parse_command("sell $10 of ETH");
        let ParsedIntent::Trade(actions) = intent else { panic!("expected a trade intent") };
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].side, TradeSide::Sell);
        assert_eq!(actions[0].amount_mode, AmountMode::QuoteUsd);
        assert_eq!(actions[0].asset, "ETH");
        assert_eq!(actions[0].amount_usd, Decimal::from_str("10").unwrap());
        assert!(!actions[0].sell_all);
    }

    #[test]
    fn parses_a_sell_all_command() {
        let intent = parse_command("sell all my ETH");
        let ParsedIntent::Trade(actions) = intent else { panic!("expected a trade intent") };
        assert!(actions[0].sell_all);
        assert_eq!(actions[0].side, TradeSide::Sell);
        assert_eq!(actions[0].asset, "ETH");
    }

    #[test]
    fn greets_back_on_a_plain_greeting() {
        assert_eq!(parse_command("hello there"), ParsedIntent::Greeting);
    }

    #[test]
    fn unrecognized_text_is_out_of_scope() {
        assert_eq!(parse_command("what's the weather today"), ParsedIntent::OutOfScope);
    }
}
