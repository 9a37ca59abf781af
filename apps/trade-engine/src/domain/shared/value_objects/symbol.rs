//! Symbol value object for asset/currency tickers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A currency or asset ticker, e.g. "BTC", "ETH", "USD".
///
/// Always normalized to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol, normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_uppercase())
    }

    /// Normalise a user-supplied asset reference the way the Asset Resolver
    /// requires: uppercase, with a trailing `-USD` or `-USDC` quote suffix
    /// stripped so `"btc-usd"` and `"BTC"` resolve to the same symbol.
    #[must_use]
    pub fn normalize(value: impl AsRef<str>) -> Self {
        let upper = value.as_ref().to_uppercase();
        let stripped = upper
            .strip_suffix("-USDC")
            .or_else(|| upper.strip_suffix("-USD"))
            .unwrap_or(&upper);
        Self(stripped.to_string())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate the symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty, too long, or contains
    /// characters other than ASCII letters/digits.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol cannot be empty".to_string(),
            });
        }

        if self.0.len() > 21 {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol exceeds maximum length".to_string(),
            });
        }

        if !self.0.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol contains invalid characters".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_new_normalizes_case() {
        let s = Symbol::new("btc");
        assert_eq!(s.as_str(), "BTC");
    }

    #[test]
    fn symbol_display() {
        let s = Symbol::new("ETH");
        assert_eq!(format!("{s}"), "ETH");
    }

    #[test]
    fn normalize_strips_usd_suffix() {
        assert_eq!(Symbol::normalize("btc-usd").as_str(), "BTC");
        assert_eq!(Symbol::normalize("BTC-USD").as_str(), "BTC");
    }

    #[test]
    fn normalize_strips_usdc_suffix() {
        assert_eq!(Symbol::normalize("eth-usdc").as_str(), "ETH");
    }

    #[test]
    fn normalize_leaves_bare_symbol_alone() {
        assert_eq!(Symbol::normalize("SOL").as_str(), "SOL");
    }

    #[test]
    fn symbol_validate_empty() {
        let s = Symbol::new("");
        assert!(s.validate().is_err());
    }

    #[test]
    fn symbol_validate_too_long() {
        let s = Symbol::new("A".repeat(25));
        assert!(s.validate().is_err());
    }

    #[test]
    fn symbol_validate_invalid_chars() {
        let s = Symbol::new("BTC!");
        assert!(s.validate().is_err());

        let s2 = Symbol::new("B TC");
        assert!(s2.validate().is_err());
    }

    #[test]
    fn symbol_validate_valid() {
        assert!(Symbol::new("BTC").validate().is_ok());
    }

    #[test]
    fn symbol_from_conversions() {
        let s1: Symbol = "BTC".into();
        assert_eq!(s1.as_str(), "BTC");

        let s2: Symbol = String::from("ETH").into();
        assert_eq!(s2.as_str(), "ETH");
    }

    #[test]
    fn symbol_serde_roundtrip() {
        let s = Symbol::new("BTC");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"BTC\"");

        let parsed: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn symbol_hash_works() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Symbol::new("BTC"));
        set.insert(Symbol::new("ETH"));
        set.insert(Symbol::new("btc"));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn symbol_into_inner() {
        let s = Symbol::new("BTC");
        let inner = s.into_inner();
        assert_eq!(inner, "BTC");
    }
}
