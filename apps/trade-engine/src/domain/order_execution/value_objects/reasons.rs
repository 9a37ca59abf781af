//! Reasons for order rejection, cancellation, and status updates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason an order was rejected by the broker or the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RejectReason {
    /// Error code, one of the order-placement codes.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RejectReason {
    /// Create a new reject reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Broker rejected the order outright.
    #[must_use]
    pub fn order_rejected(message: impl Into<String>) -> Self {
        Self::new("ORDER_REJECTED", message)
    }

    /// Broker returned a transport/5xx error while placing the order.
    #[must_use]
    pub fn broker_api_error(message: impl Into<String>) -> Self {
        Self::new("BROKER_API_ERROR", message)
    }

    /// Invalid symbol for this broker.
    #[must_use]
    pub fn invalid_symbol(symbol: &str) -> Self {
        Self::new("INVALID_SYMBOL", format!("Invalid symbol: {symbol}"))
    }

    /// Invalid quantity.
    #[must_use]
    pub fn invalid_quantity(reason: &str) -> Self {
        Self::new("INVALID_QUANTITY", format!("Invalid quantity: {reason}"))
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Reason an order was canceled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancelReason {
    /// Cancellation code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl CancelReason {
    /// Create a new cancel reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// User requested cancellation.
    #[must_use]
    pub fn user_requested() -> Self {
        Self::new("USER_REQUESTED", "Canceled by user request")
    }

    /// Broker-side order timeout: polling never observed a terminal status.
    #[must_use]
    pub fn order_timeout() -> Self {
        Self::new("ORDER_TIMEOUT", "Order timed out waiting for fill")
    }

    /// Run-level execution timeout fired before the order could resolve.
    #[must_use]
    pub fn execution_timeout() -> Self {
        Self::new(
            "EXECUTION_TIMEOUT",
            "Run exceeded the execution wall-clock timeout",
        )
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_new() {
        let reason = RejectReason::new("TEST", "Test message");
        assert_eq!(reason.code, "TEST");
        assert_eq!(reason.message, "Test message");
    }

    #[test]
    fn reject_reason_order_rejected() {
        let reason = RejectReason::order_rejected("insufficient funds");
        assert_eq!(reason.code, "ORDER_REJECTED");
    }

    #[test]
    fn reject_reason_broker_api_error() {
        let reason = RejectReason::broker_api_error("503 from Coinbase");
        assert_eq!(reason.code, "BROKER_API_ERROR");
    }

    #[test]
    fn reject_reason_display() {
        let reason = RejectReason::invalid_symbol("XYZ-USD");
        let display = format!("{reason}");
        assert!(display.contains("INVALID_SYMBOL"));
    }

    #[test]
    fn cancel_reason_user_requested() {
        let reason = CancelReason::user_requested();
        assert_eq!(reason.code, "USER_REQUESTED");
    }

    #[test]
    fn cancel_reason_order_timeout() {
        let reason = CancelReason::order_timeout();
        assert_eq!(reason.code, "ORDER_TIMEOUT");
    }

    #[test]
    fn cancel_reason_execution_timeout() {
        let reason = CancelReason::execution_timeout();
        assert_eq!(reason.code, "EXECUTION_TIMEOUT");
    }

    #[test]
    fn reject_reason_serde() {
        let reason = RejectReason::order_rejected("bad");
        let json = serde_json::to_string(&reason).unwrap();
        let parsed: RejectReason = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reason);
    }

    #[test]
    fn cancel_reason_serde() {
        let reason = CancelReason::user_requested();
        let json = serde_json::to_string(&reason).unwrap();
        let parsed: CancelReason = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reason);
    }
}
