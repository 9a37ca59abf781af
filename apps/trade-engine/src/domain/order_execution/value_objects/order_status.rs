//! Order status in the trade truth lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status as reported back to the user and persisted on the Order row.
///
/// An order is reported as "filled" to the user only when `status == FILLED`
/// **and** at least one Fill row is attached; any other status with
/// `filled_qty == 0` renders as "submitted, awaiting fill".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order accepted by the orchestrator and sent to the broker.
    Submitted,
    /// Broker has opened the order on the book.
    Open,
    /// Broker accepted the order but hasn't opened it yet.
    Pending,
    /// Broker-side resting state awaiting execution.
    PendingFill,
    /// Order partially filled.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Order canceled.
    Canceled,
    /// Order rejected by the broker.
    Rejected,
    /// Order expired without filling.
    Expired,
    /// Order placement or reconciliation failed.
    Failed,
    /// Polling for terminal status timed out.
    Timeout,
}

impl OrderStatus {
    /// Returns true if no further status change is expected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled
                | Self::Canceled
                | Self::Rejected
                | Self::Expired
                | Self::Failed
                | Self::Timeout
        )
    }

    /// Returns true if the order is still live at the broker.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Submitted
                | Self::Open
                | Self::Pending
                | Self::PendingFill
                | Self::PartiallyFilled
        )
    }

    /// Returns true if the order can still be canceled.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Open | Self::Pending | Self::PendingFill
        )
    }

    /// Returns true if the order can receive fills.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        matches!(
            self,
            Self::Submitted
                | Self::Open
                | Self::Pending
                | Self::PendingFill
                | Self::PartiallyFilled
        )
    }

    /// Returns true if this status leaves the broker outcome unresolved
    /// (polling stopped before a terminal state was observed).
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Timeout | Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Open => write!(f, "OPEN"),
            Self::Pending => write!(f, "PENDING"),
            Self::PendingFill => write!(f, "PENDING_FILL"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_terminal_covers_every_terminal_status() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Timeout.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
    }

    #[test]
    fn is_active_matches_non_terminal_broker_states() {
        assert!(OrderStatus::Submitted.is_active());
        assert!(OrderStatus::Open.is_active());
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::PendingFill.is_active());
        assert!(OrderStatus::PartiallyFilled.is_active());
        assert!(!OrderStatus::Filled.is_active());
        assert!(!OrderStatus::Timeout.is_active());
    }

    #[test]
    fn is_cancelable_excludes_partially_filled() {
        assert!(OrderStatus::Open.is_cancelable());
        assert!(!OrderStatus::PartiallyFilled.is_cancelable());
        assert!(!OrderStatus::Filled.is_cancelable());
    }

    #[test]
    fn can_fill_matches_active_broker_states() {
        assert!(OrderStatus::Open.can_fill());
        assert!(OrderStatus::PartiallyFilled.can_fill());
        assert!(!OrderStatus::Filled.can_fill());
        assert!(!OrderStatus::Canceled.can_fill());
    }

    #[test]
    fn timeout_and_failed_are_unresolved_not_terminal_fills() {
        assert!(OrderStatus::Timeout.is_unresolved());
        assert!(OrderStatus::Failed.is_unresolved());
        assert!(!OrderStatus::Filled.is_unresolved());
    }

    #[test]
    fn display_matches_wire_format() {
        assert_eq!(format!("{}", OrderStatus::PendingFill), "PENDING_FILL");
        assert_eq!(format!("{}", OrderStatus::PartiallyFilled), "PARTIALLY_FILLED");
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&OrderStatus::PendingFill).unwrap();
        assert_eq!(json, "\"PENDING_FILL\"");
        let parsed: OrderStatus = serde_json::from_str("\"TIMEOUT\"").unwrap();
        assert_eq!(parsed, OrderStatus::Timeout);
    }
}
