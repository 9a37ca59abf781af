//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(TenantId, "Tenant identifier; carried through every operation.");
define_id!(ConversationId, "Chat conversation identifier.");
define_id!(ProductId, "Catalog product identifier, e.g. `BTC-USD`.");
define_id!(RunId, "Unique identifier for a DAG run.");
define_id!(DagNodeId, "Unique identifier for a DAG node row.");
define_id!(OrderId, "Unique identifier for an order (internal).");
define_id!(BrokerId, "Broker-side identifier for a submitted order.");
define_id!(FillId, "Unique identifier for a fill row.");
define_id!(ArtifactId, "Unique identifier for an artifact row.");
define_id!(RequestId, "Per-request correlation identifier (`X-Request-ID`).");

/// Prefix required on every confirmation identifier.
pub const CONFIRMATION_ID_PREFIX: &str = "conf_";

/// Confirmation identifier. Always carries the `conf_` prefix; malformed
/// values (missing prefix, empty suffix) are rejected by [`ConfirmationId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationId(String);

impl ConfirmationId {
    /// Generate a new, well-formed confirmation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{CONFIRMATION_ID_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Parse and validate a confirmation id from user input (e.g. a path
    /// parameter). Returns `None` for malformed ids, matching the HTTP
    /// layer's "malformed conf_id" 400 response.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let suffix = value.strip_prefix(CONFIRMATION_ID_PREFIX)?;
        if suffix.is_empty() {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ConfirmationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_and_display() {
        let id = OrderId::new("ord-123");
        assert_eq!(id.as_str(), "ord-123");
        assert_eq!(format!("{id}"), "ord-123");
    }

    #[test]
    fn order_id_generate_is_unique() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_equality() {
        let id1 = OrderId::new("ord-123");
        let id2 = OrderId::new("ord-123");
        let id3 = OrderId::new("ord-456");
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn order_id_from_string() {
        let id: OrderId = "ord-123".into();
        assert_eq!(id.as_str(), "ord-123");

        let id: OrderId = String::from("ord-456").into();
        assert_eq!(id.as_str(), "ord-456");
    }

    #[test]
    fn tenant_id_hash_works_for_collections() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(TenantId::new("tenant-1"));
        set.insert(TenantId::new("tenant-2"));
        set.insert(TenantId::new("tenant-1"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn product_id_serde_roundtrip() {
        let id = ProductId::new("BTC-USD");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"BTC-USD\"");
        let parsed: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn confirmation_id_generate_has_prefix() {
        let id = ConfirmationId::generate();
        assert!(id.as_str().starts_with(CONFIRMATION_ID_PREFIX));
    }

    #[test]
    fn confirmation_id_parse_accepts_well_formed() {
        let parsed = ConfirmationId::parse("conf_abc123").unwrap();
        assert_eq!(parsed.as_str(), "conf_abc123");
    }

    #[test]
    fn confirmation_id_parse_rejects_missing_prefix() {
        assert!(ConfirmationId::parse("abc123").is_none());
    }

    #[test]
    fn confirmation_id_parse_rejects_empty_suffix() {
        assert!(ConfirmationId::parse("conf_").is_none());
    }
}
