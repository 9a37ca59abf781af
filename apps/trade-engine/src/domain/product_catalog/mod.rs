//! Product Catalog
//!
//! Stores every product the exchange currently lists, refreshed on a
//! background cadence. This is the floor of the four-tier market-metadata
//! precedence chain: when the live brokerage call and its cache both miss,
//! the catalog is still an authoritative listing (just not a verified one).

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::shared::{ProductId, Timestamp};

/// Lifecycle status of a product on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Trading normally.
    Online,
    /// Temporarily unavailable.
    Offline,
    /// Only cancellations are accepted, no new orders.
    CancelOnly,
    /// Permanently removed from the exchange.
    Delisted,
}

/// A catalog entry for a single tradable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Exchange product identifier, e.g. `BTC-USD`.
    pub product_id: ProductId,
    /// Base currency of the pair, e.g. `BTC`.
    pub base_currency: String,
    /// Quote currency of the pair, e.g. `USD`.
    pub quote_currency: String,
    /// Minimum order size, expressed in base units. Never to be confused
    /// with `quote_increment`.
    pub base_min_size: Decimal,
    /// Smallest increment a base-unit order size may be aligned to.
    pub base_increment: Decimal,
    /// Smallest increment a quote-unit (USD) amount may be aligned to.
    pub quote_increment: Decimal,
    /// Minimum notional (USD) accepted for a market order on this product.
    pub min_market_funds: Decimal,
    /// Current exchange-reported status.
    pub status: ProductStatus,
    /// Whether the exchange has disabled trading on this product.
    pub trading_disabled: bool,
}

impl Product {
    /// A product only permits market orders when it is online and trading
    /// is not separately disabled.
    #[must_use]
    pub const fn is_tradeable(&self) -> bool {
        matches!(self.status, ProductStatus::Online) && !self.trading_disabled
    }
}

/// Age beyond which the catalog is considered stale and due a refresh.
pub const CATALOG_REFRESH_AGE: Duration = Duration::from_secs(6 * 3600);

/// Whether the catalog needs a background refresh.
#[must_use]
pub fn needs_refresh(last_refresh_age: Duration, row_count: usize) -> bool {
    last_refresh_age > CATALOG_REFRESH_AGE || row_count == 0
}

/// Generic floor used when a product's own `base_min_size` is missing and no
/// per-product safe value is known. Deliberately conservative.
pub const GENERIC_BASE_MIN_SIZE_FLOOR: Decimal = dec!(0.00000001);

/// Built-in safe `base_min_size` values for major assets, used as a last
/// defensive substitute when a catalog row's own value is null, empty, or
/// `"0"`. Never substitutes `quote_increment` for `base_min_size`.
const SAFE_BASE_MIN_SIZE_TABLE: &[(&str, Decimal)] = &[
    ("BTC", dec!(0.00001)),
    ("ETH", dec!(0.0001)),
    ("SOL", dec!(0.001)),
    ("USDC", dec!(1)),
];

/// Look up the defensive `base_min_size` substitute for a base currency.
#[must_use]
pub fn safe_base_min_size(base_currency: &str) -> Decimal {
    SAFE_BASE_MIN_SIZE_TABLE
        .iter()
        .find(|(sym, _)| sym.eq_ignore_ascii_case(base_currency))
        .map_or(GENERIC_BASE_MIN_SIZE_FLOOR, |(_, v)| *v)
}

/// Substitute a product's `base_min_size` when the stored value is missing
/// or degenerate (null/empty/zero), per the catalog's defensive read path.
#[must_use]
pub fn effective_base_min_size(product: &Product) -> Decimal {
    if product.base_min_size.is_zero() {
        safe_base_min_size(&product.base_currency)
    } else {
        product.base_min_size
    }
}

/// Telemetry counter for metadata `401` responses, surfaced for ops.
#[derive(Debug, Default)]
pub struct MetadataTelemetry {
    unauthorized_count: AtomicU64,
}

impl MetadataTelemetry {
    /// Record a `401` from the metadata endpoint, returning the new total.
    pub fn record_metadata_401(&self) -> u64 {
        self.unauthorized_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current total of recorded `401`s.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.unauthorized_count.load(Ordering::Relaxed)
    }
}

/// Persistence abstraction for the product catalog.
#[async_trait::async_trait]
pub trait ProductCatalogRepository: Send + Sync {
    /// Upsert a full batch of products by `product_id`. Idempotent: the
    /// same input list must produce the same stored rows.
    async fn upsert_all(&self, products: Vec<Product>);

    /// Look up a single product.
    async fn get_product(&self, product_id: &ProductId) -> Option<Product>;

    /// Whether the product is currently tradeable.
    async fn is_tradeable(&self, product_id: &ProductId) -> bool {
        self.get_product(product_id)
            .await
            .is_some_and(|p| p.is_tradeable())
    }

    /// All tradeable product IDs quoted in the given currency.
    async fn get_all_tradeable(&self, quote_currency: &str) -> Vec<ProductId>;

    /// Age of the most recent successful refresh, and current row count.
    async fn refresh_age_and_count(&self) -> (Duration, usize);

    /// Timestamp of the most recent refresh, if any has occurred.
    async fn last_refreshed_at(&self) -> Option<Timestamp>;
}

#[async_trait::async_trait]
impl<T: ProductCatalogRepository + ?Sized> ProductCatalogRepository for std::sync::Arc<T> {
    async fn upsert_all(&self, products: Vec<Product>) {
        (**self).upsert_all(products).await;
    }

    async fn get_product(&self, product_id: &ProductId) -> Option<Product> {
        (**self).get_product(product_id).await
    }

    async fn get_all_tradeable(&self, quote_currency: &str) -> Vec<ProductId> {
        (**self).get_all_tradeable(quote_currency).await
    }

    async fn refresh_age_and_count(&self) -> (Duration, usize) {
        (**self).refresh_age_and_count().await
    }

    async fn last_refreshed_at(&self) -> Option<Timestamp> {
        (**self).last_refreshed_at().await
    }
}
