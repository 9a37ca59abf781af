//! Market Metadata Service
//!
//! Per-product rule resolver with a four-tier precedence chain: fresh cache,
//! live brokerage call (with backoff), stale cache, then the product
//! catalog, then a safe fallback table. Exposes both an async entry point
//! and a blocking one with identical precedence, since execution-time code
//! runs outside an async scheduler.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::broker::{BrokerRetryPolicy, ExponentialBackoffCalculator, is_retryable_status};
use crate::domain::product_catalog::{
    MetadataTelemetry, Product, ProductCatalogRepository, effective_base_min_size, safe_base_min_size,
};
use crate::domain::shared::{ProductId, Timestamp};

/// How the rules returned from [`resolve`] were sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// An authoritative broker preview call.
    Preview,
    /// The background-refreshed product catalog.
    Catalog,
    /// The built-in safe fallback table.
    Fallback,
    /// No tier produced a result; the action must be blocked.
    Unavailable,
}

/// The resolved trading rules for a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProductRules {
    /// Product these rules describe.
    pub product_id: ProductId,
    /// Which tier produced this result.
    pub rule_source: RuleSource,
    /// Minimum order size in base units.
    pub base_min_size: Option<Decimal>,
    /// Base-unit size increment.
    pub base_increment: Option<Decimal>,
    /// Minimum notional (USD) for a market order.
    pub min_market_funds: Option<Decimal>,
    /// Exchange-reported tradability flag.
    pub trading_disabled: bool,
    /// `true` only when `rule_source == Preview` and the call actually
    /// succeeded; otherwise downstream messages must label these rules
    /// "(estimated)".
    pub verified: bool,
}

impl ResolvedProductRules {
    fn unavailable(product_id: ProductId) -> Self {
        Self {
            product_id,
            rule_source: RuleSource::Unavailable,
            base_min_size: None,
            base_increment: None,
            min_market_funds: None,
            trading_disabled: true,
            verified: false,
        }
    }
}

/// Raw rules as returned by a live brokerage metadata/preview call.
#[derive(Debug, Clone)]
pub struct RawProductMetadata {
    /// Minimum order size in base units.
    pub base_min_size: Decimal,
    /// Base-unit size increment.
    pub base_increment: Decimal,
    /// Smallest USD increment.
    pub quote_increment: Decimal,
    /// Minimum notional (USD).
    pub min_market_funds: Decimal,
    /// Exchange-reported tradability flag.
    pub trading_disabled: bool,
}

/// Outcome of a single live-tier fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFetchError {
    /// The broker returned an HTTP status, retryable or not.
    Status(u16),
    /// Transport-level failure (timeout, connection reset, etc).
    Transport,
}

/// Driven port for the live brokerage metadata/preview call. Implemented by
/// the Coinbase adapter in infrastructure.
#[async_trait]
pub trait MetadataBrokerPort: Send + Sync {
    /// Fetch live rules for one product.
    async fn fetch_metadata(
        &self,
        product_id: &ProductId,
    ) -> Result<RawProductMetadata, MetadataFetchError>;
}

fn cache_age(fetched_at: Timestamp) -> Duration {
    let seconds = Timestamp::now().duration_since(fetched_at).num_seconds();
    Duration::from_secs(seconds.max(0) as u64)
}

struct CacheEntry {
    rules: ResolvedProductRules,
    fetched_at: Timestamp,
}

/// Age past which a cached entry is no longer "fresh" (tier 1) but may
/// still serve as "stale" (tier 3).
pub const FRESH_CACHE_AGE: Duration = Duration::from_secs(3600);
/// Age past which even a stale cache entry is discarded.
pub const STALE_CACHE_AGE: Duration = Duration::from_secs(24 * 3600);

/// Combines the live broker call, a cache, the product catalog, and the
/// safe fallback table into the four-tier resolution chain.
pub struct MarketMetadataService<B: MetadataBrokerPort, C: ProductCatalogRepository> {
    cache: RwLock<HashMap<String, CacheEntry>>,
    broker: B,
    catalog: C,
    telemetry: MetadataTelemetry,
    retry_policy: BrokerRetryPolicy,
}

impl<B: MetadataBrokerPort, C: ProductCatalogRepository> MarketMetadataService<B, C> {
    /// Construct a service over a broker port and the product catalog.
    pub fn new(broker: B, catalog: C) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            broker,
            catalog,
            telemetry: MetadataTelemetry::default(),
            retry_policy: BrokerRetryPolicy::new(
                3,
                Duration::from_secs(1),
                Duration::from_secs(4),
                2.0,
                0.0,
            ),
        }
    }

    /// Telemetry counters (currently just `401` count) for ops surfacing.
    #[must_use]
    pub const fn telemetry(&self) -> &MetadataTelemetry {
        &self.telemetry
    }

    /// Resolve rules for a product, following the four-tier precedence
    /// chain. `allow_stale` gates tier 3.
    pub async fn resolve(&self, product_id: &ProductId, allow_stale: bool) -> ResolvedProductRules {
        if let Some(fresh) = self.fresh_cache_hit(product_id) {
            return fresh;
        }

        if let Some(live) = self.try_live_fetch(product_id).await {
            return live;
        }

        if allow_stale && let Some(stale) = self.stale_cache_hit(product_id) {
            return stale;
        }

        if let Some(product) = self.catalog.get_product(product_id).await {
            return self.rules_from_catalog(product);
        }

        self.rules_from_fallback(product_id)
    }

    /// Synchronous entry point with identical precedence, for execution-time
    /// code that must not require a reactor.
    pub fn resolve_blocking(&self, product_id: &ProductId, allow_stale: bool) -> ResolvedProductRules {
        tokio::runtime::Handle::current().block_on(self.resolve(product_id, allow_stale))
    }

    fn fresh_cache_hit(&self, product_id: &ProductId) -> Option<ResolvedProductRules> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(product_id.as_str())?;
        if cache_age(entry.fetched_at) <= FRESH_CACHE_AGE {
            Some(entry.rules.clone())
        } else {
            None
        }
    }

    fn stale_cache_hit(&self, product_id: &ProductId) -> Option<ResolvedProductRules> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(product_id.as_str())?;
        if cache_age(entry.fetched_at) <= STALE_CACHE_AGE {
            Some(entry.rules.clone())
        } else {
            None
        }
    }

    async fn try_live_fetch(&self, product_id: &ProductId) -> Option<ResolvedProductRules> {
        let mut backoff = ExponentialBackoffCalculator::new(&self.retry_policy);

        loop {
            match self.broker.fetch_metadata(product_id).await {
                Ok(raw) => {
                    let rules = ResolvedProductRules {
                        product_id: product_id.clone(),
                        rule_source: RuleSource::Preview,
                        base_min_size: Some(raw.base_min_size),
                        base_increment: Some(raw.base_increment),
                        min_market_funds: Some(raw.min_market_funds),
                        trading_disabled: raw.trading_disabled,
                        verified: true,
                    };
                    self.cache_rules(product_id, &rules);
                    return Some(rules);
                }
                Err(MetadataFetchError::Status(401)) => {
                    self.telemetry.record_metadata_401();
                    return None;
                }
                Err(MetadataFetchError::Status(status)) if !is_retryable_status(status) => {
                    return None;
                }
                Err(_) => {
                    if backoff.next_backoff().is_none() {
                        return None;
                    }
                }
            }
        }
    }

    fn cache_rules(&self, product_id: &ProductId, rules: &ResolvedProductRules) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                product_id.as_str().to_string(),
                CacheEntry {
                    rules: rules.clone(),
                    fetched_at: Timestamp::now(),
                },
            );
        }
    }

    fn rules_from_catalog(&self, product: Product) -> ResolvedProductRules {
        ResolvedProductRules {
            product_id: product.product_id.clone(),
            rule_source: RuleSource::Catalog,
            base_min_size: Some(effective_base_min_size(&product)),
            base_increment: Some(product.base_increment),
            min_market_funds: Some(product.min_market_funds),
            trading_disabled: product.trading_disabled,
            verified: false,
        }
    }

    fn rules_from_fallback(&self, product_id: &ProductId) -> ResolvedProductRules {
        let base_currency = product_id
            .as_str()
            .split('-')
            .next()
            .unwrap_or(product_id.as_str());
        let fallback_min = safe_base_min_size(base_currency);
        if fallback_min == crate::domain::product_catalog::GENERIC_BASE_MIN_SIZE_FLOOR
            && !["BTC", "ETH", "SOL", "USDC"].contains(&base_currency)
        {
            return ResolvedProductRules::unavailable(product_id.clone());
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product_catalog::ProductStatus;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct AlwaysFailBroker {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl MetadataBrokerPort for AlwaysFailBroker {
        async fn fetch_metadata(
            &self,
            _product_id: &ProductId,
        ) -> Result<RawProductMetadata, MetadataFetchError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(MetadataFetchError::Status(503))
        }
    }

    struct UnauthorizedBroker;

    #[async_trait]
    impl MetadataBrokerPort for UnauthorizedBroker {
        async fn fetch_metadata(
            &self,
            _product_id: &ProductId,
        ) -> Result<RawProductMetadata, MetadataFetchError> {
            Err(MetadataFetchError::Status(401))
        }
    }

    struct SucceedingBroker;

    #[async_trait]
    impl MetadataBrokerPort for SucceedingBroker {
        async fn fetch_metadata(
            &self,
            product_id: &ProductId,
        ) -> Result<RawProductMetadata, MetadataFetchError> {
            Ok(RawProductMetadata {
                base_min_size: dec!(0.00001),
                base_increment: dec!(0.00000001),
                quote_increment: dec!(0.01),
                min_market_funds: dec!(1),
                trading_disabled: false,
            })
            .map(|r| {
                let _ = product_id;
                r
            })
        }
    }

    struct EmptyCatalog;

    #[async_trait]
    impl ProductCatalogRepository for EmptyCatalog {
        async fn upsert_all(&self, _products: Vec<Product>) {}
        async fn get_product(&self, _product_id: &ProductId) -> Option<Product> {
            None
        }
        async fn get_all_tradeable(&self, _quote_currency: &str) -> Vec<ProductId> {
            vec![]
        }
        async fn refresh_age_and_count(&self) -> (Duration, usize) {
            (Duration::ZERO, 0)
        }
        async fn last_refreshed_at(&self) -> Option<Timestamp> {
            None
        }
    }

    struct CatalogWithBtc;

    #[async_trait]
    impl ProductCatalogRepository for CatalogWithBtc {
        async fn upsert_all(&self, _products: Vec<Product>) {}
        async fn get_product(&self, product_id: &ProductId) -> Option<Product> {
            if product_id.as_str() == "BTC-USD" {
                Some(Product {
                    product_id: product_id.clone(),
                    base_currency: "BTC".to_string(),
                    quote_currency: "USD".to_string(),
                    base_min_size: dec!(0.00001),
                    base_increment: dec!(0.00000001),
                    quote_increment: dec!(0.01),
                    min_market_funds: dec!(1),
                    status: ProductStatus::Online,
                    trading_disabled: false,
                })
            } else {
                None
            }
        }
        async fn get_all_tradeable(&self, _quote_currency: &str) -> Vec<ProductId> {
            vec![]
        }
        async fn refresh_age_and_count(&self) -> (Duration, usize) {
            (Duration::ZERO, 1)
        }
        async fn last_refreshed_at(&self) -> Option<Timestamp> {
            Some(Timestamp::now())
        }
    }

    #[tokio::test]
    async fn live_success_is_verified_preview() {
        let service = MarketMetadataService::new(SucceedingBroker, EmptyCatalog);
        let rules = service.resolve(&ProductId::new("BTC-USD"), true).await;
        assert_eq!(rules.rule_source, RuleSource::Preview);
        assert!(rules.verified);
    }

    #[tokio::test]
    async fn falls_back_to_catalog_when_live_exhausts_retries() {
        let service = MarketMetadataService::new(
            AlwaysFailBroker {
                attempts: AtomicU32::new(0),
            },
            CatalogWithBtc,
        );
        let rules = service.resolve(&ProductId::new("BTC-USD"), false).await;
        assert_eq!(rules.rule_source, RuleSource::Catalog);
        assert!(!rules.verified);
    }

    #[tokio::test]
    async fn falls_back_to_safe_table_when_everything_misses() {
        let service = MarketMetadataService::new(
            AlwaysFailBroker {
                attempts: AtomicU32::new(0),
            },
            EmptyCatalog,
        );
        let rules = service.resolve(&ProductId::new("BTC-USD"), false).await;
        assert_eq!(rules.rule_source, RuleSource::Fallback);
        assert!(!rules.verified);
    }

    #[tokio::test]
    async fn unavailable_when_asset_unknown_everywhere() {
        let service = MarketMetadataService::new(
            AlwaysFailBroker {
                attempts: AtomicU32::new(0),
            },
            EmptyCatalog,
        );
        let rules = service
            .resolve(&ProductId::new("MOODENG-USD"), false)
            .await;
        assert_eq!(rules.rule_source, RuleSource::Unavailable);
    }

    #[tokio::test]
    async fn unauthorized_increments_telemetry_and_short_circuits() {
        let service = MarketMetadataService::new(UnauthorizedBroker, CatalogWithBtc);
        let rules = service.resolve(&ProductId::new("BTC-USD"), false).await;
        assert_eq!(rules.rule_source, RuleSource::Catalog);
        assert_eq!(service.telemetry().count(), 1);
    }
}
