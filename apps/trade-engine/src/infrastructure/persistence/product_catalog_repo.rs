//! In-Memory Product Catalog Repository
//!
//! Holds the exchange's full product listing plus the timestamp of the
//! last successful refresh, so `needs_refresh` can be evaluated without a
//! round trip to the broker.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::product_catalog::{Product, ProductCatalogRepository};
use crate::domain::shared::{ProductId, Timestamp};

/// In-memory, process-local `ProductCatalogRepository`.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalogRepository {
    products: RwLock<HashMap<String, Product>>,
    last_refreshed_at: RwLock<Option<Timestamp>>,
}

impl InMemoryProductCatalogRepository {
    /// Construct an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductCatalogRepository for InMemoryProductCatalogRepository {
    async fn upsert_all(&self, products: Vec<Product>) {
        let mut store = self.products.write().unwrap();
        for product in products {
            store.insert(product.product_id.as_str().to_string(), product);
        }
        *self.last_refreshed_at.write().unwrap() = Some(Timestamp::now());
    }

    async fn get_product(&self, product_id: &ProductId) -> Option<Product> {
        self.products.read().unwrap().get(product_id.as_str()).cloned()
    }

    async fn get_all_tradeable(&self, quote_currency: &str) -> Vec<ProductId> {
        self.products
            .read()
            .unwrap()
            .values()
            .filter(|p| p.is_tradeable() && p.quote_currency.eq_ignore_ascii_case(quote_currency))
            .map(|p| p.product_id.clone())
            .collect()
    }

    async fn refresh_age_and_count(&self) -> (Duration, usize) {
        let count = self.products.read().unwrap().len();
        let age = self
            .last_refreshed_at
            .read()
            .unwrap()
            .map_or(Duration::MAX, |ts| {
                Timestamp::now()
                    .as_datetime()
                    .signed_duration_since(ts.as_datetime())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            });
        (age, count)
    }

    async fn last_refreshed_at(&self) -> Option<Timestamp> {
        *self.last_refreshed_at.read().unwrap()
    }
}
