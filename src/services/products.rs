use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::ProductRef;

/// Resolves scanned identifiers (SKU or barcode) to canonical products.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<Option<ProductRef>, ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    products: DashMap<Uuid, ProductRef>,
    identifiers: DashMap<String, Uuid>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = ProductRef>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    pub fn upsert(&self, product: ProductRef) {
        self.identifiers
            .insert(normalize(&product.sku), product.id);
        for barcode in &product.barcodes {
            self.identifiers.insert(normalize(barcode), product.id);
        }
        self.products.insert(product.id, product);
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_ascii_uppercase()
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn resolve(&self, identifier: &str) -> Result<Option<ProductRef>, ServiceError> {
        let Some(product_id) = self
            .identifiers
            .get(&normalize(identifier))
            .map(|entry| *entry.value())
        else {
            return Ok(None);
        };
        Ok(self
            .products
            .get(&product_id)
            .map(|p| p.value().clone())
            .filter(|p| p.matches(identifier)))
    }
}
