//! Reference data for the in-memory collaborators.
//!
//! ```json
//! {
//!   "locations": [{ "code": "DOCK-01", "location_type": "DOCK" }],
//!   "products":  [{ "sku": "ABC-1", "barcodes": ["7891234567895"], "lot_controlled": true }]
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::models::{Location, LocationType, ProductRef};
use crate::services::{locations::InMemoryLocationRegistry, products::InMemoryProductCatalog};

#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub locations: Vec<LocationSeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct LocationSeed {
    pub id: Option<Uuid>,
    pub code: String,
    pub location_type: LocationType,
    pub weight_capacity_kg: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub id: Option<Uuid>,
    pub sku: String,
    #[serde(default)]
    pub barcodes: Vec<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub lot_controlled: bool,
    #[serde(default)]
    pub expiry_controlled: bool,
}

fn default_true() -> bool {
    true
}

impl From<LocationSeed> for Location {
    fn from(seed: LocationSeed) -> Self {
        Location {
            id: seed.id.unwrap_or_else(Uuid::new_v4),
            code: seed.code,
            location_type: seed.location_type,
            weight_capacity_kg: seed.weight_capacity_kg,
            active: seed.active,
            blocked: seed.blocked,
        }
    }
}

impl From<ProductSeed> for ProductRef {
    fn from(seed: ProductSeed) -> Self {
        ProductRef {
            id: seed.id.unwrap_or_else(Uuid::new_v4),
            sku: seed.sku,
            barcodes: seed.barcodes,
            description: seed.description,
            lot_controlled: seed.lot_controlled,
            expiry_controlled: seed.expiry_controlled,
        }
    }
}

impl SeedData {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))
    }

    /// Builds the registries, logging what was loaded.
    pub fn into_collaborators(self) -> (InMemoryLocationRegistry, InMemoryProductCatalog) {
        info!(
            locations = self.locations.len(),
            products = self.products.len(),
            "Loading reference data"
        );
        let locations =
            InMemoryLocationRegistry::with_locations(self.locations.into_iter().map(Location::from));
        let products =
            InMemoryProductCatalog::with_products(self.products.into_iter().map(ProductRef::from));
        (locations, products)
    }
}
