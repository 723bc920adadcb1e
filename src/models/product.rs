use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical product as resolved from a scanned SKU or barcode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: Uuid,
    pub sku: String,
    #[serde(default)]
    pub barcodes: Vec<String>,
    pub description: Option<String>,
    /// Every counted unit must carry a lot number
    #[serde(default)]
    pub lot_controlled: bool,
    /// Every counted unit must carry an expiry date
    #[serde(default)]
    pub expiry_controlled: bool,
}

impl ProductRef {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            barcodes: Vec::new(),
            description: None,
            lot_controlled: false,
            expiry_controlled: false,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcodes.push(barcode.into());
        self
    }

    pub fn lot_controlled(mut self) -> Self {
        self.lot_controlled = true;
        self
    }

    pub fn expiry_controlled(mut self) -> Self {
        self.expiry_controlled = true;
        self
    }

    /// True when `identifier` is this product's SKU or one of its barcodes.
    pub fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        self.sku.eq_ignore_ascii_case(identifier)
            || self
                .barcodes
                .iter()
                .any(|b| b.eq_ignore_ascii_case(identifier))
    }
}
