use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One expected product entry on a receiving document.
///
/// Counted quantity is intentionally absent: it is always derived from the
/// document's active volumes by the conference ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub description: Option<String>,
    pub expected_quantity: u32,
    pub unit_of_measure: String,
}

impl ReceivingLine {
    pub fn new(
        product_id: Uuid,
        sku: String,
        description: Option<String>,
        expected_quantity: u32,
        unit_of_measure: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            sku,
            description,
            expected_quantity,
            unit_of_measure,
        }
    }
}
