use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Lifecycle of a physical unit.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeStatus {
    InTransit,
    Stored,
    Reversed,
}

/// Quality disposition recorded when the unit is counted.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum QualityStatus {
    #[default]
    Available,
    Blocked,
    Damaged,
}

/// Product content of a volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeItem {
    pub product_id: Uuid,
    pub sku: String,
    pub quantity: u32,
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub serial: Option<String>,
}

/// Audit record left on a voided volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeReversal {
    pub reason: String,
    pub reversed_by: Option<String>,
    pub reversed_at: DateTime<Utc>,
}

/// A uniquely labeled physical unit (LPN) created during counting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: Uuid,
    /// Scannable license plate code, unique across all documents
    pub code: String,
    pub document_id: Uuid,
    pub items: Vec<VolumeItem>,
    pub location_id: Option<Uuid>,
    pub quality_status: QualityStatus,
    pub status: VolumeStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub stored_at: Option<DateTime<Utc>>,
    pub reversal: Option<VolumeReversal>,
}

impl Volume {
    pub fn is_active(&self) -> bool {
        self.status != VolumeStatus::Reversed
    }

    pub fn quantity_of(&self, product_id: Uuid) -> u64 {
        self.items
            .iter()
            .filter(|item| item.product_id == product_id)
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| item.serial.as_deref())
    }
}
