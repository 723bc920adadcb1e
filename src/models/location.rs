use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// Functional classification of a warehouse address.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LocationType {
    Reserve,
    Picking,
    Staging,
    Dock,
    Damage,
    Quarantine,
}

/// Warehouse address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    /// Address code, structured as `aisle-rack-level-slot` for storage positions
    pub code: String,
    pub location_type: LocationType,
    pub weight_capacity_kg: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub blocked: bool,
}

fn default_true() -> bool {
    true
}

impl Location {
    pub fn new(code: impl Into<String>, location_type: LocationType) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            location_type,
            weight_capacity_kg: None,
            active: true,
            blocked: false,
        }
    }

    /// Active and not blocked.
    pub fn is_usable(&self) -> bool {
        self.active && !self.blocked
    }

    /// Structured address, when the code follows the four-part convention.
    pub fn address(&self) -> Option<LocationAddress> {
        self.code.parse().ok()
    }
}

/// Decoded `aisle-rack-level-slot` address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationAddress {
    pub aisle: String,
    pub rack: String,
    pub level: String,
    pub slot: String,
}

impl FromStr for LocationAddress {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = code.trim().split('-').collect();
        if parts.len() != 4 {
            return Err(format!(
                "location code '{}' must have 4 segments (aisle-rack-level-slot)",
                code
            ));
        }
        if let Some(bad) = parts
            .iter()
            .find(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(format!(
                "location code '{}' has an invalid segment '{}'",
                code, bad
            ));
        }

        Ok(Self {
            aisle: parts[0].to_ascii_uppercase(),
            rack: parts[1].to_ascii_uppercase(),
            level: parts[2].to_ascii_uppercase(),
            slot: parts[3].to_ascii_uppercase(),
        })
    }
}

impl fmt::Display for LocationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.aisle, self.rack, self.level, self.slot)
    }
}
