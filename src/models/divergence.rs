use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceKind {
    PhysicalSurplus,
    PhysicalShortage,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ResolutionStatus {
    Pending,
    Resolved,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ResolutionDecision {
    /// Counted quantity becomes the true on-hand quantity
    Accept,
    /// Discrepancy stays flagged for commercial dispute; goods are still released
    Reject,
}

/// A reviewed resolution. Present only once the divergence is resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub decision: ResolutionDecision,
    pub justification: String,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}

/// Mismatch between expected and counted quantity for one line, raised by finalize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    pub id: Uuid,
    pub document_id: Uuid,
    pub line_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub kind: DivergenceKind,
    pub expected_quantity: u32,
    pub counted_quantity: u64,
    /// Counted minus expected
    pub divergent_quantity: i64,
    pub status: ResolutionStatus,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    /// Set when the conference that raised it was reset or canceled after
    /// it had been resolved. The record itself stays as it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<DateTime<Utc>>,
}

impl Divergence {
    pub fn is_pending(&self) -> bool {
        self.status == ResolutionStatus::Pending
    }

    /// Whether it belongs to the document's latest finalize.
    pub fn is_current(&self) -> bool {
        self.superseded_at.is_none()
    }

    pub fn supersede(&mut self, at: DateTime<Utc>) {
        self.superseded_at.get_or_insert(at);
    }

    /// Applies a resolution once. A resolved divergence never changes again.
    pub fn resolve(
        &mut self,
        decision: ResolutionDecision,
        justification: &str,
        resolved_by: &str,
    ) -> Result<&Resolution, ServiceError> {
        let justification = justification.trim();
        if justification.is_empty() {
            return Err(ServiceError::validation(
                "divergence resolution requires a justification",
            ));
        }
        if !self.is_pending() {
            return Err(ServiceError::immutable(format!(
                "divergence {} is already resolved",
                self.id
            )));
        }

        self.status = ResolutionStatus::Resolved;
        Ok(&*self.resolution.insert(Resolution {
            decision,
            justification: justification.to_string(),
            resolved_by: resolved_by.to_string(),
            resolved_at: Utc::now(),
        }))
    }
}
