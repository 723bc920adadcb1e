//! Conference ledger.
//!
//! Counted quantities are never stored: every total is a sum over the
//! document's append-only volume log, restricted to active (non-reversed)
//! volumes. The log keeps a per-product index so line totals do not scan
//! unrelated volumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{ReceivingLine, Volume, VolumeReversal, VolumeStatus};

/// Append-only log of the volumes counted against one document.
#[derive(Debug, Default, Clone)]
pub struct VolumeLog {
    volumes: Vec<Volume>,
    by_id: HashMap<Uuid, usize>,
    by_product: HashMap<Uuid, Vec<usize>>,
}

impl VolumeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, volume: Volume) {
        let index = self.volumes.len();
        self.by_id.insert(volume.id, index);
        for item in &volume.items {
            let slots = self.by_product.entry(item.product_id).or_default();
            if slots.last() != Some(&index) {
                slots.push(index);
            }
        }
        self.volumes.push(volume);
    }

    pub fn get(&self, volume_id: Uuid) -> Option<&Volume> {
        self.by_id.get(&volume_id).map(|&index| &self.volumes[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter().filter(|v| v.is_active())
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Sum of `product_id` across active volumes.
    pub fn active_quantity_of(&self, product_id: Uuid) -> u64 {
        self.by_product
            .get(&product_id)
            .map(|slots| {
                slots
                    .iter()
                    .map(|&index| &self.volumes[index])
                    .filter(|v| v.is_active())
                    .map(|v| v.quantity_of(product_id))
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Marks a volume reversed, excluding it from every derived total.
    pub fn reverse(
        &mut self,
        volume_id: Uuid,
        reversal: VolumeReversal,
    ) -> Result<&Volume, ServiceError> {
        let index = *self
            .by_id
            .get(&volume_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Volume {} not found", volume_id)))?;
        let volume = &mut self.volumes[index];
        if !volume.is_active() {
            return Err(ServiceError::validation(format!(
                "volume {} is already reversed",
                volume.code
            )));
        }

        volume.status = VolumeStatus::Reversed;
        volume.reversal = Some(reversal);
        Ok(&*volume)
    }

    /// Moves every active volume to `location_id` as stored stock.
    pub fn store_active(&mut self, location_id: Uuid, at: DateTime<Utc>) -> usize {
        let mut moved = 0;
        for volume in self.volumes.iter_mut().filter(|v| v.is_active()) {
            volume.location_id = Some(location_id);
            volume.status = VolumeStatus::Stored;
            volume.stored_at = Some(at);
            moved += 1;
        }
        moved
    }

    /// Empties the log, handing back what it held.
    pub fn drain(&mut self) -> Vec<Volume> {
        self.by_id.clear();
        self.by_product.clear();
        std::mem::take(&mut self.volumes)
    }
}

/// Expected against counted for one line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotal {
    pub line_id: Uuid,
    pub product_id: Uuid,
    pub expected_quantity: u32,
    pub counted_quantity: u64,
}

impl LineTotal {
    /// Counted minus expected.
    pub fn difference(&self) -> i64 {
        self.counted_quantity as i64 - i64::from(self.expected_quantity)
    }
}

/// Read-only arithmetic over a document's lines and volume log.
#[derive(Clone, Copy)]
pub struct ConferenceLedger<'a> {
    lines: &'a [ReceivingLine],
    log: &'a VolumeLog,
}

impl<'a> ConferenceLedger<'a> {
    pub fn new(lines: &'a [ReceivingLine], log: &'a VolumeLog) -> Self {
        Self { lines, log }
    }

    pub fn counted(&self, product_id: Uuid) -> u64 {
        self.log.active_quantity_of(product_id)
    }

    pub fn line_total(&self, line: &ReceivingLine) -> LineTotal {
        LineTotal {
            line_id: line.id,
            product_id: line.product_id,
            expected_quantity: line.expected_quantity,
            counted_quantity: self.counted(line.product_id),
        }
    }

    pub fn line_totals(&self) -> Vec<LineTotal> {
        self.lines.iter().map(|line| self.line_total(line)).collect()
    }

    pub fn total_expected(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.expected_quantity))
            .sum()
    }

    pub fn total_counted(&self) -> u64 {
        self.lines.iter().map(|line| self.counted(line.product_id)).sum()
    }

    /// `100 × Σcounted / Σexpected`, clamped to [0, 100]; 0 when nothing is expected.
    pub fn progress_percent(&self) -> f64 {
        let expected = self.total_expected();
        if expected == 0 {
            return 0.0;
        }
        let percent = 100.0 * self.total_counted() as f64 / expected as f64;
        percent.clamp(0.0, 100.0)
    }
}
