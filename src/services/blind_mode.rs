//! Blind conference policy.
//!
//! Expected-derived values reach callers only through the projections below,
//! which read the gate once per call. Internally the ledger and divergence
//! detection always see the real expected quantities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::models::{ReceivingLine, ReceivingStatus, StatusChange, Volume};
use crate::store::DocumentState;

/// Decides whether expected quantities may be disclosed to counting clients.
pub trait BlindModeGate: Send + Sync {
    fn expected_quantity_visible(&self) -> bool;
}

/// Process-wide system configuration holding the blind conference switch.
///
/// The workflow only reads it; the switch is flipped by whoever owns system
/// configuration.
#[derive(Debug)]
pub struct SystemConfiguration {
    blind_conference: AtomicBool,
}

impl SystemConfiguration {
    pub fn new(blind_conference: bool) -> Self {
        Self {
            blind_conference: AtomicBool::new(blind_conference),
        }
    }

    pub fn is_blind_conference(&self) -> bool {
        self.blind_conference.load(Ordering::Acquire)
    }

    pub fn set_blind_conference(&self, enabled: bool) {
        self.blind_conference.store(enabled, Ordering::Release);
    }
}

impl BlindModeGate for SystemConfiguration {
    fn expected_quantity_visible(&self) -> bool {
        !self.is_blind_conference()
    }
}

/// A document line as shown to a counting client.
///
/// In blind mode every field derived from the expected quantity is `None`;
/// only the raw counted quantity is disclosed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineView {
    pub line_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub description: Option<String>,
    pub unit_of_measure: String,
    pub counted_quantity: u64,
    pub expected_quantity: Option<u32>,
    pub remaining_quantity: Option<u64>,
    pub complete: Option<bool>,
}

/// Externally observable state of a receiving document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: Uuid,
    pub document_number: String,
    pub access_key: Option<String>,
    pub supplier_id: Uuid,
    pub issue_date: NaiveDate,
    pub status: ReceivingStatus,
    pub dock_location_id: Option<Uuid>,
    pub staging_location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
    pub expected_quantity_visible: bool,
    pub progress_percent: Option<f64>,
    pub lines: Vec<LineView>,
    pub volumes: Vec<Volume>,
    pub pending_divergences: usize,
    pub status_history: Vec<StatusChange>,
}

pub fn project_line(line: &ReceivingLine, counted: u64, visible: bool) -> LineView {
    let expected = u64::from(line.expected_quantity);
    LineView {
        line_id: line.id,
        product_id: line.product_id,
        sku: line.sku.clone(),
        description: line.description.clone(),
        unit_of_measure: line.unit_of_measure.clone(),
        counted_quantity: counted,
        expected_quantity: visible.then_some(line.expected_quantity),
        remaining_quantity: visible.then(|| expected.saturating_sub(counted)),
        complete: visible.then_some(counted >= expected),
    }
}

fn progress_if_visible(state: &DocumentState, visible: bool) -> Option<f64> {
    visible.then(|| state.ledger().progress_percent())
}

/// Conference progress, `None` in blind mode.
pub fn project_progress(state: &DocumentState, gate: &dyn BlindModeGate) -> Option<f64> {
    progress_if_visible(state, gate.expected_quantity_visible())
}

pub fn project_document(state: &DocumentState, gate: &dyn BlindModeGate) -> DocumentSnapshot {
    let visible = gate.expected_quantity_visible();
    let ledger = state.ledger();
    let document = &state.document;

    DocumentSnapshot {
        id: document.id,
        document_number: document.document_number.clone(),
        access_key: document.access_key.clone(),
        supplier_id: document.supplier_id,
        issue_date: document.issue_date,
        status: document.status,
        dock_location_id: document.dock_location_id,
        staging_location_id: document.staging_location_id,
        created_at: document.created_at,
        updated_at: document.updated_at,
        version: document.version,
        expected_quantity_visible: visible,
        progress_percent: progress_if_visible(state, visible),
        lines: state
            .lines
            .iter()
            .map(|line| project_line(line, ledger.counted(line.product_id), visible))
            .collect(),
        volumes: state.volumes.iter().cloned().collect(),
        pending_divergences: state.divergences.iter().filter(|d| d.is_pending()).count(),
        status_history: document.status_history.clone(),
    }
}
