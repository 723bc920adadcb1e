//! In-memory home of receiving documents.
//!
//! Each document lives in its own [`DocumentCell`]: an admission gate that
//! decides which operations may run together, and a state mutex that is only
//! ever held for short synchronous sections (never across an `.await`).
//! Documents never share a gate, so work on different documents does not
//! contend.

use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::metrics::GATE_CONFLICTS;
use crate::models::{Divergence, ReceivingDocument, ReceivingLine, ReceivingOperation};
use crate::services::ledger::{ConferenceLedger, VolumeLog};

/// Everything a document owns.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub document: ReceivingDocument,
    pub lines: Vec<ReceivingLine>,
    pub volumes: VolumeLog,
    pub divergences: Vec<Divergence>,
}

impl DocumentState {
    pub fn new(document: ReceivingDocument, lines: Vec<ReceivingLine>) -> Self {
        Self {
            document,
            lines,
            volumes: VolumeLog::new(),
            divergences: Vec::new(),
        }
    }

    pub fn ledger(&self) -> ConferenceLedger<'_> {
        ConferenceLedger::new(&self.lines, &self.volumes)
    }

    pub fn line_for_product(&self, product_id: Uuid) -> Option<&ReceivingLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn divergence_mut(&mut self, divergence_id: Uuid) -> Option<&mut Divergence> {
        self.divergences.iter_mut().find(|d| d.id == divergence_id)
    }

    pub fn pending_divergences(&self) -> usize {
        self.divergences.iter().filter(|d| d.is_pending()).count()
    }
}

pub type SharedAdmission<'a> = RwLockReadGuard<'a, ()>;
pub type ExclusiveAdmission<'a> = RwLockWriteGuard<'a, ()>;

#[derive(Debug)]
pub struct DocumentCell {
    id: Uuid,
    gate: RwLock<()>,
    state: Mutex<DocumentState>,
}

impl DocumentCell {
    fn new(state: DocumentState) -> Self {
        Self {
            id: state.document.id,
            gate: RwLock::new(()),
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Admission for ledger mutations, which may run alongside each other.
    /// Fails immediately while an exclusive operation holds the document.
    pub fn try_shared(
        &self,
        operation: ReceivingOperation,
    ) -> Result<SharedAdmission<'_>, ServiceError> {
        self.gate
            .try_read()
            .map_err(|_| self.busy(operation))
    }

    /// Admission for operations that must see the document alone.
    /// Fails immediately while any other operation is admitted.
    pub fn try_exclusive(
        &self,
        operation: ReceivingOperation,
    ) -> Result<ExclusiveAdmission<'_>, ServiceError> {
        self.gate
            .try_write()
            .map_err(|_| self.busy(operation))
    }

    pub fn state(&self) -> Result<MutexGuard<'_, DocumentState>, ServiceError> {
        self.state.lock().map_err(|_| {
            ServiceError::InternalError(format!("state of document {} is poisoned", self.id))
        })
    }

    fn busy(&self, operation: ReceivingOperation) -> ServiceError {
        GATE_CONFLICTS
            .with_label_values(&[operation.label()])
            .inc();
        debug!(document_id = %self.id, operation = operation.label(), "document busy");
        ServiceError::conflict(format!(
            "document {} is busy with another operation; retry to {}",
            self.id, operation
        ))
    }
}

/// Documents plus the global indexes that resolve volumes and divergences
/// back to their owning document.
#[derive(Debug, Default)]
pub struct ReceivingStore {
    documents: DashMap<Uuid, Arc<DocumentCell>>,
    access_keys: DashMap<String, Uuid>,
    volume_owners: DashMap<Uuid, Uuid>,
    divergence_owners: DashMap<Uuid, Uuid>,
}

impl ReceivingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new document. Electronic access keys identify one shipment, so
    /// a key already registered is rejected.
    pub fn insert(&self, state: DocumentState) -> Result<Arc<DocumentCell>, ServiceError> {
        let id = state.document.id;
        if let Some(key) = state.document.access_key.clone() {
            match self.access_keys.entry(key) {
                Entry::Occupied(existing) => {
                    return Err(ServiceError::validation(format!(
                        "access key already registered on document {}",
                        existing.get()
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        let cell = Arc::new(DocumentCell::new(state));
        self.documents.insert(id, Arc::clone(&cell));
        Ok(cell)
    }

    pub fn cell(&self, document_id: Uuid) -> Result<Arc<DocumentCell>, ServiceError> {
        self.documents
            .get(&document_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Receiving document {} not found", document_id))
            })
    }

    pub fn cell_for_volume(&self, volume_id: Uuid) -> Result<Arc<DocumentCell>, ServiceError> {
        let document_id = self
            .volume_owners
            .get(&volume_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| ServiceError::NotFound(format!("Volume {} not found", volume_id)))?;
        self.cell(document_id)
    }

    pub fn cell_for_divergence(
        &self,
        divergence_id: Uuid,
    ) -> Result<Arc<DocumentCell>, ServiceError> {
        let document_id = self
            .divergence_owners
            .get(&divergence_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Divergence {} not found", divergence_id))
            })?;
        self.cell(document_id)
    }

    pub fn cells(&self) -> Vec<Arc<DocumentCell>> {
        self.documents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn index_volume(&self, volume_id: Uuid, document_id: Uuid) {
        self.volume_owners.insert(volume_id, document_id);
    }

    pub fn unindex_volume(&self, volume_id: Uuid) {
        self.volume_owners.remove(&volume_id);
    }

    pub fn index_divergence(&self, divergence_id: Uuid, document_id: Uuid) {
        self.divergence_owners.insert(divergence_id, document_id);
    }

    pub fn unindex_divergence(&self, divergence_id: Uuid) {
        self.divergence_owners.remove(&divergence_id);
    }
}
