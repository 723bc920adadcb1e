pub mod assign_dock_command;
pub mod cancel_command;
pub mod close_dispute_command;
pub mod confer_item_command;
pub mod create_document_command;
pub mod finalize_command;
pub mod reset_conference_command;
pub mod resolve_divergence_command;
pub mod reverse_volume_command;

use chrono::Utc;
use tracing::debug;

use crate::errors::ServiceError;
use crate::services::{locations::DockBoard, lpn::LpnIssuer};
use crate::store::{DocumentState, ReceivingStore};

/// Destructive operations run only when the caller says so explicitly.
pub(crate) fn require_confirmation(confirm: bool, what: &str) -> Result<(), ServiceError> {
    if confirm {
        Ok(())
    } else {
        Err(ServiceError::validation(format!(
            "{} discards every counted volume and must be confirmed",
            what
        )))
    }
}

/// Hard-deletes the conference: volumes leave the log and the code index,
/// pending divergences leave the divergence index. Resolved divergences are
/// audit records and stay listed, marked superseded. Returns how many
/// volumes went.
pub(crate) fn discard_conference(
    state: &mut DocumentState,
    store: &ReceivingStore,
    issuer: &LpnIssuer,
) -> usize {
    let volumes = state.volumes.drain();
    for volume in &volumes {
        issuer.retire(&volume.code);
        store.unindex_volume(volume.id);
    }
    let now = Utc::now();
    state.divergences.retain_mut(|divergence| {
        if divergence.is_pending() {
            store.unindex_divergence(divergence.id);
            false
        } else {
            divergence.supersede(now);
            true
        }
    });
    state.document.staging_location_id = None;
    debug!(
        document_id = %state.document.id,
        volumes = volumes.len(),
        "conference discarded"
    );
    volumes.len()
}

/// Frees the document's dock on the board, keeping the reference on the
/// document for the audit trail.
pub(crate) fn release_dock(state: &DocumentState, docks: &DockBoard) {
    if let Some(dock_id) = state.document.dock_location_id {
        docks.release(dock_id, state.document.id);
    }
}
