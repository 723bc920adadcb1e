use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    commands::{receiving::release_dock, Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{DIVERGENCES_RAISED, FINALIZATIONS},
    models::{DivergenceKind, LocationType, ReceivingOperation, ReceivingStatus},
    services::{divergence::DivergenceDetector, locations::require_location},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeCommand {
    pub document_id: Uuid,
    pub staging_location_id: Uuid,
    pub finalized_by: Option<String>,
}

/// Outcome of a finalize call. Divergence quantities are left out so the
/// counting client learns nothing about expected totals; reviewers read
/// them through the divergence list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalizeResult {
    pub document_id: Uuid,
    pub status: ReceivingStatus,
    pub staging_location_id: Uuid,
    pub divergence_ids: Vec<Uuid>,
    /// Volumes moved to staging; zero while divergences are pending
    pub volumes_stored: usize,
}

#[async_trait]
impl Command for FinalizeCommand {
    type Result = FinalizeResult;

    #[instrument(skip(self, ctx, event_sender), fields(document_id = %self.document_id))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::Finalize;
        let cell = ctx.store.cell(self.document_id)?;
        let admission = cell.try_exclusive(operation)?;

        operation.ensure_permitted(cell.state()?.document.status)?;
        let staging = require_location(
            ctx.locations.as_ref(),
            self.staging_location_id,
            LocationType::Staging,
        )
        .await?;

        let detector = DivergenceDetector::new(ctx.settings.divergence_tolerance);
        let (result, raised) = {
            let mut state = cell.state()?;
            operation.ensure_permitted(state.document.status)?;

            let divergences = detector.detect(self.document_id, &state.lines, &state.ledger());
            let raised: Vec<(Uuid, DivergenceKind)> =
                divergences.iter().map(|d| (d.id, d.kind)).collect();
            let note = self
                .finalized_by
                .as_ref()
                .map(|who| format!("finalized by {}", who));

            let volumes_stored = if divergences.is_empty() {
                state
                    .document
                    .transition_to(ReceivingStatus::Finalized, operation, note)?;
                let stored = state.volumes.store_active(staging.id, Utc::now());
                release_dock(&state, &ctx.docks);
                stored
            } else {
                state
                    .document
                    .transition_to(ReceivingStatus::Divergent, operation, note)?;
                for divergence in &divergences {
                    ctx.store.index_divergence(divergence.id, self.document_id);
                }
                state.divergences.extend(divergences);
                0
            };
            state.document.staging_location_id = Some(staging.id);

            let result = FinalizeResult {
                document_id: self.document_id,
                status: state.document.status,
                staging_location_id: staging.id,
                divergence_ids: raised.iter().map(|(id, _)| *id).collect(),
                volumes_stored,
            };
            (result, raised)
        };
        drop(admission);

        if raised.is_empty() {
            FINALIZATIONS.with_label_values(&["finalized"]).inc();
            info!(volumes_stored = result.volumes_stored, "Receiving document finalized");
            event_sender.publish(Event::DocumentFinalized {
                document_id: self.document_id,
                staging_location_id: staging.id,
                volumes_stored: result.volumes_stored,
                finalized_at: Utc::now(),
            });
        } else {
            FINALIZATIONS.with_label_values(&["divergent"]).inc();
            for (_, kind) in &raised {
                DIVERGENCES_RAISED.with_label_values(&[kind.as_ref()]).inc();
            }
            info!(divergences = raised.len(), "Receiving document is divergent");
            event_sender.publish(Event::DocumentDivergent {
                document_id: self.document_id,
                divergences: raised,
            });
        }

        Ok(result)
    }
}
