use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{receiving::release_dock, Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{DIVERGENCES_RESOLVED, FINALIZATIONS},
    models::{Divergence, ReceivingOperation, ReceivingStatus, ResolutionDecision},
    services::divergence::settled_status,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveDivergenceCommand {
    pub divergence_id: Uuid,
    pub decision: ResolutionDecision,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Justification must be between 1 and 1000 characters"
    ))]
    pub justification: String,
    #[validate(length(min = 1, max = 128, message = "Resolver identity is required"))]
    pub resolved_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolveDivergenceResult {
    pub divergence: Divergence,
    pub document_id: Uuid,
    pub document_status: ReceivingStatus,
    pub pending_divergences: usize,
    /// Volumes moved to staging when this resolution settled the document
    pub volumes_stored: Option<usize>,
}

#[async_trait]
impl Command for ResolveDivergenceCommand {
    type Result = ResolveDivergenceResult;

    #[instrument(skip(self, ctx, event_sender), fields(divergence_id = %self.divergence_id, decision = %self.decision))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::ResolveDivergence;
        self.validate()?;

        let cell = ctx.store.cell_for_divergence(self.divergence_id)?;
        let admission = cell.try_exclusive(operation)?;

        let (result, staging) = {
            let mut state = cell.state()?;
            let document_id = state.document.id;
            let already_resolved = state
                .divergences
                .iter()
                .find(|d| d.id == self.divergence_id)
                .map(|d| !d.is_pending())
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Divergence {} not found", self.divergence_id))
                })?;
            if already_resolved {
                return Err(ServiceError::immutable(format!(
                    "divergence {} is already resolved",
                    self.divergence_id
                )));
            }
            operation.ensure_permitted(state.document.status)?;
            let staging = state.document.staging_location_id.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "divergent document {} has no staging location",
                    document_id
                ))
            })?;

            let divergence = state
                .divergence_mut(self.divergence_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Divergence {} not found", self.divergence_id))
                })?;
            divergence.resolve(
                self.decision,
                self.justification.trim(),
                self.resolved_by.trim(),
            )?;
            let divergence = divergence.clone();

            let volumes_stored = match settled_status(&state.divergences) {
                Some(next) => {
                    let note = Some(format!("divergences settled by {}", self.resolved_by.trim()));
                    state.document.transition_to(next, operation, note)?;
                    let stored = state.volumes.store_active(staging, Utc::now());
                    release_dock(&state, &ctx.docks);
                    Some(stored)
                }
                None => {
                    state.document.touch();
                    None
                }
            };

            let result = ResolveDivergenceResult {
                divergence,
                document_id,
                document_status: state.document.status,
                pending_divergences: state.pending_divergences(),
                volumes_stored,
            };
            (result, staging)
        };
        drop(admission);

        DIVERGENCES_RESOLVED
            .with_label_values(&[self.decision.as_ref()])
            .inc();
        info!(
            document_id = %result.document_id,
            document_status = %result.document_status,
            pending = result.pending_divergences,
            "Divergence resolved"
        );
        event_sender.publish(Event::DivergenceResolved {
            document_id: result.document_id,
            divergence_id: self.divergence_id,
            decision: self.decision,
            resolved_by: self.resolved_by.trim().to_string(),
        });

        if let Some(volumes_stored) = result.volumes_stored {
            publish_settlement(&event_sender, &result, staging, volumes_stored);
        }

        Ok(result)
    }
}

/// The last resolution completes the held finalize, as finalized or blocked.
fn publish_settlement(
    event_sender: &EventSender,
    result: &ResolveDivergenceResult,
    staging_location_id: Uuid,
    volumes_stored: usize,
) {
    let event = if result.document_status == ReceivingStatus::Blocked {
        FINALIZATIONS.with_label_values(&["blocked"]).inc();
        Event::DocumentBlocked {
            document_id: result.document_id,
            staging_location_id,
            volumes_stored,
        }
    } else {
        FINALIZATIONS.with_label_values(&["finalized"]).inc();
        Event::DocumentFinalized {
            document_id: result.document_id,
            staging_location_id,
            volumes_stored,
            finalized_at: Utc::now(),
        }
    };
    event_sender.publish(event);
}
