use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{
        receiving::{discard_conference, release_dock, require_confirmation},
        Command, ReceivingContext,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ReceivingOperation, ReceivingStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelDocumentCommand {
    pub document_id: Uuid,
    /// Must be `true`; cancellation cannot be undone
    #[serde(default)]
    pub confirm: bool,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelDocumentResult {
    pub document_id: Uuid,
    pub previous_status: ReceivingStatus,
    pub status: ReceivingStatus,
    pub volumes_discarded: usize,
}

#[async_trait]
impl Command for CancelDocumentCommand {
    type Result = CancelDocumentResult;

    #[instrument(skip(self, ctx, event_sender), fields(document_id = %self.document_id))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::Cancel;
        self.validate()?;
        require_confirmation(self.confirm, "Canceling a receiving document")?;

        let cell = ctx.store.cell(self.document_id)?;
        let admission = cell.try_exclusive(operation)?;

        let result = {
            let mut state = cell.state()?;
            let previous_status = state.document.status;
            operation.ensure_permitted(previous_status)?;

            state
                .document
                .transition_to(ReceivingStatus::Canceled, operation, self.reason.clone())?;
            // A blocked document already released its goods to staging; those
            // volumes are stock now and stay where they are.
            let volumes_discarded = if previous_status == ReceivingStatus::Blocked {
                0
            } else {
                discard_conference(&mut state, &ctx.store, &ctx.issuer)
            };
            release_dock(&state, &ctx.docks);

            CancelDocumentResult {
                document_id: self.document_id,
                previous_status,
                status: state.document.status,
                volumes_discarded,
            }
        };
        drop(admission);

        info!(
            previous_status = %result.previous_status,
            volumes_discarded = result.volumes_discarded,
            "Receiving document canceled"
        );
        event_sender.publish(Event::DocumentCanceled {
            document_id: self.document_id,
            previous_status: result.previous_status,
            volumes_discarded: result.volumes_discarded,
        });

        Ok(result)
    }
}
