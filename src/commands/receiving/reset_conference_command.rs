use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{
        receiving::{discard_conference, require_confirmation},
        Command, ReceivingContext,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ReceivingOperation, ReceivingStatus},
};

/// Restarts counting from scratch while keeping the document and its dock.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetConferenceCommand {
    pub document_id: Uuid,
    #[serde(default)]
    pub confirm: bool,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetConferenceResult {
    pub document_id: Uuid,
    pub previous_status: ReceivingStatus,
    pub status: ReceivingStatus,
    pub volumes_discarded: usize,
}

#[async_trait]
impl Command for ResetConferenceCommand {
    type Result = ResetConferenceResult;

    #[instrument(skip(self, ctx, event_sender), fields(document_id = %self.document_id))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::ResetConference;
        self.validate()?;
        require_confirmation(self.confirm, "Resetting a conference")?;

        let cell = ctx.store.cell(self.document_id)?;
        let admission = cell.try_exclusive(operation)?;

        let result = {
            let mut state = cell.state()?;
            let previous_status = state.document.status;
            operation.ensure_permitted(previous_status)?;

            state.document.transition_to(
                ReceivingStatus::AwaitingExecution,
                operation,
                self.reason.clone(),
            )?;
            let volumes_discarded = discard_conference(&mut state, &ctx.store, &ctx.issuer);

            ResetConferenceResult {
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
            "Conference reset"
        );
        event_sender.publish(Event::ConferenceReset {
            document_id: self.document_id,
            previous_status: result.previous_status,
            volumes_discarded: result.volumes_discarded,
        });

        Ok(result)
    }
}
