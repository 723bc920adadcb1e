use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::FINALIZATIONS,
    models::{ReceivingOperation, ReceivingStatus},
};

/// Records that the commercial dispute behind a rejected divergence is
/// settled, completing a blocked document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CloseDisputeCommand {
    pub document_id: Uuid,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Justification must be between 1 and 1000 characters"
    ))]
    pub justification: String,
    #[validate(length(min = 1, max = 128))]
    pub closed_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloseDisputeResult {
    pub document_id: Uuid,
    pub status: ReceivingStatus,
    pub closed_at: DateTime<Utc>,
}

#[async_trait]
impl Command for CloseDisputeCommand {
    type Result = CloseDisputeResult;

    #[instrument(skip(self, ctx, event_sender), fields(document_id = %self.document_id))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::CloseDispute;
        self.validate()?;
        let justification = self.justification.trim();
        if justification.is_empty() {
            return Err(ServiceError::validation(
                "closing a dispute requires a justification",
            ));
        }

        let cell = ctx.store.cell(self.document_id)?;
        let admission = cell.try_exclusive(operation)?;

        let result = {
            let mut state = cell.state()?;
            operation.ensure_permitted(state.document.status)?;
            state.document.transition_to(
                ReceivingStatus::Finalized,
                operation,
                Some(format!("{} ({})", justification, self.closed_by.trim())),
            )?;
            CloseDisputeResult {
                document_id: self.document_id,
                status: state.document.status,
                closed_at: state.document.updated_at,
            }
        };
        drop(admission);

        FINALIZATIONS.with_label_values(&["dispute_closed"]).inc();
        info!(closed_by = %self.closed_by, "Dispute closed");
        event_sender.publish(Event::DisputeClosed {
            document_id: self.document_id,
            closed_by: self.closed_by.trim().to_string(),
        });

        Ok(result)
    }
}
