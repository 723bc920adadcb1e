use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::VOLUMES_REVERSED,
    models::{ReceivingOperation, ReceivingStatus, Volume, VolumeReversal},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReverseVolumeCommand {
    pub volume_id: Uuid,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Reason must be between 1 and 500 characters"
    ))]
    pub reason: String,
    pub reversed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReverseVolumeResult {
    pub document_id: Uuid,
    pub volume: Volume,
    pub status: ReceivingStatus,
}

#[async_trait]
impl Command for ReverseVolumeCommand {
    type Result = ReverseVolumeResult;

    #[instrument(skip(self, ctx, event_sender), fields(volume_id = %self.volume_id))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::ReverseVolume;
        self.validate()?;
        if self.reason.trim().is_empty() {
            return Err(ServiceError::validation("A reversal reason is required"));
        }

        let cell = ctx.store.cell_for_volume(self.volume_id)?;
        let admission = cell.try_shared(operation)?;

        let result = {
            let mut state = cell.state()?;
            operation.ensure_permitted(state.document.status)?;
            let volume = state
                .volumes
                .reverse(
                    self.volume_id,
                    VolumeReversal {
                        reason: self.reason.trim().to_string(),
                        reversed_by: self.reversed_by.clone(),
                        reversed_at: Utc::now(),
                    },
                )?
                .clone();
            state.document.touch();
            ReverseVolumeResult {
                document_id: state.document.id,
                volume,
                status: state.document.status,
            }
        };
        drop(admission);

        VOLUMES_REVERSED.inc();
        info!(
            document_id = %result.document_id,
            code = %result.volume.code,
            "Volume reversed"
        );
        event_sender.publish(Event::VolumeReversed {
            document_id: result.document_id,
            volume_id: result.volume.id,
            code: result.volume.code.clone(),
            reason: self.reason.trim().to_string(),
        });

        Ok(result)
    }
}
