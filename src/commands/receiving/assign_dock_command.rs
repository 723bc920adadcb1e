use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    commands::{Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{LocationType, ReceivingOperation, ReceivingStatus},
    services::locations::require_location,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDockCommand {
    pub document_id: Uuid,
    pub dock_location_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignDockResult {
    pub document_id: Uuid,
    pub dock_location_id: Uuid,
    pub dock_code: String,
    pub previous_dock_id: Option<Uuid>,
    pub status: ReceivingStatus,
    /// Another active document that was flagged on this dock
    pub occupied_by: Option<Uuid>,
    pub warning: Option<String>,
}

#[async_trait]
impl Command for AssignDockCommand {
    type Result = AssignDockResult;

    #[instrument(skip(self, ctx, event_sender), fields(document_id = %self.document_id))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::AssignDock;
        let cell = ctx.store.cell(self.document_id)?;
        let admission = cell.try_exclusive(operation)?;

        operation.ensure_permitted(cell.state()?.document.status)?;
        let dock = require_location(
            ctx.locations.as_ref(),
            self.dock_location_id,
            LocationType::Dock,
        )
        .await?;

        let (previous_dock_id, status) = {
            let mut state = cell.state()?;
            let document = &mut state.document;
            operation.ensure_permitted(document.status)?;

            let previous = document.dock_location_id.replace(dock.id);
            if document.status == ReceivingStatus::Created {
                document.transition_to(
                    ReceivingStatus::AwaitingExecution,
                    operation,
                    Some(format!("dock {}", dock.code)),
                )?;
            } else {
                document.touch();
            }
            (previous, document.status)
        };

        if let Some(previous) = previous_dock_id.filter(|p| *p != dock.id) {
            ctx.docks.release(previous, self.document_id);
        }
        let occupied_by = ctx.docks.occupy(dock.id, self.document_id);
        let warning = occupied_by.map(|other| {
            warn!(
                dock = %dock.code,
                occupied_by = %other,
                "Dock is already occupied by another receiving document"
            );
            format!("dock {} is also assigned to document {}", dock.code, other)
        });
        drop(admission);

        info!(dock = %dock.code, status = %status, "Dock assigned");
        event_sender.publish(Event::DockAssigned {
            document_id: self.document_id,
            dock_location_id: dock.id,
            previous_dock_id,
        });
        if let Some(other) = occupied_by {
            event_sender.publish(Event::DockOccupiedWarning {
                document_id: self.document_id,
                dock_location_id: dock.id,
                occupied_by: other,
            });
        }

        Ok(AssignDockResult {
            document_id: self.document_id,
            dock_location_id: dock.id,
            dock_code: dock.code,
            previous_dock_id,
            status,
            occupied_by,
            warning,
        })
    }
}
