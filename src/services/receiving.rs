use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    commands::{
        receiving::{
            assign_dock_command::{AssignDockCommand, AssignDockResult},
            cancel_command::{CancelDocumentCommand, CancelDocumentResult},
            close_dispute_command::{CloseDisputeCommand, CloseDisputeResult},
            confer_item_command::{ConferItemCommand, ConferItemResult},
            create_document_command::CreateDocumentCommand,
            finalize_command::{FinalizeCommand, FinalizeResult},
            reset_conference_command::{ResetConferenceCommand, ResetConferenceResult},
            resolve_divergence_command::{ResolveDivergenceCommand, ResolveDivergenceResult},
            reverse_volume_command::{ReverseVolumeCommand, ReverseVolumeResult},
        },
        Command, ReceivingContext,
    },
    errors::ServiceError,
    events::EventSender,
    metrics::record_failure,
    models::{
        Divergence, Location, LocationType, ReceivingStatus, ResolutionStatus, Volume,
    },
    services::blind_mode::{project_document, project_progress, DocumentSnapshot},
};

/// Row of the document list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub document_number: String,
    pub supplier_id: Uuid,
    pub status: ReceivingStatus,
    pub dock_location_id: Option<Uuid>,
    pub active_volumes: usize,
    pub pending_divergences: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Service for the inbound receiving and conference workflow
#[derive(Clone)]
pub struct ReceivingService {
    ctx: Arc<ReceivingContext>,
    event_sender: Arc<EventSender>,
}

impl ReceivingService {
    pub fn new(ctx: Arc<ReceivingContext>, event_sender: Arc<EventSender>) -> Self {
        Self { ctx, event_sender }
    }

    pub fn context(&self) -> &Arc<ReceivingContext> {
        &self.ctx
    }

    async fn run<C: Command>(
        &self,
        operation: &'static str,
        command: C,
    ) -> Result<C::Result, ServiceError> {
        command
            .execute(self.ctx.clone(), self.event_sender.clone())
            .await
            .map_err(|e| {
                record_failure(operation, &e);
                debug!(operation, error = %e, "receiving operation rejected");
                e
            })
    }

    /// Creates a receiving document in `CREATED` status
    #[instrument(skip(self))]
    pub async fn create_document(
        &self,
        command: CreateDocumentCommand,
    ) -> Result<DocumentSnapshot, ServiceError> {
        self.run("create_document", command).await
    }

    #[instrument(skip(self))]
    pub async fn assign_dock(
        &self,
        command: AssignDockCommand,
    ) -> Result<AssignDockResult, ServiceError> {
        self.run("assign_dock", command).await
    }

    /// Counts units of a product, issuing one volume per split part
    #[instrument(skip(self))]
    pub async fn confer_item(
        &self,
        command: ConferItemCommand,
    ) -> Result<ConferItemResult, ServiceError> {
        self.run("confer", command).await
    }

    #[instrument(skip(self))]
    pub async fn reverse_volume(
        &self,
        command: ReverseVolumeCommand,
    ) -> Result<ReverseVolumeResult, ServiceError> {
        self.run("reverse_volume", command).await
    }

    /// Reconciles counted against expected and commits or holds the stock
    #[instrument(skip(self))]
    pub async fn finalize(&self, command: FinalizeCommand) -> Result<FinalizeResult, ServiceError> {
        self.run("finalize", command).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        command: CancelDocumentCommand,
    ) -> Result<CancelDocumentResult, ServiceError> {
        self.run("cancel", command).await
    }

    #[instrument(skip(self))]
    pub async fn reset_conference(
        &self,
        command: ResetConferenceCommand,
    ) -> Result<ResetConferenceResult, ServiceError> {
        self.run("reset_conference", command).await
    }

    #[instrument(skip(self))]
    pub async fn resolve_divergence(
        &self,
        command: ResolveDivergenceCommand,
    ) -> Result<ResolveDivergenceResult, ServiceError> {
        self.run("resolve_divergence", command).await
    }

    #[instrument(skip(self))]
    pub async fn close_dispute(
        &self,
        command: CloseDisputeCommand,
    ) -> Result<CloseDisputeResult, ServiceError> {
        self.run("close_dispute", command).await
    }

    /// Document snapshot as the counting client may see it
    pub fn get_document(&self, document_id: Uuid) -> Result<DocumentSnapshot, ServiceError> {
        let cell = self.ctx.store.cell(document_id)?;
        let state = cell.state()?;
        Ok(project_document(&state, self.ctx.blind_mode.as_ref()))
    }

    /// Lists documents, oldest first, with pagination
    pub fn list_documents(
        &self,
        status: Option<ReceivingStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<DocumentSummary>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::validation("Page number must be greater than 0"));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::validation("Limit must be between 1 and 1000"));
        }

        let mut summaries = Vec::new();
        for cell in self.ctx.store.cells() {
            let state = cell.state()?;
            if status.is_some_and(|s| s != state.document.status) {
                continue;
            }
            summaries.push(DocumentSummary {
                id: state.document.id,
                document_number: state.document.document_number.clone(),
                supplier_id: state.document.supplier_id,
                status: state.document.status,
                dock_location_id: state.document.dock_location_id,
                active_volumes: state.volumes.active().count(),
                pending_divergences: state.pending_divergences(),
                created_at: state.document.created_at,
                updated_at: state.document.updated_at,
            });
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = summaries.len() as u64;
        let page = summaries
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    /// Every volume of a document, reversed ones included, in counting order
    pub fn list_volumes(&self, document_id: Uuid) -> Result<Vec<Volume>, ServiceError> {
        let cell = self.ctx.store.cell(document_id)?;
        let state = cell.state()?;
        Ok(state.volumes.iter().cloned().collect())
    }

    pub fn find_volume_by_code(&self, code: &str) -> Result<Volume, ServiceError> {
        let not_found = || ServiceError::NotFound(format!("Volume with code {} not found", code));
        let locator = self.ctx.issuer.locate(code).ok_or_else(not_found)?;
        let cell = self.ctx.store.cell(locator.document_id)?;
        let state = cell.state()?;
        state
            .volumes
            .get(locator.volume_id)
            .cloned()
            .ok_or_else(not_found)
    }

    /// Divergences of a document for supervisor review
    pub fn list_divergences(
        &self,
        document_id: Uuid,
        status: Option<ResolutionStatus>,
    ) -> Result<Vec<Divergence>, ServiceError> {
        let cell = self.ctx.store.cell(document_id)?;
        let state = cell.state()?;
        Ok(state
            .divergences
            .iter()
            .filter(|d| status.map_or(true, |s| d.status == s))
            .cloned()
            .collect())
    }

    /// Conference progress, withheld entirely in blind mode
    pub fn progress(&self, document_id: Uuid) -> Result<Option<f64>, ServiceError> {
        let cell = self.ctx.store.cell(document_id)?;
        let state = cell.state()?;
        Ok(project_progress(&state, self.ctx.blind_mode.as_ref()))
    }

    pub async fn list_locations(
        &self,
        location_type: LocationType,
    ) -> Result<Vec<Location>, ServiceError> {
        self.ctx.locations.list_by_type(location_type).await
    }

    pub fn expected_quantity_visible(&self) -> bool {
        self.ctx.blind_mode.expected_quantity_visible()
    }
}
