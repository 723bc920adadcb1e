use super::common::{
    created_response, success_response, validate_input, PaginatedResponse, PaginationParams,
};
use crate::{
    commands::receiving::{
        assign_dock_command::AssignDockCommand,
        cancel_command::CancelDocumentCommand,
        close_dispute_command::CloseDisputeCommand,
        confer_item_command::ConferItemCommand,
        create_document_command::CreateDocumentCommand,
        finalize_command::FinalizeCommand,
        reset_conference_command::ResetConferenceCommand,
        resolve_divergence_command::ResolveDivergenceCommand,
        reverse_volume_command::ReverseVolumeCommand,
    },
    errors::ServiceError,
    handlers::AppState,
    models::{LocationType, QualityStatus, ReceivingStatus, ResolutionDecision, ResolutionStatus},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Router for the receiving workflow, nested under `/api/v1/receiving`
pub fn receiving_routes() -> Router<AppState> {
    Router::new()
        .route("/documents", post(create_document).get(list_documents))
        .route("/documents/:id", get(get_document))
        .route("/documents/:id/dock", post(assign_dock))
        .route("/documents/:id/conference", post(confer_item))
        .route("/documents/:id/finalize", post(finalize))
        .route("/documents/:id/cancel", post(cancel))
        .route("/documents/:id/reset", post(reset_conference))
        .route("/documents/:id/close-dispute", post(close_dispute))
        .route("/documents/:id/divergences", get(list_divergences))
        .route("/documents/:id/volumes", get(list_volumes))
        .route("/documents/:id/progress", get(get_progress))
        .route("/volumes/:id/reverse", post(reverse_volume))
        .route("/volumes/by-code/:code", get(find_volume_by_code))
        .route("/divergences/:id/resolve", post(resolve_divergence))
        .route("/locations", get(list_locations))
}

#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    pub status: Option<ReceivingStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DivergenceListQuery {
    pub status: Option<ResolutionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct LocationListQuery {
    #[serde(rename = "type")]
    pub location_type: LocationType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignDockRequest {
    pub dock_location_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConferItemRequest {
    pub product: String,
    pub quantity: u32,
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub serial: Option<String>,
    pub volumes_count: Option<u32>,
    pub quantities: Option<Vec<u32>>,
    #[serde(default)]
    pub quality_status: QualityStatus,
    pub conferred_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub staging_location_id: Uuid,
    pub finalized_by: Option<String>,
}

/// Body shared by cancel and reset; both are irreversible
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfirmedRequest {
    #[serde(default)]
    pub confirm: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseDisputeRequest {
    pub justification: String,
    pub closed_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReverseVolumeRequest {
    pub reason: String,
    pub reversed_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveDivergenceRequest {
    pub decision: ResolutionDecision,
    pub justification: String,
    pub resolved_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub document_id: Uuid,
    pub expected_quantity_visible: bool,
    pub progress_percent: Option<f64>,
}

/// Create a receiving document from an invoice
pub async fn create_document(
    State(state): State<AppState>,
    Json(command): Json<CreateDocumentCommand>,
) -> Result<impl IntoResponse, ServiceError> {
    let snapshot = state.receiving.create_document(command).await?;
    Ok(created_response(snapshot))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let defaults = PaginationParams::default();
    let pagination = PaginationParams {
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };
    validate_input(&pagination)?;
    let PaginationParams { page, limit } = pagination;

    let (items, total) = state.receiving.list_documents(query.status, page, limit)?;
    Ok(success_response(PaginatedResponse::new(
        items, page, limit, total,
    )))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.receiving.get_document(id)?))
}

pub async fn assign_dock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .assign_dock(AssignDockCommand {
            document_id: id,
            dock_location_id: payload.dock_location_id,
        })
        .await?;
    Ok(success_response(result))
}

/// Record counted units; responds with the issued volume codes
pub async fn confer_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConferItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let command = ConferItemCommand {
        document_id: id,
        product: payload.product,
        quantity: payload.quantity,
        lot: payload.lot,
        expiry: payload.expiry,
        serial: payload.serial,
        volumes_count: payload.volumes_count.unwrap_or(1),
        quantities: payload.quantities,
        quality_status: payload.quality_status,
        conferred_by: payload.conferred_by,
    };
    let result = state.receiving.confer_item(command).await?;
    Ok(created_response(result))
}

pub async fn finalize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FinalizeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .finalize(FinalizeCommand {
            document_id: id,
            staging_location_id: payload.staging_location_id,
            finalized_by: payload.finalized_by,
        })
        .await?;
    Ok(success_response(result))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmedRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .cancel(CancelDocumentCommand {
            document_id: id,
            confirm: payload.confirm,
            reason: payload.reason,
        })
        .await?;
    Ok(success_response(result))
}

pub async fn reset_conference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmedRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .reset_conference(ResetConferenceCommand {
            document_id: id,
            confirm: payload.confirm,
            reason: payload.reason,
        })
        .await?;
    Ok(success_response(result))
}

pub async fn close_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseDisputeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .close_dispute(CloseDisputeCommand {
            document_id: id,
            justification: payload.justification,
            closed_by: payload.closed_by,
        })
        .await?;
    Ok(success_response(result))
}

pub async fn list_divergences(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DivergenceListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.receiving.list_divergences(id, query.status)?,
    ))
}

pub async fn list_volumes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.receiving.list_volumes(id)?))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let progress_percent = state.receiving.progress(id)?;
    Ok(success_response(ProgressResponse {
        document_id: id,
        expected_quantity_visible: progress_percent.is_some(),
        progress_percent,
    }))
}

pub async fn reverse_volume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReverseVolumeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .reverse_volume(ReverseVolumeCommand {
            volume_id: id,
            reason: payload.reason,
            reversed_by: payload.reversed_by,
        })
        .await?;
    Ok(success_response(result))
}

pub async fn find_volume_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.receiving.find_volume_by_code(&code)?))
}

pub async fn resolve_divergence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveDivergenceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .receiving
        .resolve_divergence(ResolveDivergenceCommand {
            divergence_id: id,
            decision: payload.decision,
            justification: payload.justification,
            resolved_by: payload.resolved_by,
        })
        .await?;
    Ok(success_response(result))
}

pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.receiving.list_locations(query.location_type).await?,
    ))
}
