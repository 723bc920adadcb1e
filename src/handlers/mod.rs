pub mod common;
pub mod receiving;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{errors::ServiceError, metrics, services::receiving::ReceivingService};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub receiving: ReceivingService,
}

impl AppState {
    pub fn new(receiving: ReceivingService) -> Self {
        Self { receiving }
    }
}

/// Builds the full HTTP surface: workflow routes, health and metrics
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1/receiving", receiving::receiving_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": state.receiving.context().store.len(),
        "blind_conference": !state.receiving.expected_quantity_visible(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics_handler() -> Result<impl IntoResponse, ServiceError> {
    let body = metrics::gather()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
