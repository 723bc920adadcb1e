//! StateSet Receiving
//!
//! Inbound receiving and blind conference workflow: receiving documents,
//! dock assignment, unit counting into labelled volumes, divergence
//! reconciliation and supervisor resolution.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod seed;
pub mod services;
pub mod store;

use std::sync::Arc;

use commands::{ReceivingContext, ReceivingSettings};
use config::AppConfig;
use events::EventSender;
use services::{
    blind_mode::BlindModeGate,
    locations::{DockBoard, LocationRegistry},
    lpn::LpnIssuer,
    products::ProductCatalog,
    receiving::ReceivingService,
};
use store::ReceivingStore;

pub use handlers::{app_router, AppState};

/// Collaborators the workflow consumes but does not own
#[derive(Clone)]
pub struct Collaborators {
    pub locations: Arc<dyn LocationRegistry>,
    pub products: Arc<dyn ProductCatalog>,
    pub blind_mode: Arc<dyn BlindModeGate>,
}

/// Wires a fresh in-memory store and volume issuer to the given collaborators
pub fn build_receiving_service(
    cfg: &AppConfig,
    collaborators: Collaborators,
    event_sender: Arc<EventSender>,
) -> ReceivingService {
    let settings = ReceivingSettings {
        divergence_tolerance: cfg.divergence_tolerance,
        max_volumes_per_conference: cfg.max_volumes_per_conference,
    };
    let ctx = ReceivingContext {
        store: Arc::new(ReceivingStore::new()),
        locations: collaborators.locations,
        products: collaborators.products,
        blind_mode: collaborators.blind_mode,
        issuer: Arc::new(LpnIssuer::new(cfg.lpn_prefix.clone(), cfg.lpn_start_sequence)),
        docks: Arc::new(DockBoard::new()),
        settings,
    };
    ReceivingService::new(Arc::new(ctx), event_sender)
}

// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::{Command, ReceivingContext, ReceivingSettings};
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::models::*;
    pub use crate::services::blind_mode::{DocumentSnapshot, SystemConfiguration};
    pub use crate::services::receiving::ReceivingService;
}
