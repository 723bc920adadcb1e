use crate::{
    errors::ServiceError,
    events::EventSender,
    services::{
        blind_mode::BlindModeGate,
        locations::{DockBoard, LocationRegistry},
        lpn::LpnIssuer,
        products::ProductCatalog,
    },
    store::ReceivingStore,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod receiving;

/// Tunables that shape conference arithmetic.
#[derive(Clone, Copy, Debug)]
pub struct ReceivingSettings {
    /// Absolute units a line may differ from expected without diverging
    pub divergence_tolerance: u32,
    pub max_volumes_per_conference: u32,
}

impl Default for ReceivingSettings {
    fn default() -> Self {
        Self {
            divergence_tolerance: 0,
            max_volumes_per_conference: 500,
        }
    }
}

/// Everything a receiving command reads or writes besides its own input.
pub struct ReceivingContext {
    pub store: Arc<ReceivingStore>,
    pub locations: Arc<dyn LocationRegistry>,
    pub products: Arc<dyn ProductCatalog>,
    pub blind_mode: Arc<dyn BlindModeGate>,
    pub issuer: Arc<LpnIssuer>,
    pub docks: Arc<DockBoard>,
    pub settings: ReceivingSettings,
}

/// Command trait for implementing the Command Pattern
///
/// Each receiving operation is one object that validates its own input,
/// executes against the shared context and publishes its events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `ctx` - Document store and the workflow's collaborators
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}
