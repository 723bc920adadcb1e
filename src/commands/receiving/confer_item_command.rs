use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{CONFERRED_UNITS, VOLUMES_ISSUED},
    models::{
        ProductRef, QualityStatus, ReceivingOperation, ReceivingStatus, Volume, VolumeItem,
        VolumeStatus,
    },
    services::lpn::plan_split,
};

fn default_volumes_count() -> u32 {
    1
}

/// One counting event: `quantity` units of a scanned product, packed into
/// one or more volumes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConferItemCommand {
    pub document_id: Uuid,
    /// SKU or barcode as scanned
    #[validate(length(min = 1, max = 64, message = "Product identifier is required"))]
    pub product: String,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: u32,
    #[validate(length(min = 1, max = 64))]
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    #[validate(length(min = 1, max = 64))]
    pub serial: Option<String>,
    #[serde(default = "default_volumes_count")]
    pub volumes_count: u32,
    /// Explicit per-volume quantities; overrides `volumes_count`
    pub quantities: Option<Vec<u32>>,
    #[serde(default)]
    pub quality_status: QualityStatus,
    pub conferred_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConferItemResult {
    pub document_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub volume_codes: Vec<String>,
    pub volumes: Vec<Volume>,
    /// Raw counted total for the product; never compared with expected here
    pub counted_quantity: u64,
    pub status: ReceivingStatus,
}

#[async_trait]
impl Command for ConferItemCommand {
    type Result = ConferItemResult;

    #[instrument(skip(self, ctx, event_sender), fields(document_id = %self.document_id, quantity = self.quantity))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let operation = ReceivingOperation::Confer;
        self.validate()?;
        let split = plan_split(
            self.quantity,
            self.volumes_count,
            self.quantities.as_deref(),
            ctx.settings.max_volumes_per_conference,
        )?;

        let cell = ctx.store.cell(self.document_id)?;
        let admission = cell.try_shared(operation)?;
        operation.ensure_permitted(cell.state()?.document.status)?;

        let product = ctx
            .products
            .resolve(&self.product)
            .await?
            .ok_or_else(|| self.unknown_product())?;
        self.check_traceability(&product, &split)?;

        // Volume creation and the status change happen in one critical section
        // with no await point, so a dropped caller leaves nothing half-written.
        let result = {
            let mut state = cell.state()?;
            operation.ensure_permitted(state.document.status)?;
            if state.line_for_product(product.id).is_none() {
                return Err(self.unknown_product());
            }
            if let Some(serial) = &self.serial {
                let taken = state
                    .volumes
                    .active()
                    .any(|v| v.serials().any(|s| s == serial));
                if taken {
                    return Err(ServiceError::validation(format!(
                        "serial {} is already on an active volume of this document",
                        serial
                    )));
                }
            }

            if state.document.status == ReceivingStatus::AwaitingExecution {
                state
                    .document
                    .transition_to(ReceivingStatus::InProgress, operation, None)?;
            } else {
                state.document.touch();
            }

            let dock = state.document.dock_location_id;
            let now = Utc::now();
            let mut volumes = Vec::with_capacity(split.len());
            for quantity in &split {
                let id = Uuid::new_v4();
                let volume = Volume {
                    id,
                    code: ctx.issuer.issue(self.document_id, id),
                    document_id: self.document_id,
                    items: vec![VolumeItem {
                        product_id: product.id,
                        sku: product.sku.clone(),
                        quantity: *quantity,
                        lot: self.lot.clone(),
                        expiry: self.expiry,
                        serial: self.serial.clone(),
                    }],
                    location_id: dock,
                    quality_status: self.quality_status,
                    status: VolumeStatus::InTransit,
                    created_at: now,
                    created_by: self.conferred_by.clone(),
                    stored_at: None,
                    reversal: None,
                };
                ctx.store.index_volume(id, self.document_id);
                state.volumes.append(volume.clone());
                volumes.push(volume);
            }

            ConferItemResult {
                document_id: self.document_id,
                product_id: product.id,
                sku: product.sku.clone(),
                volume_codes: volumes.iter().map(|v| v.code.clone()).collect(),
                counted_quantity: state.ledger().counted(product.id),
                volumes,
                status: state.document.status,
            }
        };
        drop(admission);

        VOLUMES_ISSUED.inc_by(result.volumes.len() as u64);
        CONFERRED_UNITS.inc_by(u64::from(self.quantity));
        info!(
            sku = %result.sku,
            volumes = result.volumes.len(),
            "Item conferred"
        );
        event_sender.publish(Event::ItemConferred {
            document_id: self.document_id,
            product_id: product.id,
            quantity: self.quantity,
            volume_codes: result.volume_codes.clone(),
        });

        Ok(result)
    }
}

impl ConferItemCommand {
    fn unknown_product(&self) -> ServiceError {
        ServiceError::UnknownProduct {
            document_id: self.document_id,
            identifier: self.product.clone(),
        }
    }

    fn check_traceability(&self, product: &ProductRef, split: &[u32]) -> Result<(), ServiceError> {
        if product.lot_controlled && self.lot.is_none() {
            return Err(ServiceError::validation(format!(
                "product {} is lot controlled and needs a lot",
                product.sku
            )));
        }
        if product.expiry_controlled && self.expiry.is_none() {
            return Err(ServiceError::validation(format!(
                "product {} is expiry controlled and needs an expiry date",
                product.sku
            )));
        }
        if self.serial.is_some() && split != [1] {
            return Err(ServiceError::validation(
                "a serial number identifies exactly one unit in one volume",
            ));
        }
        Ok(())
    }
}
