use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{Command, ReceivingContext},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::DOCUMENTS_CREATED,
    models::{receiving_document::is_valid_access_key, ReceivingDocument, ReceivingLine},
    services::blind_mode::{project_document, DocumentSnapshot},
    store::DocumentState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDocumentLine {
    /// SKU or barcode of the expected product
    #[validate(length(min = 1, max = 64, message = "Product identifier is required"))]
    pub product: String,
    pub expected_quantity: u32,
    #[validate(length(min = 1, max = 16, message = "Unit of measure is required"))]
    pub unit_of_measure: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDocumentCommand {
    #[validate(length(min = 1, max = 64, message = "Document number is required"))]
    pub document_number: String,
    pub access_key: Option<String>,
    pub supplier_id: Uuid,
    pub issue_date: NaiveDate,
    #[validate(length(min = 1, message = "A receiving document needs at least one line"))]
    pub lines: Vec<CreateDocumentLine>,
}

#[async_trait]
impl Command for CreateDocumentCommand {
    type Result = DocumentSnapshot;

    #[instrument(skip(self, ctx, event_sender), fields(document_number = %self.document_number))]
    async fn execute(
        &self,
        ctx: Arc<ReceivingContext>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        self.validate_header()?;
        for line in &self.lines {
            line.validate()?;
        }

        let lines = self.resolve_lines(&ctx).await?;
        let document = ReceivingDocument::new(
            self.document_number.trim().to_string(),
            self.access_key.clone(),
            self.supplier_id,
            self.issue_date,
        );
        let document_id = document.id;
        let line_count = lines.len();

        let cell = ctx.store.insert(DocumentState::new(document, lines))?;
        let snapshot = project_document(&*cell.state()?, ctx.blind_mode.as_ref());

        DOCUMENTS_CREATED.inc();
        info!(document_id = %document_id, lines = line_count, "Receiving document created");
        event_sender.publish(Event::DocumentCreated {
            document_id,
            document_number: snapshot.document_number.clone(),
            lines: line_count,
        });

        Ok(snapshot)
    }
}

impl CreateDocumentCommand {
    fn validate_header(&self) -> Result<(), ServiceError> {
        if self.document_number.trim().is_empty() {
            return Err(ServiceError::validation("Document number is required"));
        }
        if let Some(key) = &self.access_key {
            if !is_valid_access_key(key) {
                return Err(ServiceError::validation(
                    "Access key must be exactly 44 digits",
                ));
            }
        }
        Ok(())
    }

    /// Resolves every line's identifier to a canonical product. A product may
    /// appear on only one line, however it was identified.
    async fn resolve_lines(
        &self,
        ctx: &ReceivingContext,
    ) -> Result<Vec<ReceivingLine>, ServiceError> {
        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(self.lines.len());

        for input in &self.lines {
            let product = ctx.products.resolve(&input.product).await?.ok_or_else(|| {
                ServiceError::validation(format!("product '{}' is not in the catalog", input.product))
            })?;
            if !seen.insert(product.id) {
                return Err(ServiceError::validation(format!(
                    "product {} appears on more than one line",
                    product.sku
                )));
            }
            lines.push(ReceivingLine::new(
                product.id,
                product.sku.clone(),
                input.description.clone().or(product.description.clone()),
                input.expected_quantity,
                input.unit_of_measure.trim().to_string(),
            ));
        }

        Ok(lines)
    }
}
