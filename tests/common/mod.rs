#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use stateset_receiving::{
    build_receiving_service,
    commands::receiving::{
        assign_dock_command::AssignDockCommand,
        confer_item_command::{ConferItemCommand, ConferItemResult},
        create_document_command::{CreateDocumentCommand, CreateDocumentLine},
        finalize_command::{FinalizeCommand, FinalizeResult},
    },
    config::AppConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Location, LocationType, ProductRef, QualityStatus},
    services::{
        blind_mode::{DocumentSnapshot, SystemConfiguration},
        locations::InMemoryLocationRegistry,
        products::InMemoryProductCatalog,
        receiving::ReceivingService,
    },
    Collaborators,
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub fn test_config(blind_conference: bool, divergence_tolerance: u32) -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: "debug".to_string(),
        log_json: false,
        blind_conference,
        divergence_tolerance,
        lpn_prefix: "LPN".to_string(),
        lpn_start_sequence: 1,
        max_volumes_per_conference: 500,
        event_channel_capacity: 1024,
        seed_file: None,
    }
}

/// A service wired to in-memory collaborators with a small fixed warehouse.
pub struct Harness {
    pub service: ReceivingService,
    pub system: Arc<SystemConfiguration>,
    pub dock: Location,
    pub second_dock: Location,
    pub staging: Location,
    pub picking: Location,
    pub widget: ProductRef,
    pub gadget: ProductRef,
    pub medicine: ProductRef,
    events: mpsc::Receiver<Event>,
}

impl Harness {
    pub fn new(blind_conference: bool) -> Self {
        Self::with_tolerance(blind_conference, 0)
    }

    pub fn with_tolerance(blind_conference: bool, tolerance: u32) -> Self {
        Self::build(blind_conference, tolerance, 4096)
    }

    /// Events are never drained by the harness itself, so a small capacity
    /// leaves the channel full after the first few operations.
    pub fn with_event_capacity(blind_conference: bool, capacity: usize) -> Self {
        Self::build(blind_conference, 0, capacity)
    }

    fn build(blind_conference: bool, tolerance: u32, event_capacity: usize) -> Self {
        let dock = Location::new("DOCK-01", LocationType::Dock);
        let second_dock = Location::new("DOCK-02", LocationType::Dock);
        let staging = Location::new("ST-01-01-01", LocationType::Staging);
        let picking = Location::new("PK-01-01-01", LocationType::Picking);
        let widget = ProductRef::new("WIDGET-001").with_barcode("7891234567895");
        let gadget = ProductRef::new("GADGET-002");
        let medicine = ProductRef::new("MED-042")
            .lot_controlled()
            .expiry_controlled();

        let locations = InMemoryLocationRegistry::with_locations(vec![
            dock.clone(),
            second_dock.clone(),
            staging.clone(),
            picking.clone(),
        ]);
        let products = InMemoryProductCatalog::with_products(vec![
            widget.clone(),
            gadget.clone(),
            medicine.clone(),
        ]);
        let system = Arc::new(SystemConfiguration::new(blind_conference));

        let (tx, rx) = mpsc::channel(event_capacity);
        let service = build_receiving_service(
            &test_config(blind_conference, tolerance),
            Collaborators {
                locations: Arc::new(locations),
                products: Arc::new(products),
                blind_mode: system.clone(),
            },
            Arc::new(EventSender::new(tx)),
        );

        Self {
            service,
            system,
            dock,
            second_dock,
            staging,
            picking,
            widget,
            gadget,
            medicine,
            events: rx,
        }
    }

    pub fn document_command(&self, lines: &[(&ProductRef, u32)]) -> CreateDocumentCommand {
        CreateDocumentCommand {
            document_number: format!("NF-{}", &Uuid::new_v4().simple().to_string()[..8]),
            access_key: None,
            supplier_id: Uuid::new_v4(),
            issue_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            lines: lines
                .iter()
                .map(|(product, expected)| CreateDocumentLine {
                    product: product.sku.clone(),
                    expected_quantity: *expected,
                    unit_of_measure: "UN".to_string(),
                    description: None,
                })
                .collect(),
        }
    }

    pub async fn create_document(&self, lines: &[(&ProductRef, u32)]) -> DocumentSnapshot {
        self.service
            .create_document(self.document_command(lines))
            .await
            .expect("document is created")
    }

    /// Creates a document and assigns the main dock, leaving it awaiting execution.
    pub async fn ready_document(&self, lines: &[(&ProductRef, u32)]) -> Uuid {
        let snapshot = self.create_document(lines).await;
        self.service
            .assign_dock(AssignDockCommand {
                document_id: snapshot.id,
                dock_location_id: self.dock.id,
            })
            .await
            .expect("dock is assigned");
        snapshot.id
    }

    pub fn confer_command(&self, document_id: Uuid, product: &str, quantity: u32) -> ConferItemCommand {
        ConferItemCommand {
            document_id,
            product: product.to_string(),
            quantity,
            lot: None,
            expiry: None,
            serial: None,
            volumes_count: 1,
            quantities: None,
            quality_status: QualityStatus::default(),
            conferred_by: Some("operator-1".to_string()),
        }
    }

    pub async fn confer(
        &self,
        document_id: Uuid,
        product: &str,
        quantity: u32,
    ) -> Result<ConferItemResult, ServiceError> {
        self.service
            .confer_item(self.confer_command(document_id, product, quantity))
            .await
    }

    pub async fn finalize(&self, document_id: Uuid) -> Result<FinalizeResult, ServiceError> {
        self.service
            .finalize(FinalizeCommand {
                document_id,
                staging_location_id: self.staging.id,
                finalized_by: Some("supervisor-1".to_string()),
            })
            .await
    }

    /// Events published so far, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
