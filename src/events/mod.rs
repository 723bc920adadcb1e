use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{DivergenceKind, ReceivingStatus, ResolutionDecision};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event for a change that is already committed.
    ///
    /// Never waits: a full or closed channel drops the event with a warning,
    /// since the caller's operation has already succeeded.
    pub fn publish(&self, event: Event) {
        let name = event.name();
        let document_id = event.document_id();
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    event = name,
                    document_id = %document_id,
                    "event channel full; receiving event dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                warn!(
                    event = name,
                    document_id = %document_id,
                    "event channel closed; receiving event dropped"
                );
            }
        }
    }
}

/// Domain events of the receiving workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    DocumentCreated {
        document_id: Uuid,
        document_number: String,
        lines: usize,
    },
    DockAssigned {
        document_id: Uuid,
        dock_location_id: Uuid,
        previous_dock_id: Option<Uuid>,
    },
    DockOccupiedWarning {
        document_id: Uuid,
        dock_location_id: Uuid,
        occupied_by: Uuid,
    },
    /// Codes are published as soon as they exist so labels can be printed.
    ItemConferred {
        document_id: Uuid,
        product_id: Uuid,
        quantity: u32,
        volume_codes: Vec<String>,
    },
    VolumeReversed {
        document_id: Uuid,
        volume_id: Uuid,
        code: String,
        reason: String,
    },
    DocumentFinalized {
        document_id: Uuid,
        staging_location_id: Uuid,
        volumes_stored: usize,
        finalized_at: DateTime<Utc>,
    },
    DocumentDivergent {
        document_id: Uuid,
        divergences: Vec<(Uuid, DivergenceKind)>,
    },
    DivergenceResolved {
        document_id: Uuid,
        divergence_id: Uuid,
        decision: ResolutionDecision,
        resolved_by: String,
    },
    DocumentBlocked {
        document_id: Uuid,
        staging_location_id: Uuid,
        volumes_stored: usize,
    },
    DisputeClosed {
        document_id: Uuid,
        closed_by: String,
    },
    DocumentCanceled {
        document_id: Uuid,
        previous_status: ReceivingStatus,
        volumes_discarded: usize,
    },
    ConferenceReset {
        document_id: Uuid,
        previous_status: ReceivingStatus,
        volumes_discarded: usize,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::DocumentCreated { .. } => "document_created",
            Event::DockAssigned { .. } => "dock_assigned",
            Event::DockOccupiedWarning { .. } => "dock_occupied_warning",
            Event::ItemConferred { .. } => "item_conferred",
            Event::VolumeReversed { .. } => "volume_reversed",
            Event::DocumentFinalized { .. } => "document_finalized",
            Event::DocumentDivergent { .. } => "document_divergent",
            Event::DivergenceResolved { .. } => "divergence_resolved",
            Event::DocumentBlocked { .. } => "document_blocked",
            Event::DisputeClosed { .. } => "dispute_closed",
            Event::DocumentCanceled { .. } => "document_canceled",
            Event::ConferenceReset { .. } => "conference_reset",
        }
    }

    pub fn document_id(&self) -> Uuid {
        match self {
            Event::DocumentCreated { document_id, .. }
            | Event::DockAssigned { document_id, .. }
            | Event::DockOccupiedWarning { document_id, .. }
            | Event::ItemConferred { document_id, .. }
            | Event::VolumeReversed { document_id, .. }
            | Event::DocumentFinalized { document_id, .. }
            | Event::DocumentDivergent { document_id, .. }
            | Event::DivergenceResolved { document_id, .. }
            | Event::DocumentBlocked { document_id, .. }
            | Event::DisputeClosed { document_id, .. }
            | Event::DocumentCanceled { document_id, .. }
            | Event::ConferenceReset { document_id, .. } => *document_id,
        }
    }
}

// Handlers implementing this trait consume events downstream of the workflow
// (label printing, inventory adjustment, dispute handling).
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Drains the channel, logging every event and fanning it out to `handlers`.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(
            event = event.name(),
            document_id = %event.document_id(),
            "Received event: {:?}",
            event
        );

        if let Event::DockOccupiedWarning {
            dock_location_id,
            occupied_by,
            ..
        } = &event
        {
            warn!(
                dock_location_id = %dock_location_id,
                occupied_by = %occupied_by,
                "dock reassigned while occupied by another document"
            );
        }

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(
                    event = event.name(),
                    document_id = %event.document_id(),
                    "Failed to handle event: {}",
                    e
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.seen.lock().unwrap().push(event.name());
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_reach_handlers_in_order() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let recorder = Arc::new(Recorder::default());
        let document_id = Uuid::new_v4();

        sender.publish(Event::DocumentCreated {
            document_id,
            document_number: "NF-9".into(),
            lines: 1,
        });
        sender.publish(Event::DisputeClosed {
            document_id,
            closed_by: "ana".into(),
        });
        drop(sender);

        process_events(rx, vec![recorder.clone() as Arc<dyn EventHandler>]).await;
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["document_created", "dispute_closed"]
        );
    }

    #[tokio::test]
    async fn publishing_to_a_closed_channel_does_not_fail() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender
            .send(Event::DisputeClosed {
                document_id: Uuid::nil(),
                closed_by: "ana".into(),
            })
            .await
            .is_err());
        sender.publish(Event::DisputeClosed {
            document_id: Uuid::nil(),
            closed_by: "ana".into(),
        });
    }

    #[tokio::test]
    async fn publishing_to_a_full_channel_returns_immediately() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        let document_id = Uuid::new_v4();

        for closed_by in ["first", "second", "third"] {
            sender.publish(Event::DisputeClosed {
                document_id,
                closed_by: closed_by.into(),
            });
        }

        assert_eq!(
            rx.try_recv().unwrap(),
            Event::DisputeClosed {
                document_id,
                closed_by: "first".into(),
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
