use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Lifecycle of an inbound receiving document.
///
/// `Created` and `AwaitingExecution` are pre-counting, `InProgress` is active
/// counting, `Divergent` and `Blocked` are finalize outcomes that still need
/// a human decision, `Finalized` and `Canceled` are terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceivingStatus {
    Created,
    AwaitingExecution,
    InProgress,
    Divergent,
    Blocked,
    Finalized,
    Canceled,
}

/// Every command the workflow accepts against a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ReceivingOperation {
    #[strum(to_string = "assign a dock to")]
    AssignDock,
    #[strum(to_string = "confer items on")]
    Confer,
    #[strum(to_string = "reverse volumes of")]
    ReverseVolume,
    #[strum(to_string = "finalize")]
    Finalize,
    #[strum(to_string = "cancel")]
    Cancel,
    #[strum(to_string = "reset the conference of")]
    ResetConference,
    #[strum(to_string = "resolve divergences of")]
    ResolveDivergence,
    #[strum(to_string = "close the dispute of")]
    CloseDispute,
}

impl ReceivingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Canceled)
    }

    /// Counting has not started and no volume can exist yet.
    pub fn is_pre_counting(self) -> bool {
        matches!(self, Self::Created | Self::AwaitingExecution)
    }

    /// Status changes the state machine admits from `self`.
    pub fn allowed_transitions(self) -> &'static [ReceivingStatus] {
        use ReceivingStatus::*;
        match self {
            Created => &[AwaitingExecution, Canceled],
            AwaitingExecution => &[AwaitingExecution, InProgress, Canceled],
            InProgress => &[Divergent, Finalized, AwaitingExecution, Canceled],
            Divergent => &[Finalized, Blocked, AwaitingExecution, Canceled],
            Blocked => &[Finalized, Canceled],
            Finalized | Canceled => &[],
        }
    }

    pub fn can_transition_to(self, next: ReceivingStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl ReceivingOperation {
    /// Short label used for metrics and log fields.
    pub fn label(self) -> &'static str {
        match self {
            Self::AssignDock => "assign_dock",
            Self::Confer => "confer",
            Self::ReverseVolume => "reverse_volume",
            Self::Finalize => "finalize",
            Self::Cancel => "cancel",
            Self::ResetConference => "reset_conference",
            Self::ResolveDivergence => "resolve_divergence",
            Self::CloseDispute => "close_dispute",
        }
    }

    /// Statuses in which the operation may start.
    pub fn permitted_in(self) -> &'static [ReceivingStatus] {
        use ReceivingStatus::*;
        match self {
            Self::AssignDock => &[Created, AwaitingExecution, InProgress],
            Self::Confer | Self::ReverseVolume => &[AwaitingExecution, InProgress],
            Self::Finalize => &[InProgress],
            Self::Cancel => &[Created, AwaitingExecution, InProgress, Divergent, Blocked],
            Self::ResetConference => &[AwaitingExecution, InProgress, Divergent],
            Self::ResolveDivergence => &[Divergent],
            Self::CloseDispute => &[Blocked],
        }
    }

    /// Checks that the operation may start from `status`.
    ///
    /// A finalized document rejects mutations as immutable; `finalize` itself
    /// always reports a plain invalid transition.
    pub fn ensure_permitted(self, status: ReceivingStatus) -> Result<(), ServiceError> {
        if self.permitted_in().contains(&status) {
            return Ok(());
        }
        if status == ReceivingStatus::Finalized && self != Self::Finalize {
            return Err(ServiceError::immutable(format!(
                "cannot {} a finalized document",
                self
            )));
        }
        Err(ServiceError::InvalidTransition {
            status,
            operation: self,
        })
    }
}

/// One entry of a document's audit trail of status changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<ReceivingStatus>,
    pub to: ReceivingStatus,
    pub operation: Option<ReceivingOperation>,
    pub changed_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// An inbound shipment: a fiscal note and the goods it announces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceivingDocument {
    pub id: Uuid,
    /// Fiscal note number printed on the shipment document
    pub document_number: String,
    /// 44-digit electronic document key, absent for paper notes
    pub access_key: Option<String>,
    pub supplier_id: Uuid,
    pub issue_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub dock_location_id: Option<Uuid>,
    /// Staging destination captured by the finalize call
    pub staging_location_id: Option<Uuid>,
    pub status: ReceivingStatus,
    pub status_history: Vec<StatusChange>,
    pub version: i32,
}

impl ReceivingDocument {
    pub fn new(
        document_number: String,
        access_key: Option<String>,
        supplier_id: Uuid,
        issue_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            document_number,
            access_key,
            supplier_id,
            issue_date,
            created_at: now,
            updated_at: now,
            dock_location_id: None,
            staging_location_id: None,
            status: ReceivingStatus::Created,
            status_history: vec![StatusChange {
                from: None,
                to: ReceivingStatus::Created,
                operation: None,
                changed_at: now,
                note: None,
            }],
            version: 1,
        }
    }

    /// Moves the document to `next`, recording the change in the audit trail.
    pub fn transition_to(
        &mut self,
        next: ReceivingStatus,
        operation: ReceivingOperation,
        note: Option<String>,
    ) -> Result<(), ServiceError> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                status: self.status,
                operation,
            });
        }

        let now = Utc::now();
        self.status_history.push(StatusChange {
            from: Some(self.status),
            to: next,
            operation: Some(operation),
            changed_at: now,
            note,
        });
        self.status = next;
        self.touch_at(now);
        Ok(())
    }

    /// Bumps version and timestamp after a change that keeps the status.
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    fn touch_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

/// Electronic fiscal-note access keys are exactly 44 ASCII digits.
pub fn is_valid_access_key(key: &str) -> bool {
    key.len() == 44 && key.bytes().all(|b| b.is_ascii_digit())
}
