// Receiving workflow models
pub mod divergence;
pub mod location;
pub mod product;
pub mod receiving_document;
pub mod receiving_line;
pub mod volume;

pub use divergence::{
    Divergence, DivergenceKind, Resolution, ResolutionDecision, ResolutionStatus,
};
pub use location::{Location, LocationAddress, LocationType};
pub use product::ProductRef;
pub use receiving_document::{ReceivingDocument, ReceivingOperation, ReceivingStatus, StatusChange};
pub use receiving_line::ReceivingLine;
pub use volume::{QualityStatus, Volume, VolumeItem, VolumeReversal, VolumeStatus};
