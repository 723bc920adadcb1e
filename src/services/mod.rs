// Collaborators consumed by the workflow
pub mod locations;
pub mod products;

// Conference arithmetic and reconciliation
pub mod divergence;
pub mod ledger;
pub mod lpn;

// Read-side policy
pub mod blind_mode;

// Façade the transport layer calls
pub mod receiving;
