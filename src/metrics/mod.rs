//! Prometheus counters for the receiving workflow.
//!
//! Everything registers with the default registry; `gather` renders the text
//! exposition format served at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

use crate::errors::ServiceError;

lazy_static! {
    pub static ref DOCUMENTS_CREATED: IntCounter = register_int_counter!(
        "receiving_documents_created_total",
        "Total number of receiving documents created"
    )
    .expect("metric can be created");

    pub static ref VOLUMES_ISSUED: IntCounter = register_int_counter!(
        "receiving_volumes_issued_total",
        "Total number of volumes (LPNs) issued during conference"
    )
    .expect("metric can be created");

    pub static ref CONFERRED_UNITS: IntCounter = register_int_counter!(
        "receiving_conferred_units_total",
        "Total quantity conferred across all documents"
    )
    .expect("metric can be created");

    pub static ref VOLUMES_REVERSED: IntCounter = register_int_counter!(
        "receiving_volumes_reversed_total",
        "Total number of volumes reversed"
    )
    .expect("metric can be created");

    pub static ref DIVERGENCES_RAISED: IntCounterVec = register_int_counter_vec!(
        "receiving_divergences_raised_total",
        "Divergences raised at finalize, by kind",
        &["kind"]
    )
    .expect("metric can be created");

    pub static ref DIVERGENCES_RESOLVED: IntCounterVec = register_int_counter_vec!(
        "receiving_divergences_resolved_total",
        "Divergences resolved, by decision",
        &["decision"]
    )
    .expect("metric can be created");

    pub static ref FINALIZATIONS: IntCounterVec = register_int_counter_vec!(
        "receiving_finalizations_total",
        "Finalize calls that committed, by outcome",
        &["outcome"]
    )
    .expect("metric can be created");

    pub static ref GATE_CONFLICTS: IntCounterVec = register_int_counter_vec!(
        "receiving_gate_conflicts_total",
        "Operations rejected because the document was busy, by operation",
        &["operation"]
    )
    .expect("metric can be created");

    pub static ref OPERATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "receiving_operation_failures_total",
        "Rejected receiving operations, by operation and error code",
        &["operation", "error_type"]
    )
    .expect("metric can be created");
}

/// Counts a rejected operation under its error code.
pub fn record_failure(operation: &str, error: &ServiceError) {
    OPERATION_FAILURES
        .with_label_values(&[operation, error.code()])
        .inc();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather() -> Result<String, ServiceError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not UTF-8: {}", e)))
}
