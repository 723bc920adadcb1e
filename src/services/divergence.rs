//! Divergence detection (finalize-time only) and the rules that decide how a
//! divergent document leaves the divergence path.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Divergence, DivergenceKind, ReceivingLine, ReceivingStatus, ResolutionDecision,
    ResolutionStatus,
};
use crate::services::ledger::{ConferenceLedger, LineTotal};

#[derive(Clone, Copy, Debug, Default)]
pub struct DivergenceDetector {
    /// Absolute units a line may differ before it diverges
    tolerance: u32,
}

impl DivergenceDetector {
    pub fn new(tolerance: u32) -> Self {
        Self { tolerance }
    }

    /// Classifies a signed difference (counted − expected).
    pub fn classify(&self, difference: i64) -> Option<DivergenceKind> {
        if difference.unsigned_abs() <= u64::from(self.tolerance) {
            None
        } else if difference > 0 {
            Some(DivergenceKind::PhysicalSurplus)
        } else {
            Some(DivergenceKind::PhysicalShortage)
        }
    }

    /// One pending divergence per line whose counted total differs from expected.
    pub fn detect(
        &self,
        document_id: Uuid,
        lines: &[ReceivingLine],
        ledger: &ConferenceLedger<'_>,
    ) -> Vec<Divergence> {
        let now = Utc::now();
        lines
            .iter()
            .filter_map(|line| {
                let total: LineTotal = ledger.line_total(line);
                let difference = total.difference();
                self.classify(difference).map(|kind| Divergence {
                    id: Uuid::new_v4(),
                    document_id,
                    line_id: line.id,
                    product_id: line.product_id,
                    sku: line.sku.clone(),
                    kind,
                    expected_quantity: total.expected_quantity,
                    counted_quantity: total.counted_quantity,
                    divergent_quantity: difference,
                    status: ResolutionStatus::Pending,
                    resolution: None,
                    created_at: now,
                    superseded_at: None,
                })
            })
            .collect()
    }
}

/// Status a divergent document moves to once nothing is pending.
///
/// Only divergences of the latest finalize count. `None` while any of them
/// awaits review. All accepted means the count is the truth and the document
/// is finalized; any rejection releases the goods but keeps the document
/// blocked for the commercial dispute.
pub fn settled_status(divergences: &[Divergence]) -> Option<ReceivingStatus> {
    let current = || divergences.iter().filter(|d| d.is_current());
    if current().any(Divergence::is_pending) {
        return None;
    }
    let rejected = current().any(|d| {
        d.resolution
            .as_ref()
            .is_some_and(|r| r.decision == ResolutionDecision::Reject)
    });
    Some(if rejected {
        ReceivingStatus::Blocked
    } else {
        ReceivingStatus::Finalized
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QualityStatus, Volume, VolumeItem, VolumeStatus};
    use crate::services::ledger::VolumeLog;

    fn setup(expected: u32, counted: u32) -> (Vec<ReceivingLine>, VolumeLog) {
        let product = Uuid::new_v4();
        let lines = vec![ReceivingLine::new(
            product,
            "SKU-1".into(),
            None,
            expected,
            "UN".into(),
        )];
        let mut log = VolumeLog::new();
        if counted > 0 {
            log.append(Volume {
                id: Uuid::new_v4(),
                code: "LPN000000000017".into(),
                document_id: Uuid::nil(),
                items: vec![VolumeItem {
                    product_id: product,
                    sku: "SKU-1".into(),
                    quantity: counted,
                    lot: None,
                    expiry: None,
                    serial: None,
                }],
                location_id: None,
                quality_status: QualityStatus::Available,
                status: VolumeStatus::InTransit,
                created_at: Utc::now(),
                created_by: None,
                stored_at: None,
                reversal: None,
            });
        }
        (lines, log)
    }

    fn detect(expected: u32, counted: u32, tolerance: u32) -> Vec<Divergence> {
        let (lines, log) = setup(expected, counted);
        let ledger = ConferenceLedger::new(&lines, &log);
        DivergenceDetector::new(tolerance).detect(Uuid::new_v4(), &lines, &ledger)
    }

    #[test]
    fn surplus_of_two() {
        let found = detect(10, 12, 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DivergenceKind::PhysicalSurplus);
        assert_eq!(found[0].divergent_quantity, 2);
    }

    #[test]
    fn shortage_of_three() {
        let found = detect(10, 7, 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DivergenceKind::PhysicalShortage);
        assert_eq!(found[0].divergent_quantity, -3);
    }

    #[test]
    fn exact_count_has_no_divergence() {
        assert!(detect(10, 10, 0).is_empty());
    }

    #[test]
    fn unexpected_product_is_a_surplus_over_zero() {
        let found = detect(0, 4, 0);
        assert_eq!(found[0].kind, DivergenceKind::PhysicalSurplus);
        assert_eq!(found[0].expected_quantity, 0);
    }

    #[test]
    fn tolerance_closes_small_differences() {
        assert!(detect(10, 11, 1).is_empty());
        assert_eq!(detect(10, 12, 1).len(), 1);
    }

    #[test]
    fn settled_status_follows_decisions() {
        let mut found = detect(10, 12, 0);
        assert_eq!(settled_status(&found), None);

        found[0]
            .resolve(ResolutionDecision::Accept, "extra units kept", "ana")
            .unwrap();
        assert_eq!(settled_status(&found), Some(ReceivingStatus::Finalized));

        let mut rejected = detect(10, 7, 0);
        rejected[0]
            .resolve(ResolutionDecision::Reject, "supplier owes 3 units", "ana")
            .unwrap();
        assert_eq!(settled_status(&rejected), Some(ReceivingStatus::Blocked));
    }

    #[test]
    fn superseded_rejections_do_not_block_a_later_round() {
        let mut earlier = detect(10, 7, 0);
        earlier[0]
            .resolve(ResolutionDecision::Reject, "wrong invoice counted", "ana")
            .unwrap();
        earlier[0].supersede(Utc::now());

        let mut latest = detect(10, 12, 0);
        latest[0]
            .resolve(ResolutionDecision::Accept, "extra units kept", "ana")
            .unwrap();
        earlier.extend(latest);
        assert_eq!(settled_status(&earlier), Some(ReceivingStatus::Finalized));
    }
}
