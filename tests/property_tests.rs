//! Property-based tests for the conference arithmetic.
//!
//! These tests use proptest to check the invariants the workflow relies on
//! across a wide range of counts, splits and reversals.

use chrono::Utc;
use proptest::prelude::*;
use stateset_receiving::{
    models::{
        Divergence, DivergenceKind, QualityStatus, ReceivingLine, ReceivingStatus,
        Resolution, ResolutionDecision, ResolutionStatus, Volume, VolumeItem, VolumeReversal,
        VolumeStatus,
    },
    services::{
        divergence::{settled_status, DivergenceDetector},
        ledger::{ConferenceLedger, VolumeLog},
        lpn::{plan_split, LpnIssuer},
    },
};
use uuid::Uuid;

fn volume(product_id: Uuid, quantity: u32) -> Volume {
    Volume {
        id: Uuid::new_v4(),
        code: format!("LPN{}", Uuid::new_v4().simple()),
        document_id: Uuid::nil(),
        items: vec![VolumeItem {
            product_id,
            sku: "SKU".to_string(),
            quantity,
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
    }
}

fn divergence(decision: Option<ResolutionDecision>) -> Divergence {
    Divergence {
        id: Uuid::new_v4(),
        document_id: Uuid::nil(),
        line_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        sku: "SKU".to_string(),
        kind: DivergenceKind::PhysicalShortage,
        expected_quantity: 2,
        counted_quantity: 1,
        divergent_quantity: -1,
        status: if decision.is_some() {
            ResolutionStatus::Resolved
        } else {
            ResolutionStatus::Pending
        },
        resolution: decision.map(|decision| Resolution {
            decision,
            justification: "checked".to_string(),
            resolved_by: "supervisor".to_string(),
            resolved_at: Utc::now(),
        }),
        created_at: Utc::now(),
        superseded_at: None,
    }
}

fn decision_strategy() -> impl Strategy<Value = Option<ResolutionDecision>> {
    prop_oneof![
        Just(None),
        Just(Some(ResolutionDecision::Accept)),
        Just(Some(ResolutionDecision::Reject)),
    ]
}

// Property: an even split conserves units and differs by at most one per volume
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn even_split_conserves_quantity(quantity in 1u32..100_000, volumes in 1u32..500) {
        prop_assume!(volumes <= quantity);
        let split = plan_split(quantity, volumes, None, 500).unwrap();

        prop_assert_eq!(split.len(), volumes as usize);
        prop_assert_eq!(split.iter().map(|&q| u64::from(q)).sum::<u64>(), u64::from(quantity));
        let max = *split.iter().max().unwrap();
        let min = *split.iter().min().unwrap();
        prop_assert!(min >= 1);
        prop_assert!(max - min <= 1);
        prop_assert!(split.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn explicit_split_is_taken_verbatim_or_rejected(parts in prop::collection::vec(1u32..1000, 1..20), delta in 0u32..3) {
        let total: u32 = parts.iter().sum();
        let quantity = total + delta;
        let result = plan_split(quantity, 1, Some(&parts), 500);
        if delta == 0 {
            prop_assert_eq!(result.unwrap(), parts);
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn more_volumes_than_units_is_rejected(quantity in 1u32..50, extra in 1u32..50) {
        prop_assert!(plan_split(quantity, quantity + extra, None, 500).is_err());
    }
}

// Property: counted totals always equal the sum over non-reversed volumes
proptest! {
    #[test]
    fn ledger_counts_only_active_volumes(
        entries in prop::collection::vec((1u32..500, any::<bool>(), 0usize..2), 0..60)
    ) {
        let products = [Uuid::new_v4(), Uuid::new_v4()];
        let lines: Vec<ReceivingLine> = products
            .iter()
            .map(|&p| ReceivingLine::new(p, "SKU".into(), None, 100, "UN".into()))
            .collect();
        let mut log = VolumeLog::new();
        let mut expected = [0u64; 2];

        for (quantity, reversed, product) in &entries {
            let v = volume(products[*product], *quantity);
            let id = v.id;
            log.append(v);
            if *reversed {
                log.reverse(id, VolumeReversal {
                    reason: "recount".to_string(),
                    reversed_by: None,
                    reversed_at: Utc::now(),
                }).unwrap();
            } else {
                expected[*product] += u64::from(*quantity);
            }
        }

        let ledger = ConferenceLedger::new(&lines, &log);
        prop_assert_eq!(ledger.counted(products[0]), expected[0]);
        prop_assert_eq!(ledger.counted(products[1]), expected[1]);
        prop_assert_eq!(ledger.total_counted(), expected[0] + expected[1]);
        let progress = ledger.progress_percent();
        prop_assert!((0.0..=100.0).contains(&progress));
    }
}

// Property: classification depends only on the sign and size of the difference
proptest! {
    #[test]
    fn classification_respects_tolerance(difference in -10_000i64..10_000, tolerance in 0u32..50) {
        let kind = DivergenceDetector::new(tolerance).classify(difference);
        if difference.unsigned_abs() <= u64::from(tolerance) {
            prop_assert_eq!(kind, None);
        } else if difference > 0 {
            prop_assert_eq!(kind, Some(DivergenceKind::PhysicalSurplus));
        } else {
            prop_assert_eq!(kind, Some(DivergenceKind::PhysicalShortage));
        }
    }

    #[test]
    fn settlement_waits_for_every_divergence(decisions in prop::collection::vec(decision_strategy(), 1..10)) {
        let divergences: Vec<Divergence> = decisions.iter().map(|d| divergence(*d)).collect();
        let settled = settled_status(&divergences);

        if decisions.iter().any(Option::is_none) {
            prop_assert_eq!(settled, None);
        } else if decisions.contains(&Some(ResolutionDecision::Reject)) {
            prop_assert_eq!(settled, Some(ReceivingStatus::Blocked));
        } else {
            prop_assert_eq!(settled, Some(ReceivingStatus::Finalized));
        }
    }
}

// Property: issued codes carry a check digit that catches single-digit typos
proptest! {
    #[test]
    fn single_digit_typos_are_detected(start in 0u64..99_999_999_000, position in 0usize..11, bump in 1u8..10) {
        let issuer = LpnIssuer::new("LPN", start);
        let code = issuer.issue(Uuid::new_v4(), Uuid::new_v4());
        prop_assert!(issuer.is_well_formed(&code));

        let mut bytes = code.into_bytes();
        let index = 3 + position;
        bytes[index] = b'0' + (bytes[index] - b'0' + bump) % 10;
        let typo = String::from_utf8(bytes).unwrap();
        prop_assert!(!issuer.is_well_formed(&typo));
    }
}
