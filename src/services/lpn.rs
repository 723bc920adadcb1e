//! Volume (LPN) issuer.
//!
//! Codes are `PREFIX` + a zero-padded 11-digit sequence + a GS1 mod-10 check
//! digit, e.g. `LPN000000000017`. The sequence is process-wide and never
//! reused; every issued code is also recorded in a global index so a code
//! maps to exactly one volume regardless of which document produced it.

use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::errors::ServiceError;

const SEQUENCE_DIGITS: usize = 11;

/// Where an issued code points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLocator {
    pub document_id: Uuid,
    pub volume_id: Uuid,
}

#[derive(Debug)]
pub struct LpnIssuer {
    prefix: String,
    sequence: AtomicU64,
    issued: DashMap<String, VolumeLocator>,
}

impl LpnIssuer {
    pub fn new(prefix: impl Into<String>, start_sequence: u64) -> Self {
        Self {
            prefix: prefix.into(),
            sequence: AtomicU64::new(start_sequence),
            issued: DashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Issues a fresh code bound to `volume_id`.
    ///
    /// A code already present in the index (e.g. after restarting with an
    /// overlapping start sequence) is skipped, so the result is always unique.
    pub fn issue(&self, document_id: Uuid, volume_id: Uuid) -> String {
        loop {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let code = self.format_code(sequence);
            match self.issued.entry(code) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let code = slot.key().clone();
                    slot.insert(VolumeLocator {
                        document_id,
                        volume_id,
                    });
                    return code;
                }
            }
        }
    }

    pub fn locate(&self, code: &str) -> Option<VolumeLocator> {
        self.issued.get(code.trim()).map(|entry| *entry.value())
    }

    /// Drops a discarded volume's code from the lookup index.
    /// The sequence is not rewound, so the code is never handed out again.
    pub fn retire(&self, code: &str) {
        self.issued.remove(code);
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// True when `code` carries this issuer's prefix and a valid check digit.
    pub fn is_well_formed(&self, code: &str) -> bool {
        let Some(digits) = code.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        if digits.len() != SEQUENCE_DIGITS + 1 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let (body, check) = digits.split_at(SEQUENCE_DIGITS);
        check.parse::<u32>().ok() == Some(check_digit(body))
    }

    fn format_code(&self, sequence: u64) -> String {
        let body = format!("{:0width$}", sequence, width = SEQUENCE_DIGITS);
        let check = check_digit(&body);
        format!("{}{}{}", self.prefix, body, check)
    }
}

/// GS1 mod-10 check digit: weights 3 and 1 alternating from the rightmost digit.
pub fn check_digit(digits: &str) -> u32 {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 0 {
                d * 3
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

/// Splits a conferred quantity into per-volume quantities.
///
/// With `explicit` quantities the list must sum to `quantity`; otherwise the
/// quantity is divided evenly over `volumes_count`, spreading the remainder
/// one unit at a time over the first volumes. Every volume gets at least one
/// unit.
pub fn plan_split(
    quantity: u32,
    volumes_count: u32,
    explicit: Option<&[u32]>,
    max_volumes: u32,
) -> Result<Vec<u32>, ServiceError> {
    if quantity == 0 {
        return Err(ServiceError::validation("quantity must be greater than zero"));
    }

    if let Some(explicit) = explicit {
        if explicit.is_empty() {
            return Err(ServiceError::validation(
                "explicit volume quantities must not be empty",
            ));
        }
        if explicit.len() > max_volumes as usize {
            return Err(ServiceError::validation(format!(
                "at most {} volumes can be issued per conference",
                max_volumes
            )));
        }
        if explicit.iter().any(|&q| q == 0) {
            return Err(ServiceError::validation(
                "every volume must hold a positive quantity",
            ));
        }
        let sum: u64 = explicit.iter().map(|&q| u64::from(q)).sum();
        if sum != u64::from(quantity) {
            return Err(ServiceError::validation(format!(
                "volume quantities sum to {} but {} units were conferred",
                sum, quantity
            )));
        }
        return Ok(explicit.to_vec());
    }

    if volumes_count == 0 {
        return Err(ServiceError::validation("volumes count must be at least 1"));
    }
    if volumes_count > max_volumes {
        return Err(ServiceError::validation(format!(
            "at most {} volumes can be issued per conference",
            max_volumes
        )));
    }
    if volumes_count > quantity {
        return Err(ServiceError::validation(format!(
            "cannot split {} units into {} volumes",
            quantity, volumes_count
        )));
    }

    let base = quantity / volumes_count;
    let remainder = quantity % volumes_count;
    Ok((0..volumes_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique_and_check_digit_valid() {
        let issuer = LpnIssuer::new("LPN", 1);
        let doc = Uuid::new_v4();
        let codes: HashSet<String> = (0..500)
            .map(|_| issuer.issue(doc, Uuid::new_v4()))
            .collect();
        assert_eq!(codes.len(), 500);
        assert!(codes.iter().all(|c| issuer.is_well_formed(c)));
    }

    #[test]
    fn known_check_digit() {
        // EAN-13 4006381333931 and SSCC 106141412345678908
        assert_eq!(check_digit("400638133393"), 1);
        assert_eq!(check_digit("10614141234567890"), 8);
    }

    #[test]
    fn retired_codes_are_not_reissued() {
        let issuer = LpnIssuer::new("LPN", 7);
        let first = issuer.issue(Uuid::new_v4(), Uuid::new_v4());
        issuer.retire(&first);
        let second = issuer.issue(Uuid::new_v4(), Uuid::new_v4());
        assert_ne!(first, second);
        assert!(issuer.locate(&first).is_none());
    }

    #[test]
    fn tampered_code_fails_check() {
        let issuer = LpnIssuer::new("LPN", 42);
        let code = issuer.issue(Uuid::new_v4(), Uuid::new_v4());
        let mut tampered = code.clone();
        let last = tampered.pop().unwrap();
        let replacement = if last == '0' { '1' } else { '0' };
        tampered.push(replacement);
        assert!(!issuer.is_well_formed(&tampered));
        assert!(!issuer.is_well_formed("XYZ000000000421"));
    }

    #[test]
    fn even_split_spreads_remainder_first() {
        assert_eq!(plan_split(10, 3, None, 100).unwrap(), vec![4, 3, 3]);
        assert_eq!(plan_split(9, 3, None, 100).unwrap(), vec![3, 3, 3]);
    }

    #[test]
    fn split_rejects_more_volumes_than_units() {
        assert!(plan_split(2, 3, None, 100).is_err());
        assert!(plan_split(5, 0, None, 100).is_err());
        assert!(plan_split(500, 200, None, 100).is_err());
    }

    #[test]
    fn explicit_split_must_sum_to_quantity() {
        assert_eq!(
            plan_split(10, 1, Some(&[6, 4]), 100).unwrap(),
            vec![6, 4]
        );
        assert!(plan_split(10, 1, Some(&[6, 3]), 100).is_err());
        assert!(plan_split(10, 1, Some(&[10, 0]), 100).is_err());
    }
}
