//! Human-readable goat ids (`RZ-GOAT-<year>-<farmer_id>-<seq:03>`).
//!
//! # Invariants
//! - Sequences are per farmer and continue from the highest one already
//!   issued, regardless of the year segment.
//! - Ids that do not follow the default shape never advance the sequence.

use crate::model::FarmerId;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default bound on candidates tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

static RIZARA_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^RZ-GOAT-(\d{4})-(\d+)-(\d+)$").expect("valid rizara id regex")
});

/// Input for one candidate id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RizaraIdRequest {
    pub farmer_id: FarmerId,
    pub year: i32,
    /// First unused sequence for the farmer.
    pub sequence: u32,
    /// Zero-based retry counter.
    pub attempt: u32,
}

/// Produces rizara id candidates. Collisions are retried with `attempt + 1`.
pub trait RizaraIdGenerator {
    fn candidate(&self, request: &RizaraIdRequest) -> String;
}

/// Default generator: `RZ-GOAT-{year}-{farmer_id}-{sequence + attempt:03}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FarmerSequenceIdGenerator;

impl RizaraIdGenerator for FarmerSequenceIdGenerator {
    fn candidate(&self, request: &RizaraIdRequest) -> String {
        format_rizara_id(
            request.year,
            request.farmer_id,
            request.sequence.saturating_add(request.attempt),
        )
    }
}

pub fn format_rizara_id(year: i32, farmer_id: FarmerId, sequence: u32) -> String {
    format!("RZ-GOAT-{year}-{farmer_id}-{sequence:03}")
}

/// One past the highest sequence found among `existing` ids of `farmer_id`.
pub fn next_sequence<S: AsRef<str>>(farmer_id: FarmerId, existing: &[S]) -> u32 {
    existing
        .iter()
        .filter_map(|id| {
            let captures = RIZARA_ID_RE.captures(id.as_ref())?;
            let owner: FarmerId = captures.get(2)?.as_str().parse().ok()?;
            if owner != farmer_id {
                return None;
            }
            captures.get(3)?.as_str().parse::<u32>().ok()
        })
        .max()
        .map_or(1, |highest| highest.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::{
        format_rizara_id, next_sequence, FarmerSequenceIdGenerator, RizaraIdGenerator,
        RizaraIdRequest,
    };

    #[test]
    fn sequence_is_zero_padded() {
        assert_eq!(format_rizara_id(2026, 7, 1), "RZ-GOAT-2026-7-001");
        assert_eq!(format_rizara_id(2026, 7, 1234), "RZ-GOAT-2026-7-1234");
    }

    #[test]
    fn next_sequence_continues_from_highest() {
        assert_eq!(next_sequence::<&str>(3, &[]), 1);
        let existing = [
            "RZ-GOAT-2025-3-009",
            "RZ-GOAT-2026-3-002",
            "RZ-GOAT-2026-31-050",
            "legacy-tag",
        ];
        assert_eq!(next_sequence(3, &existing), 10);
    }

    #[test]
    fn retries_advance_the_candidate() {
        let request = RizaraIdRequest {
            farmer_id: 4,
            year: 2026,
            sequence: 2,
            attempt: 3,
        };
        assert_eq!(
            FarmerSequenceIdGenerator.candidate(&request),
            "RZ-GOAT-2026-4-005"
        );
    }
}
