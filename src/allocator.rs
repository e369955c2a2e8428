//! Range-based start resolution
//!
//! A run that requests a range continues strictly after the range's
//! watermark. The batch end is checked against the requested range's own
//! upper bound; nothing is allocated when it does not fit.

use crate::models::{AllocationState, Asn, RangeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error(
        "Range {range} is exhausted: {batch_size} labels from {start} would end at {end}, past {limit}"
    )]
    RangeExhausted {
        range: RangeId,
        start: Asn,
        end: u64,
        limit: Asn,
        batch_size: u32,
    },
}

/// First ASN of the next batch in `range`.
///
/// With no watermark recorded the batch starts at the range base; otherwise it
/// starts right after the last issued ASN. Fails when `batch_size` labels
/// would run past the range's last ASN.
pub fn resolve_start(
    range: RangeId,
    state: &AllocationState,
    batch_size: u32,
) -> Result<Asn, AllocationError> {
    let base_start = range.base_start();
    let base_end = range.base_end();

    let start: u64 = match state.last_issued(range) {
        None => u64::from(base_start.value()),
        Some(watermark) => u64::from(watermark.value()) + 1,
    };

    let end = start + u64::from(batch_size.max(1)) - 1;
    if end > u64::from(base_end.value()) {
        return Err(AllocationError::RangeExhausted {
            range,
            start: Asn::new(start.min(u64::from(u32::MAX)) as u32),
            end,
            limit: base_end,
            batch_size,
        });
    }

    // end <= base_end, so start fits in u32
    Ok(Asn::new(start as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LABELS_PER_SHEET;

    fn range(id: u32) -> RangeId {
        RangeId::new(id).unwrap()
    }

    fn state(entries: &[(u32, u32)]) -> AllocationState {
        entries
            .iter()
            .map(|(r, a)| (range(*r), Asn::new(*a)))
            .collect()
    }

    #[test]
    fn test_empty_state_starts_at_base() {
        for id in [0, 1, 2, 42, 99] {
            let start = resolve_start(range(id), &AllocationState::new(), LABELS_PER_SHEET).unwrap();
            assert_eq!(start.value(), id * 100_000);
        }
    }

    #[test]
    fn test_continues_after_watermark() {
        let start = resolve_start(range(1), &state(&[(1, 100_099)]), LABELS_PER_SHEET).unwrap();
        assert_eq!(start, Asn::new(100_100));
    }

    #[test]
    fn test_other_range_watermark_ignored() {
        let start = resolve_start(range(2), &state(&[(1, 100_099)]), LABELS_PER_SHEET).unwrap();
        assert_eq!(start, Asn::new(200_000));
    }

    #[test]
    fn test_boundary_uses_requested_range() {
        // 299_901 + 188 = 300_089 <= 399_999
        let start = resolve_start(range(3), &state(&[(3, 299_900)]), LABELS_PER_SHEET).unwrap();
        assert_eq!(start, Asn::new(299_901));

        let start = resolve_start(range(3), &state(&[(3, 399_700)]), LABELS_PER_SHEET).unwrap();
        assert_eq!(start, Asn::new(399_701));
    }

    #[test]
    fn test_exact_fit_succeeds() {
        // 399_811 + 188 == 399_999
        let start = resolve_start(range(3), &state(&[(3, 399_810)]), LABELS_PER_SHEET).unwrap();
        assert_eq!(start, Asn::new(399_811));
    }

    #[test]
    fn test_exhausted_by_one() {
        let err = resolve_start(range(3), &state(&[(3, 399_811)]), LABELS_PER_SHEET).unwrap_err();
        let AllocationError::RangeExhausted { start, end, limit, .. } = err;
        assert_eq!(start, Asn::new(399_812));
        assert_eq!(end, 400_000);
        assert_eq!(limit, Asn::new(399_999));
    }

    #[test]
    fn test_fully_issued_range_is_exhausted() {
        let err = resolve_start(range(99), &state(&[(99, 9_999_999)]), 1).unwrap_err();
        assert!(matches!(err, AllocationError::RangeExhausted { .. }));
    }
}
