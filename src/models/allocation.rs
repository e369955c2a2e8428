//! AllocationState - last ASN issued per range

use super::asn::{Asn, RangeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Watermarks keyed by two-digit range id.
///
/// A missing key means nothing has been issued in that range yet. The map is
/// never mutated in place by a run: [`AllocationState::with_watermark`] returns
/// the next state, which the caller persists once rendering has succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationState {
    watermarks: BTreeMap<String, Asn>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last ASN issued in `range`, if any
    pub fn last_issued(&self, range: RangeId) -> Option<Asn> {
        self.watermarks.get(&range.key()).copied()
    }

    /// Next state with `range` advanced to `last_issued`
    pub fn with_watermark(&self, range: RangeId, last_issued: Asn) -> Self {
        let mut next = self.clone();
        next.watermarks.insert(range.key(), last_issued);
        next
    }

    pub fn is_empty(&self) -> bool {
        self.watermarks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.watermarks.len()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Asn)> {
        self.watermarks.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(RangeId, Asn)> for AllocationState {
    fn from_iter<I: IntoIterator<Item = (RangeId, Asn)>>(iter: I) -> Self {
        Self {
            watermarks: iter.into_iter().map(|(r, a)| (r.key(), a)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(id: u32) -> RangeId {
        RangeId::new(id).unwrap()
    }

    #[test]
    fn test_with_watermark_leaves_original_untouched() {
        let before: AllocationState = [(range(1), Asn::new(100_099))].into_iter().collect();
        let after = before.with_watermark(range(1), Asn::new(100_288));

        assert_eq!(before.last_issued(range(1)), Some(Asn::new(100_099)));
        assert_eq!(after.last_issued(range(1)), Some(Asn::new(100_288)));
    }

    #[test]
    fn test_other_ranges_preserved() {
        let before: AllocationState = [(range(1), Asn::new(100_099))].into_iter().collect();
        let after = before.with_watermark(range(2), Asn::new(200_188));

        assert_eq!(after.len(), 2);
        assert_eq!(after.last_issued(range(1)), Some(Asn::new(100_099)));
        assert_eq!(after.last_issued(range(2)), Some(Asn::new(200_188)));
    }

    #[test]
    fn test_json_layout() {
        let state: AllocationState = [(range(3), Asn::new(299_900)), (range(1), Asn::new(100_099))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"01":100099,"03":299900}"#);

        let parsed: AllocationState = serde_json::from_str(r#"{"01": 100099}"#).unwrap();
        assert_eq!(parsed.last_issued(range(1)), Some(Asn::new(100_099)));
        assert_eq!(parsed.last_issued(range(2)), None);
    }
}
