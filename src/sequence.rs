//! Lazy, restartable sequence of consecutive ASNs

use crate::formatter::{AsnFormatter, FormatError, FormattedLabel};
use crate::models::Asn;

/// `count` consecutive ASNs starting at `start`.
///
/// The iterator holds only its inputs and a cursor; cloning it or calling
/// [`AsnSequence::restart`] yields the same values again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsnSequence {
    start: Asn,
    count: u32,
    offset: u32,
}

/// Build the sequence for a run.
///
/// `count` is clamped so the sequence never runs past `u32::MAX`.
pub fn generate(start: Asn, count: u32) -> AsnSequence {
    let available = (u32::MAX - start.value()).saturating_add(1);
    AsnSequence {
        start,
        count: count.min(available),
        offset: 0,
    }
}

impl AsnSequence {
    pub fn start(&self) -> Asn {
        self.start
    }

    /// Fresh copy positioned at the first element
    pub fn restart(&self) -> AsnSequence {
        generate(self.start, self.count)
    }

    /// Map every ASN through `formatter`
    pub fn labels(
        self,
        formatter: AsnFormatter,
    ) -> impl Iterator<Item = Result<FormattedLabel, FormatError>> {
        self.map(move |asn| formatter.label(asn))
    }
}

impl Iterator for AsnSequence {
    type Item = Asn;

    fn next(&mut self) -> Option<Asn> {
        if self.offset >= self.count {
            return None;
        }
        let value = self.start.value().checked_add(self.offset)?;
        self.offset += 1;
        Some(Asn::new(value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.offset) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AsnSequence {}
