//! LabelBatch - one run's block of newly issued ASNs

use super::asn::{Asn, FormatScheme, RangeId};
use crate::formatter::AsnFormatter;
use crate::sequence::{self, AsnSequence};

/// Labels on one physical sheet
pub const LABELS_PER_SHEET: u32 = 189;

/// Errors raised while laying out a batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("Batch {start}..={end} does not fit the {scheme} scheme (max ASN {max})")]
    ExceedsScheme {
        start: Asn,
        end: Asn,
        scheme: &'static str,
        max: Asn,
    },

    #[error("Batch starting at {start} with {count} labels overflows the ASN space")]
    Overflow { start: Asn, count: u32 },

    #[error("Batch must contain at least one label")]
    Empty,

    #[error("Batch starting at {0} has no two-digit range")]
    NoRange(Asn),
}

/// Outcome of handing a batch to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Pending,
    Rendered,
    Failed(String),
}

/// A contiguous block of `count` ASNs and the artifact they are printed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBatch {
    range: RangeId,
    start: Asn,
    end: Asn,
    count: u32,
    artifact_name: String,
    outcome: RenderOutcome,
}

impl LabelBatch {
    /// Lay out a batch. `range` names the artifact; when the run has no
    /// requested range it is derived from the start ASN.
    pub fn plan(
        range: Option<RangeId>,
        start: Asn,
        count: u32,
        scheme: FormatScheme,
    ) -> Result<Self, BatchError> {
        let end = Self::check_fits(start, count, scheme)?;

        let range = match range {
            Some(range) => range,
            None => RangeId::containing(start).map_err(|_| BatchError::NoRange(start))?,
        };

        let artifact_name = AsnFormatter::new(scheme).artifact_name(range, start, end);

        Ok(Self {
            range,
            start,
            end,
            count,
            artifact_name,
            outcome: RenderOutcome::Pending,
        })
    }

    /// Last ASN of `count` labels from `start`, if they all fit `scheme`
    pub fn check_fits(start: Asn, count: u32, scheme: FormatScheme) -> Result<Asn, BatchError> {
        if count == 0 {
            return Err(BatchError::Empty);
        }
        let end = start
            .value()
            .checked_add(count - 1)
            .map(Asn::new)
            .ok_or(BatchError::Overflow { start, count })?;

        if end > scheme.max_asn() {
            return Err(BatchError::ExceedsScheme {
                start,
                end,
                scheme: scheme.name(),
                max: scheme.max_asn(),
            });
        }
        Ok(end)
    }

    pub fn range(&self) -> RangeId {
        self.range
    }

    pub fn start(&self) -> Asn {
        self.start
    }

    /// Last ASN of the batch (inclusive)
    pub fn end(&self) -> Asn {
        self.end
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    pub fn outcome(&self) -> &RenderOutcome {
        &self.outcome
    }

    pub fn set_outcome(&mut self, outcome: RenderOutcome) {
        self.outcome = outcome;
    }

    /// The ASNs of this batch, in order
    pub fn sequence(&self) -> AsnSequence {
        sequence::generate(self.start, self.count)
    }
}
