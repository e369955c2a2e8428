pub mod allocation;
pub mod asn;
pub mod batch;

pub use allocation::AllocationState;
pub use asn::{Asn, FormatScheme, RangeId, RangeIdError, MAX_RANGE_ID, RANGE_SIZE};
pub use batch::{BatchError, LabelBatch, RenderOutcome, LABELS_PER_SHEET};
