// asn-labels - Archive Serial Number allocation for paperless label sheets
// Issues collision-free ASNs per two-digit range and remembers the last one printed

pub mod allocator;
pub mod config;
pub mod formatter;
pub mod job;
pub mod models;
pub mod renderer;
pub mod sequence;
pub mod state;

pub use anyhow::{Context, Result};

// Re-export commonly used types
pub use formatter::{AsnFormatter, FormattedLabel};
pub use job::{JobError, JobReport, JobSettings, LabelJob, StartRequest};
pub use models::{AllocationState, Asn, FormatScheme, LabelBatch, RangeId};
pub use state::StateStore;
