//! Allocation state persistence
//!
//! Keeps the last ASN issued per range in `asn_state.json`, so that
//! successive runs never print the same number twice.

mod store;

pub use store::{LoadOutcome, LoadedState, StateError, StateStore, STATE_FILE};
