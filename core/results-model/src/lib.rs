//! FILENAME: core/results-model/src/lib.rs
//! PURPOSE: Main library entry point for the shared results model.
//! CONTEXT: Re-exports the record and status types used by the pivot engine
//! and by hosts that feed it data.

pub mod record;
pub mod status;

// Re-export commonly used types at the crate root
pub use record::{TestIndex, TestRecord, MACHINE_LABELS_FIELD, NULL_VALUE, STATUS_FIELD};
pub use status::{TestStatus, UnknownStatus};
