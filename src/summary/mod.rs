//! Item outcomes and batch-level aggregation
//!
//! Only the test workflow feeds the suite result; the batch summary of every
//! other command always maps to a zero exit code.

mod batch_summary;
mod outcome;

pub use batch_summary::{BatchResult, BatchSummary, BATCH_SUMMARY_SCHEMA_ID};
pub use outcome::{ExitCode, TestOutcome};
