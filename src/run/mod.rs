//! Per-workload run identity
//!
//! A [`RunContext`] is created for every input workload of a batch before any
//! other work on it happens, and dropped when the item is done.

mod context;

pub use context::RunContext;
