//! Workload descriptors and their lookup.
//!
//! A workload is described by a JSON file. Files are discovered by scanning an
//! ordered list of directories (the [`SearchPath`]); the [`ConfigCatalog`]
//! indexes them by file name and resolves `base` inheritance and per-job
//! records into a [`WorkloadConfig`].

mod catalog;
mod merge;
mod search_path;
mod selection;
mod workload;

pub use catalog::{CatalogError, ConfigCatalog};
pub use merge::{deep_merge, merge_layers};
pub use search_path::SearchPath;
pub use selection::JobSelection;
pub use workload::{nodisk_path, TestingSpec, WorkloadConfig};

/// File extension of workload descriptors.
pub const WORKLOAD_EXTENSION: &str = "json";
