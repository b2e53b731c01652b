//! FireMarshal - workload build/launch/test harness
//!
//! Runs one command (build, launch, test, clean or install) over an ordered
//! list of workload configuration files. Each file is resolved through a
//! [`ConfigCatalog`] built from a search path of workload directories, then
//! handed to the command's handler inside its own [`RunContext`].

pub mod batch;
pub mod command;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod ops;
pub mod run;
pub mod summary;
pub mod timeout;

pub use batch::{BatchProcessor, FatalError};
pub use command::Command;
pub use config::{EffectiveConfig, MarshalConfig};
pub use handlers::{CommandHandler, ItemOutcome};
pub use logging::BatchLog;
pub use run::RunContext;
pub use summary::{BatchResult, BatchSummary, ExitCode, TestOutcome};

pub use marshal_workload::{ConfigCatalog, JobSelection, SearchPath, WorkloadConfig};
