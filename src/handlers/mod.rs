//! Per-command handlers
//!
//! A handler receives one resolved workload at a time, inside the item's
//! [`RunContext`]. It decides whether a collaborator failure is recoverable
//! (reported as [`ItemOutcome::Failed`]) or aborts the batch
//! ([`FatalError`]).

mod build;
mod clean;
mod install;
mod launch;
mod test;

pub use build::BuildHandler;
pub use clean::{remove_artifact, CleanHandler};
pub use install::InstallHandler;
pub use launch::LaunchHandler;
pub use test::TestHandler;

use marshal_workload::{ConfigCatalog, WorkloadConfig};

use crate::batch::FatalError;
use crate::command::Command;
use crate::run::RunContext;
use crate::summary::TestOutcome;

/// What happened to one batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Done,
    /// Recoverable failure; already logged
    Failed,
    /// Classified test result, folded into the suite
    Tested(TestOutcome),
}

pub trait CommandHandler {
    fn command(&self) -> Command;

    fn handle(
        &mut self,
        ctx: &RunContext,
        config: WorkloadConfig,
        catalog: &ConfigCatalog,
    ) -> Result<ItemOutcome, FatalError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    use marshal_workload::{ConfigCatalog, SearchPath, WorkloadConfig};

    use crate::command::Command;
    use crate::logging::BatchLog;
    use crate::run::RunContext;

    /// Catalog holding `a.json` with the given content, and its lookup.
    pub fn workload(dir: &Path, value: serde_json::Value) -> (ConfigCatalog, WorkloadConfig) {
        fs::write(dir.join("a.json"), value.to_string()).unwrap();
        let mut search = SearchPath::new();
        search.insert(dir);
        let catalog = ConfigCatalog::load(&search, dir.join("images")).unwrap();
        let config = catalog.lookup("a.json").unwrap();
        (catalog, config)
    }

    /// A batch log under `dir/logs` and the context of its first item.
    pub fn context(dir: &Path, command: Command) -> (BatchLog, RunContext) {
        let log = BatchLog::create(&dir.join("logs"), command, false).unwrap();
        let ctx = RunContext::enter(&log, 0, Path::new("a.json"), command).unwrap();
        (log, ctx)
    }
}
