//! `marshal launch`: boot a workload or its jobs in a simulator

use marshal_workload::{ConfigCatalog, JobSelection, WorkloadConfig};
use tracing::{error, info};

use super::{CommandHandler, ItemOutcome};
use crate::batch::FatalError;
use crate::command::Command;
use crate::ops::{Launcher, Simulator};
use crate::run::RunContext;

/// `marshal launch`
///
/// A failed simulation is reported and skipped; a host that cannot run
/// simulations at all aborts the batch.
pub struct LaunchHandler<L> {
    launcher: L,
    simulator: Simulator,
    all: bool,
    jobs: Vec<String>,
}

impl<L: Launcher> LaunchHandler<L> {
    /// `jobs` are short job names as given with `--job`.
    pub fn new(launcher: L, simulator: Simulator, all: bool, jobs: Vec<String>) -> Self {
        Self {
            launcher,
            simulator,
            all,
            jobs,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

impl<L: Launcher> CommandHandler for LaunchHandler<L> {
    fn command(&self) -> Command {
        Command::Launch
    }

    fn handle(
        &mut self,
        ctx: &RunContext,
        config: WorkloadConfig,
        _catalog: &ConfigCatalog,
    ) -> Result<ItemOutcome, FatalError> {
        let selection = JobSelection::from_flags(&config.name, self.all, &self.jobs);

        match self.launcher.launch(&config, &selection, self.simulator) {
            Ok(out) => {
                let has_output = std::fs::read_dir(&out)
                    .map(|mut entries| entries.next().is_some())
                    .unwrap_or(false);
                if has_output {
                    info!("Workload outputs available at: {}", out.display());
                }
                Ok(ItemOutcome::Done)
            }
            Err(e) if e.is_fatal() => Err(FatalError::LaunchEnvironment(e.to_string())),
            Err(e) => {
                error!("Failed to launch workload {}: {}", config.name, e);
                error!("Log available at: {}", ctx.log_path().display());
                Ok(ItemOutcome::Failed)
            }
        }
    }
}
