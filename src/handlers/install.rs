//! `marshal install`: publish each workload to the chosen target

use marshal_workload::{ConfigCatalog, WorkloadConfig};
use tracing::info;

use super::{CommandHandler, ItemOutcome};
use crate::batch::FatalError;
use crate::command::Command;
use crate::ops::Installer;
use crate::run::RunContext;

/// `marshal install`: any install error aborts the batch.
pub struct InstallHandler<I> {
    installer: I,
    target: String,
}

impl<I: Installer> InstallHandler<I> {
    pub fn new(installer: I, target: impl Into<String>) -> Self {
        Self {
            installer,
            target: target.into(),
        }
    }
}

impl<I: Installer> CommandHandler for InstallHandler<I> {
    fn command(&self) -> Command {
        Command::Install
    }

    fn handle(
        &mut self,
        _ctx: &RunContext,
        config: WorkloadConfig,
        _catalog: &ConfigCatalog,
    ) -> Result<ItemOutcome, FatalError> {
        let path = self.installer.install(&config, &self.target)?;
        info!("Workload {} installed to {}", config.name, path.display());
        Ok(ItemOutcome::Done)
    }
}
