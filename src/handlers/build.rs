//! `marshal build`: one builder call per workload

use marshal_workload::{ConfigCatalog, WorkloadConfig};
use tracing::{error, info};

use super::{CommandHandler, ItemOutcome};
use crate::batch::FatalError;
use crate::command::Command;
use crate::ops::{BuildTargets, Builder};
use crate::run::RunContext;

/// `marshal build`: build failures are reported and the batch moves on.
pub struct BuildHandler<B> {
    builder: B,
    targets: BuildTargets,
}

impl<B: Builder> BuildHandler<B> {
    pub fn new(builder: B, targets: BuildTargets) -> Self {
        Self { builder, targets }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }
}

impl<B: Builder> CommandHandler for BuildHandler<B> {
    fn command(&self) -> Command {
        Command::Build
    }

    fn handle(
        &mut self,
        ctx: &RunContext,
        config: WorkloadConfig,
        catalog: &ConfigCatalog,
    ) -> Result<ItemOutcome, FatalError> {
        match self.builder.build(&config, catalog, self.targets) {
            Ok(()) => {
                info!("Successfully built {}", config.name);
                Ok(ItemOutcome::Done)
            }
            Err(e) => {
                error!("Failed to build workload {} (status {}): {}", config.name, e.status(), e);
                error!("Log available at: {}", ctx.log_path().display());
                Ok(ItemOutcome::Failed)
            }
        }
    }
}
