//! The batch loop: one run context per input, dispatched to a handler
//!
//! Items are processed strictly in input order. A fatal error stops the loop
//! before the next input is looked at; everything else is folded into the
//! [`BatchResult`].

use std::io;
use std::path::{Path, PathBuf};

use marshal_workload::{CatalogError, ConfigCatalog};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;
use crate::handlers::{CommandHandler, ItemOutcome};
use crate::logging::BatchLog;
use crate::ops::InstallError;
use crate::run::RunContext;
use crate::summary::{BatchResult, ExitCode};

/// Errors that abort the whole invocation.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot set up logging in {}: {source}", path.display())]
    Logging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot load workloads: {0}")]
    Catalog(#[from] CatalogError),

    #[error("{count} warning(s) while loading workloads (--werr)")]
    Warnings { count: usize },

    #[error("cannot set up run for {}: {source}", input.display())]
    RunContext {
        input: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot load workload '{name}': {source}")]
    Lookup {
        name: String,
        #[source]
        source: CatalogError,
    },

    #[error("launch environment error: {0}")]
    LaunchEnvironment(String),

    #[error("install failed: {0}")]
    Install(#[from] InstallError),
}

impl FatalError {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::Failure
    }
}

/// Report catalog load warnings; under `werr` any warning is fatal.
pub fn check_warnings(catalog: &ConfigCatalog, werr: bool) -> Result<(), FatalError> {
    for warning in catalog.warnings() {
        warn!("{}", warning);
    }
    if werr && !catalog.warnings().is_empty() {
        return Err(FatalError::Warnings {
            count: catalog.warnings().len(),
        });
    }
    Ok(())
}

/// Drives a handler over an ordered list of workload files.
pub struct BatchProcessor<'a> {
    catalog: &'a ConfigCatalog,
    log: &'a BatchLog,
    nodisk: bool,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(catalog: &'a ConfigCatalog, log: &'a BatchLog) -> Self {
        Self {
            catalog,
            log,
            nodisk: false,
        }
    }

    /// Force no-disk mode on every workload (and its jobs) before dispatch.
    pub fn nodisk(mut self, nodisk: bool) -> Self {
        self.nodisk = nodisk;
        self
    }

    /// Process `inputs` in order.
    ///
    /// Returns the aggregate once every input was handled, or the first
    /// fatal error. Inputs after a fatal error are never attempted.
    pub fn run(
        &self,
        inputs: &[PathBuf],
        handler: &mut dyn CommandHandler,
    ) -> Result<BatchResult, FatalError> {
        let mut result = BatchResult::new();

        for (index, input) in inputs.iter().enumerate() {
            let ctx = RunContext::enter(self.log, index, input, handler.command()).map_err(|source| {
                FatalError::RunContext {
                    input: input.clone(),
                    source,
                }
            })?;

            let outcome = ctx.scope(|| {
                self.process(&ctx, input, &mut *handler).map_err(|e| {
                    error!("{}", e);
                    error!("Run log: {}", ctx.log_path().display());
                    e
                })
            })?;

            result.processed += 1;
            match outcome {
                ItemOutcome::Done => {}
                ItemOutcome::Failed => result.items_failed += 1,
                ItemOutcome::Tested(outcome) => result.record_test(outcome),
            }
        }

        Ok(result)
    }

    fn process(
        &self,
        ctx: &RunContext,
        input: &Path,
        handler: &mut dyn CommandHandler,
    ) -> Result<ItemOutcome, FatalError> {
        let key = lookup_key(input);
        info!("{} {}", ctx.command(), key);

        let mut config = self.catalog.lookup(&key).map_err(|source| FatalError::Lookup {
            name: key.clone(),
            source,
        })?;
        if let Some(path) = self.catalog.source_of(&key) {
            debug!("{} resolved from {}", key, path.display());
        }
        if self.nodisk {
            config.force_nodisk();
        }

        handler.handle(ctx, config, self.catalog)
    }
}

/// Catalog key of an input file: its base name, extension included.
fn lookup_key(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string_lossy().into_owned())
}
