//! `marshal clean`: delete built artifacts

use std::fs;
use std::io;
use std::path::Path;

use marshal_workload::{ConfigCatalog, WorkloadConfig};
use tracing::{debug, error, info};

use super::{CommandHandler, ItemOutcome};
use crate::batch::FatalError;
use crate::command::Command;
use crate::run::RunContext;

/// `marshal clean`: removes every artifact of the workload and its jobs.
#[derive(Debug, Default)]
pub struct CleanHandler;

impl CleanHandler {
    pub fn new() -> Self {
        Self
    }
}

impl CommandHandler for CleanHandler {
    fn command(&self) -> Command {
        Command::Clean
    }

    fn handle(
        &mut self,
        ctx: &RunContext,
        config: WorkloadConfig,
        _catalog: &ConfigCatalog,
    ) -> Result<ItemOutcome, FatalError> {
        let paths = std::iter::once(&config)
            .chain(config.jobs.values())
            .flat_map(WorkloadConfig::artifacts);

        let mut failed = false;
        for path in paths {
            if let Err(e) = remove_artifact(&path) {
                error!("Failed to remove {}: {}", path.display(), e);
                failed = true;
            }
        }

        if failed {
            error!("Log available at: {}", ctx.log_path().display());
            Ok(ItemOutcome::Failed)
        } else {
            info!("Cleaned {}", config.name);
            Ok(ItemOutcome::Done)
        }
    }
}

/// Delete a file or directory tree. A path that does not exist is fine.
pub fn remove_artifact(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    debug!("Removing {}", path.display());
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, workload};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_removes_every_artifact_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (catalog, config) = workload(
            dir.path(),
            json!({"bin": "a-bin", "img": "a.img", "jobs": [{"name": "j1", "bin": "j1-bin"}]}),
        );
        for f in ["a-bin", "a-bin-nodisk", "a-bin-dwarf", "j1-bin", "j1-bin-nodisk"] {
            fs::write(dir.path().join(f), b"x").unwrap();
        }
        fs::create_dir_all(dir.path().join("a.img/nested")).unwrap();
        fs::write(dir.path().join("a.img/nested/f"), b"x").unwrap();
        fs::write(dir.path().join("keep.txt"), b"x").unwrap();
        let (_log, ctx) = context(dir.path(), Command::Clean);

        let mut handler = CleanHandler::new();
        assert_eq!(handler.handle(&ctx, config.clone(), &catalog).unwrap(), ItemOutcome::Done);
        for f in ["a-bin", "a-bin-nodisk", "a-bin-dwarf", "a.img", "j1-bin", "j1-bin-nodisk"] {
            assert!(!dir.path().join(f).exists(), "{} survived", f);
        }
        assert!(dir.path().join("keep.txt").exists());

        assert_eq!(handler.handle(&ctx, config, &catalog).unwrap(), ItemOutcome::Done);
    }

    #[test]
    fn test_missing_path_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(remove_artifact(&dir.path().join("nope")).is_ok());
    }
}
