//! Run context: identity plus a scoped log sink for one batch item

use std::io;
use std::path::{Path, PathBuf};

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;

use crate::command::Command;
use crate::logging::{file_writer, BatchLog};

/// Identity and log destination of one batch item.
///
/// Logging inside [`RunContext::scope`] goes to the console, the combined
/// batch log and this item's own log file. The item log is flushed when the
/// context is dropped.
pub struct RunContext {
    index: usize,
    name: String,
    command: Command,
    log_path: PathBuf,
    dispatch: Dispatch,
    _guard: WorkerGuard,
}

impl RunContext {
    /// Establish the context for the `index`-th input of the batch.
    ///
    /// The run log is `<batch log dir>/<index>-<name>-<command>.log`, so two
    /// inputs never share a file even when their names collide.
    pub fn enter(batch: &BatchLog, index: usize, input: &Path, command: Command) -> io::Result<Self> {
        let name = run_name(input);
        let file_name = format!("{:03}-{}-{}.log", index, name, command);
        let log_path = batch.dir().join(&file_name);

        let (writer, guard) = file_writer(batch.dir(), &file_name)?;
        Ok(Self {
            index,
            name,
            command,
            log_path,
            dispatch: batch.dispatch_with(writer),
            _guard: guard,
        })
    }

    /// Base name of the input file without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// Position of the item in the batch (0-based).
    pub fn index(&self) -> usize {
        self.index
    }

    /// `<name>-<command>`
    pub fn run_id(&self) -> String {
        format!("{}-{}", self.name, self.command)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Run `f` with this context's log sink installed; the previous sink is
    /// restored when `f` returns.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

fn run_name(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workload")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identity_from_input() {
        let root = TempDir::new().unwrap();
        let batch = BatchLog::create(root.path(), Command::Test, false).unwrap();
        let ctx = RunContext::enter(&batch, 3, Path::new("/wl/linux-hello.json"), Command::Test).unwrap();

        assert_eq!(ctx.name(), "linux-hello");
        assert_eq!(ctx.run_id(), "linux-hello-test");
        assert_eq!(ctx.index(), 3);
        assert_eq!(ctx.log_path(), batch.dir().join("003-linux-hello-test.log"));
    }

    #[test]
    fn test_items_log_to_separate_files() {
        let root = TempDir::new().unwrap();
        let batch = BatchLog::create(root.path(), Command::Build, false).unwrap();

        let mut paths = Vec::new();
        for (index, input) in ["a/x.json", "b/x.json"].iter().enumerate() {
            let ctx = RunContext::enter(&batch, index, Path::new(input), Command::Build).unwrap();
            ctx.scope(|| tracing::info!("item {}", index));
            paths.push(ctx.log_path().to_path_buf());
        }

        assert_ne!(paths[0], paths[1]);
        let first = fs::read_to_string(&paths[0]).unwrap();
        let second = fs::read_to_string(&paths[1]).unwrap();
        assert!(first.contains("item 0") && !first.contains("item 1"));
        assert!(second.contains("item 1") && !second.contains("item 0"));
    }

    #[test]
    fn test_uncreatable_run_log_is_an_error() {
        let root = TempDir::new().unwrap();
        let batch = BatchLog::create(root.path(), Command::Build, false).unwrap();
        let input = format!("/wl/{}.json", "a".repeat(250));

        let result = RunContext::enter(&batch, 0, Path::new(&input), Command::Build);
        assert!(result.is_err());
    }
}
