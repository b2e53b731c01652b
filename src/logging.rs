//! Log sinks for a batch
//!
//! Every batch gets its own directory under the log dir holding the combined
//! `marshal.log` plus one log per processed workload (see
//! [`crate::run::RunContext`]). Console output is filtered by `MARSHAL_LOG`,
//! then `RUST_LOG`, then `info` (`debug` with `--verbose`); files always
//! record at debug level.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};

use crate::command::Command;

/// Environment variable overriding the console filter
pub const LOG_ENV: &str = "MARSHAL_LOG";

/// Name of the combined log inside a batch log directory
pub const BATCH_LOG_FILE: &str = "marshal.log";

/// Combined log for one invocation.
pub struct BatchLog {
    dir: PathBuf,
    path: PathBuf,
    writer: NonBlocking,
    verbose: bool,
    _guard: WorkerGuard,
}

impl BatchLog {
    /// Create `<log_dir>/<command>-<timestamp>/marshal.log`.
    pub fn create(log_dir: &Path, command: Command, verbose: bool) -> io::Result<Self> {
        let stamp = Utc::now().format("%Y-%m-%d--%H-%M-%S-%6f");
        let dir = log_dir.join(format!("{}-{}", command, stamp));
        fs::create_dir_all(&dir)?;

        let (writer, guard) = file_writer(&dir, BATCH_LOG_FILE)?;
        Ok(Self {
            path: dir.join(BATCH_LOG_FILE),
            dir,
            writer,
            verbose,
            _guard: guard,
        })
    }

    /// Directory holding the combined log and every run log.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The combined log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Console plus combined log; used outside of any run context.
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(console_layer(self.verbose))
                .with(file_layer(self.writer.clone())),
        )
    }

    /// Console plus combined log plus a run-specific writer.
    pub(crate) fn dispatch_with(&self, run_writer: NonBlocking) -> Dispatch {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(console_layer(self.verbose))
                .with(file_layer(self.writer.clone()))
                .with(file_layer(run_writer)),
        )
    }
}

/// Non-rotating file appender behind a background writer.
///
/// Fails instead of panicking when the file cannot be created.
pub(crate) fn file_writer(dir: &Path, file_name: &str) -> io::Result<(NonBlocking, WorkerGuard)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("{}: {}", dir.join(file_name).display(), e),
            )
        })?;
    Ok(tracing_appender::non_blocking(appender))
}

fn console_layer<S>(verbose: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(console_filter(verbose))
        .boxed()
}

fn file_layer<S>(writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .with_filter(LevelFilter::DEBUG)
        .boxed()
}

fn console_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid {} directive ({}); using {}", LOG_ENV, err, fallback);
            EnvFilter::new(fallback)
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    }
}
