//! Collaborators the command handlers drive
//!
//! Building, simulating, testing and installing are reached through the
//! traits below. The batch core only depends on these contracts; the
//! implementations shipped here (`ScriptBuilder`, `SimLauncher`,
//! `RefTester`, `FireSimInstaller`) are one way to satisfy them.

mod build;
mod install;
mod reftest;
mod sim;

pub use build::ScriptBuilder;
pub use install::{FireSimInstaller, INSTALL_SCHEMA_ID};
pub use reftest::{compare_output, strip_timestamps, RefTester};
pub use sim::{SimLauncher, SimSettings, UART_LOG};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use marshal_workload::{CatalogError, ConfigCatalog, JobSelection, WorkloadConfig};
use thiserror::Error;

use crate::summary::TestOutcome;

/// Which artifacts a build should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTargets {
    pub bin: bool,
    pub img: bool,
}

impl BuildTargets {
    pub const ALL: BuildTargets = BuildTargets { bin: true, img: true };

    /// `-B` selects the binary only, `-I` the image only; both or neither
    /// select both.
    pub fn from_flags(bin_only: bool, img_only: bool) -> Self {
        if bin_only == img_only {
            Self::ALL
        } else {
            BuildTargets {
                bin: bin_only,
                img: img_only,
            }
        }
    }
}

impl Default for BuildTargets {
    fn default() -> Self {
        Self::ALL
    }
}

/// Simulation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Simulator {
    #[default]
    Qemu,
    Spike,
}

impl Simulator {
    pub fn from_spike_flag(spike: bool) -> Self {
        if spike {
            Simulator::Spike
        } else {
            Simulator::Qemu
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Simulator::Qemu => "qemu",
            Simulator::Spike => "spike",
        }
    }
}

impl fmt::Display for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build failures. All of them are item-local.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot resolve dependency: {0}")]
    Dependency(#[from] CatalogError),

    #[error("build of '{name}' exited with status {code}")]
    Status { name: String, code: i32 },

    #[error("failed to run build command for '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("build of '{name}' did not produce {}", path.display())]
    MissingArtifact { name: String, path: PathBuf },
}

impl BuildError {
    /// Integer status of the failed build (1 when the command never ran).
    pub fn status(&self) -> i32 {
        match self {
            BuildError::Status { code, .. } => *code,
            _ => 1,
        }
    }
}

/// Launch failures.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The launch went wrong for this workload only; the batch continues.
    #[error("{0}")]
    Failed(String),

    /// The host cannot run simulations at all; the batch is aborted.
    #[error("{0}")]
    Environment(String),
}

impl LaunchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, LaunchError::Environment(_))
    }
}

/// Install failures. Every one aborts the batch.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unknown install target '{target}' (configured: {known})")]
    UnknownTarget { target: String, known: String },

    #[error("workload '{name}' is not built: {} is missing", path.display())]
    NotBuilt { name: String, path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options shared by every test in a suite.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub simulator: Simulator,

    /// Log simulator output when a comparison fails
    pub verbose: bool,

    /// Compare this existing output directory instead of launching
    pub manual: Option<PathBuf>,
}

/// Result of testing one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub outcome: TestOutcome,

    /// Where the compared output lives (None when nothing ran)
    pub result_dir: Option<PathBuf>,

    /// Why the test failed or was skipped
    pub detail: Option<String>,
}

impl TestReport {
    pub fn pass(result_dir: PathBuf) -> Self {
        Self {
            outcome: TestOutcome::Pass,
            result_dir: Some(result_dir),
            detail: None,
        }
    }

    pub fn fail(result_dir: Option<PathBuf>, detail: impl Into<String>) -> Self {
        Self {
            outcome: TestOutcome::Fail,
            result_dir,
            detail: Some(detail.into()),
        }
    }

    pub fn skip(detail: impl Into<String>) -> Self {
        Self {
            outcome: TestOutcome::Skip,
            result_dir: None,
            detail: Some(detail.into()),
        }
    }
}

/// Produces a workload's artifacts.
///
/// `config` already reflects command-line overrides such as no-disk mode;
/// the catalog is available to resolve what the workload depends on.
pub trait Builder {
    fn build(
        &mut self,
        config: &WorkloadConfig,
        catalog: &ConfigCatalog,
        targets: BuildTargets,
    ) -> Result<(), BuildError>;
}

/// Boots a built workload in a simulator and returns its output directory.
pub trait Launcher {
    fn launch(
        &mut self,
        config: &WorkloadConfig,
        jobs: &JobSelection,
        simulator: Simulator,
    ) -> Result<PathBuf, LaunchError>;
}

/// Runs a workload's test and classifies it.
pub trait Tester {
    fn test(&mut self, config: &WorkloadConfig, catalog: &ConfigCatalog, options: &TestOptions) -> TestReport;
}

/// Publishes a built workload to a deployment target.
pub trait Installer {
    fn install(&mut self, config: &WorkloadConfig, target: &str) -> Result<PathBuf, InstallError>;
}

/// `base`, or `base-1`, `base-2`, ... whichever does not exist yet.
pub(crate) fn unique_dir(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }
    let mut n = 1;
    loop {
        let mut name = base.file_name().unwrap_or_default().to_os_string();
        name.push(format!("-{}", n));
        let candidate = base.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_targets_from_flags() {
        assert_eq!(BuildTargets::from_flags(false, false), BuildTargets::ALL);
        assert_eq!(BuildTargets::from_flags(true, true), BuildTargets::ALL);
        assert_eq!(BuildTargets::from_flags(true, false), BuildTargets { bin: true, img: false });
        assert_eq!(BuildTargets::from_flags(false, true), BuildTargets { bin: false, img: true });
    }

    #[test]
    fn test_build_error_status() {
        let err = BuildError::Status {
            name: "a".to_string(),
            code: 2,
        };
        assert_eq!(err.status(), 2);
        assert_eq!(
            BuildError::MissingArtifact {
                name: "a".to_string(),
                path: PathBuf::from("/x")
            }
            .status(),
            1
        );
    }

    #[test]
    fn test_launch_error_fatality() {
        assert!(LaunchError::Environment("no qemu".to_string()).is_fatal());
        assert!(!LaunchError::Failed("boom".to_string()).is_fatal());
    }

    #[test]
    fn test_unique_dir() {
        let root = TempDir::new().unwrap();
        let base = root.path().join("out");
        assert_eq!(unique_dir(&base), base);

        std::fs::create_dir(&base).unwrap();
        std::fs::create_dir(root.path().join("out-1")).unwrap();
        assert_eq!(unique_dir(&base), root.path().join("out-2"));
    }
}
