//! Reference-output testing
//!
//! A workload's `testing.refDir` mirrors the layout of a launch output
//! directory. Every file in it must appear, as a substring, in the file at
//! the same relative path of the output.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use marshal_workload::{ConfigCatalog, JobSelection, TestingSpec, WorkloadConfig};
use regex_lite::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{BuildTargets, Builder, Launcher, TestOptions, TestReport, Tester, UART_LOG};

/// Builds, launches and compares, in that order.
pub struct RefTester<B, L> {
    builder: B,
    launcher: L,
}

impl<B: Builder, L: Launcher> RefTester<B, L> {
    pub fn new(builder: B, launcher: L) -> Self {
        Self { builder, launcher }
    }
}

impl<B: Builder, L: Launcher> Tester for RefTester<B, L> {
    fn test(&mut self, config: &WorkloadConfig, catalog: &ConfigCatalog, options: &TestOptions) -> TestReport {
        let Some(testing) = &config.testing else {
            return TestReport::skip(format!("{} has no testing block", config.name));
        };

        let output = match &options.manual {
            Some(dir) => {
                info!("Comparing existing output in {}", dir.display());
                dir.clone()
            }
            None => {
                if let Err(e) = self.builder.build(config, catalog, BuildTargets::ALL) {
                    return TestReport::fail(None, format!("build failed: {}", e));
                }
                let jobs = if config.has_jobs() {
                    JobSelection::All
                } else {
                    JobSelection::None
                };
                match self.launcher.launch(config, &jobs, options.simulator) {
                    Ok(dir) => dir,
                    Err(e) => return TestReport::fail(None, format!("launch failed: {}", e)),
                }
            }
        };

        match compare_output(testing, &output) {
            Ok(()) => TestReport::pass(output),
            Err(detail) => {
                if options.verbose {
                    log_uart_logs(&output);
                }
                TestReport::fail(Some(output), detail)
            }
        }
    }
}

/// Check every reference file against the output directory.
pub fn compare_output(testing: &TestingSpec, output_dir: &Path) -> Result<(), String> {
    if !testing.ref_dir.is_dir() {
        return Err(format!("reference directory {} does not exist", testing.ref_dir.display()));
    }

    let mut compared = 0;
    for entry in WalkDir::new(&testing.ref_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| format!("cannot read reference directory: {}", e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&testing.ref_dir)
            .map_err(|e| e.to_string())?;
        let actual_path = output_dir.join(relative);

        let expected = read_text(entry.path())?;
        let actual = read_text(&actual_path)?;
        let (expected, actual) = if testing.strip {
            (strip_timestamps(&expected), strip_timestamps(&actual))
        } else {
            (expected, actual)
        };

        if !actual.contains(expected.trim_end()) {
            return Err(format!(
                "{} does not match reference {}",
                actual_path.display(),
                entry.path().display()
            ));
        }
        debug!("{} matches", relative.display());
        compared += 1;
    }

    if compared == 0 {
        return Err(format!("no reference files in {}", testing.ref_dir.display()));
    }
    Ok(())
}

/// Remove kernel log timestamps such as `[    1.234567] `.
pub fn strip_timestamps(text: &str) -> String {
    static TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    let re = TIMESTAMP.get_or_init(|| {
        Regex::new(r"(?m)^\[\s*\d+\.\d+\]\s?").expect("timestamp pattern is valid")
    });
    re.replace_all(text, "").into_owned()
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn log_uart_logs(output_dir: &Path) {
    for entry in WalkDir::new(output_dir).into_iter().filter_map(Result::ok) {
        if entry.file_name() == UART_LOG {
            if let Ok(text) = read_text(entry.path()) {
                info!("{}:\n{}", entry.path().display(), text);
            }
        }
    }
}
