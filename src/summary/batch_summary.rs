//! Batch counters and the end-of-batch summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::outcome::{ExitCode, TestOutcome};
use crate::command::Command;

/// Schema identifier for the batch summary file
pub const BATCH_SUMMARY_SCHEMA_ID: &str = "marshal/batch_summary@1";

/// Running counters over the ordered list of input workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Items dispatched to a handler
    pub processed: usize,

    /// Items whose handler reported a recoverable failure
    pub items_failed: usize,

    pub skip_count: usize,
    pub fail_count: usize,

    /// False once any test failed; skips never clear it
    pub suite_pass: bool,
}

impl Default for BatchResult {
    fn default() -> Self {
        Self {
            processed: 0,
            items_failed: 0,
            skip_count: 0,
            fail_count: 0,
            suite_pass: true,
        }
    }
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one test outcome into the suite result.
    pub fn record_test(&mut self, outcome: TestOutcome) {
        match outcome {
            TestOutcome::Pass => {}
            TestOutcome::Fail => {
                self.suite_pass = false;
                self.fail_count += 1;
            }
            TestOutcome::Skip => self.skip_count += 1,
        }
    }
}

/// End-of-batch report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub schema_id: String,
    pub command: Command,
    pub created_at: DateTime<Utc>,
    pub result: BatchResult,

    /// Process exit code for this batch
    pub exit_code: i32,

    /// Combined batch log
    pub log_path: PathBuf,

    pub human_summary: String,
}

impl BatchSummary {
    /// Summarise a completed batch.
    ///
    /// Only `test` can produce a non-zero exit code here: build and launch
    /// failures are logged per item but leave the batch exit code at zero.
    pub fn new(command: Command, result: BatchResult, log_path: PathBuf) -> Self {
        let exit_code = match command {
            Command::Test if !result.suite_pass => ExitCode::Failure,
            _ => ExitCode::Success,
        };

        Self {
            schema_id: BATCH_SUMMARY_SCHEMA_ID.to_string(),
            command,
            created_at: Utc::now(),
            result,
            exit_code: exit_code.as_i32(),
            log_path,
            human_summary: Self::generate_human_summary(command, &result),
        }
    }

    fn generate_human_summary(command: Command, result: &BatchResult) -> String {
        match command {
            Command::Test if result.suite_pass => format!(
                "SUCCESS: All Tests Passed ({} tests skipped)",
                result.skip_count
            ),
            Command::Test => format!("FAILURE: {} tests failed", result.fail_count),
            _ if result.items_failed > 0 => format!(
                "{} finished: {} of {} workloads reported errors",
                command, result.items_failed, result.processed
            ),
            _ => format!("{} finished: {} workloads", command, result.processed),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_i32(self.exit_code).unwrap_or(ExitCode::Failure)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_suite(outcomes: &[TestOutcome]) -> BatchResult {
        let mut result = BatchResult::new();
        for outcome in outcomes {
            result.processed += 1;
            result.record_test(*outcome);
        }
        result
    }

    #[test]
    fn test_pass_then_fail() {
        let result = run_suite(&[TestOutcome::Pass, TestOutcome::Fail]);
        assert_eq!(result.skip_count, 0);
        assert_eq!(result.fail_count, 1);
        assert!(!result.suite_pass);

        let summary = BatchSummary::new(Command::Test, result, PathBuf::from("/logs/x.log"));
        assert_eq!(summary.exit_code(), ExitCode::Failure);
        assert_eq!(summary.human_summary, "FAILURE: 1 tests failed");
    }

    #[test]
    fn test_skips_do_not_fail_the_suite() {
        let result = run_suite(&[TestOutcome::Skip, TestOutcome::Skip, TestOutcome::Pass]);
        assert!(result.suite_pass);

        let summary = BatchSummary::new(Command::Test, result, PathBuf::new());
        assert_eq!(summary.exit_code(), ExitCode::Success);
        assert_eq!(summary.human_summary, "SUCCESS: All Tests Passed (2 tests skipped)");
    }

    #[test]
    fn test_item_failures_outside_test_exit_zero() {
        let result = BatchResult {
            processed: 2,
            items_failed: 2,
            ..BatchResult::default()
        };
        for command in [Command::Build, Command::Launch, Command::Clean, Command::Install] {
            let summary = BatchSummary::new(command, result, PathBuf::new());
            assert_eq!(summary.exit_code(), ExitCode::Success, "{} must exit 0", command);
        }
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let summary = BatchSummary::new(Command::Test, run_suite(&[TestOutcome::Skip]), PathBuf::from("/l"));

        summary.write_to_file(&path).unwrap();
        let loaded = serde_json::from_str::<BatchSummary>(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(loaded.result, summary.result);
        assert_eq!(loaded.command, Command::Test);
        assert_eq!(loaded.schema_id, BATCH_SUMMARY_SCHEMA_ID);
    }
}
