//! Test outcomes and stable process exit codes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of testing one workload.
///
/// Skip is its own state so that a skipped test never counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Pass,
    Fail,
    Skip,
}

impl TestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestOutcome::Pass => "PASS",
            TestOutcome::Fail => "FAIL",
            TestOutcome::Skip => "SKIP",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Batch finished (for `test`: every test passed or was skipped)
    #[default]
    Success = 0,
    /// A test failed, or the batch was aborted by a fatal condition
    Failure = 1,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::Failure),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(serde_json::to_string(&TestOutcome::Pass).unwrap(), r#""pass""#);
        assert_eq!(serde_json::to_string(&TestOutcome::Skip).unwrap(), r#""skip""#);
        assert_eq!(TestOutcome::Fail.to_string(), "FAIL");
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Failure.as_i32(), 1);
        assert_eq!(ExitCode::from_i32(1), Some(ExitCode::Failure));
        assert_eq!(ExitCode::from_i32(2), None);
        assert!(ExitCode::default().is_success());
    }
}
