//! `marshal test`: run the reference tester and record its verdict

use marshal_workload::{ConfigCatalog, WorkloadConfig};
use tracing::{info, warn};

use super::{CommandHandler, ItemOutcome};
use crate::batch::FatalError;
use crate::command::Command;
use crate::ops::{TestOptions, Tester};
use crate::run::RunContext;
use crate::summary::TestOutcome;

/// `marshal test`: the only handler whose results reach the suite aggregate.
pub struct TestHandler<T> {
    tester: T,
    options: TestOptions,
}

impl<T: Tester> TestHandler<T> {
    pub fn new(tester: T, options: TestOptions) -> Self {
        Self { tester, options }
    }
}

impl<T: Tester> CommandHandler for TestHandler<T> {
    fn command(&self) -> Command {
        Command::Test
    }

    fn handle(
        &mut self,
        ctx: &RunContext,
        config: WorkloadConfig,
        catalog: &ConfigCatalog,
    ) -> Result<ItemOutcome, FatalError> {
        let report = self.tester.test(&config, catalog, &self.options);
        let location = report
            .result_dir
            .as_deref()
            .unwrap_or_else(|| ctx.log_path());
        let detail = report.detail.as_deref().unwrap_or_default();

        match report.outcome {
            TestOutcome::Pass => info!("Test {} PASS: results at {}", config.name, location.display()),
            TestOutcome::Skip => info!("Test {} SKIP: {} (see {})", config.name, detail, location.display()),
            TestOutcome::Fail => warn!("Test {} FAIL: {} (see {})", config.name, detail, location.display()),
        }
        Ok(ItemOutcome::Tested(report.outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, workload};
    use crate::ops::TestReport;
    use serde_json::json;
    use tempfile::TempDir;

    struct FixedTester(TestReport);

    impl Tester for FixedTester {
        fn test(&mut self, _: &WorkloadConfig, _: &ConfigCatalog, _: &TestOptions) -> TestReport {
            self.0.clone()
        }
    }

    #[test]
    fn test_outcome_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let (catalog, config) = workload(dir.path(), json!({}));
        let (_log, ctx) = context(dir.path(), Command::Test);

        for report in [
            TestReport::pass(dir.path().join("out")),
            TestReport::fail(None, "mismatch"),
            TestReport::skip("no testing block"),
        ] {
            let expected = report.outcome;
            let mut handler = TestHandler::new(FixedTester(report), TestOptions::default());
            assert_eq!(
                handler.handle(&ctx, config.clone(), &catalog).unwrap(),
                ItemOutcome::Tested(expected)
            );
        }
    }
}
