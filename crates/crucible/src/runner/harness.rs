//! Batch test harness
//!
//! Runs one piece of code against a list of input/expected-output cases.

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, instrument};

use crate::language::LanguageProfile;
use crate::runner::{ExecError, Executor};
use crate::types::{ExecutionOutcome, TestCase, TestCaseResult, TestRun};

/// Judges code against test cases through an [`Executor`]
#[derive(Debug, Clone)]
pub struct TestHarness {
    executor: Executor,
}

impl TestHarness {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run `code` once per case and judge each output
    ///
    /// The request is validated once up front. Every case gets its own
    /// workspace, and results come back in the order of `cases`. Cases run
    /// up to `max_parallel_cases` at a time.
    #[instrument(skip(self, code, cases), fields(cases = cases.len()))]
    pub async fn run_all(
        &self,
        code: &str,
        language: &str,
        cases: &[TestCase],
    ) -> Result<TestRun, ExecError> {
        let profile = self.executor.validate(code, language)?;
        let parallel = self.executor.config().max_parallel_cases.max(1);

        let results: Vec<TestCaseResult> = stream::iter(cases)
            .map(|case| self.run_case(profile, code, case))
            .buffered(parallel)
            .try_collect()
            .await?;

        let run = TestRun::new(results);
        debug!(
            passed = run.summary.passed,
            failed = run.summary.failed,
            "test run complete"
        );
        Ok(run)
    }

    async fn run_case(
        &self,
        profile: &'static LanguageProfile,
        code: &str,
        case: &TestCase,
    ) -> Result<TestCaseResult, ExecError> {
        let outcome = self
            .executor
            .execute_profile(profile, code, Some(&case.input))
            .await?;
        Ok(judge(case, outcome))
    }
}

/// Compare program output with the expected output
///
/// Leading and trailing whitespace is ignored on both sides; everything in
/// between must match exactly.
pub fn outputs_match(expected: &str, actual: &str) -> bool {
    expected.trim() == actual.trim()
}

/// Turn the outcome of one case into a judged result
///
/// The recorded actual output is trimmed the same way it is compared.
pub fn judge(case: &TestCase, outcome: ExecutionOutcome) -> TestCaseResult {
    let passed = outcome.success && outputs_match(&case.expected_output, &outcome.stdout);
    TestCaseResult {
        input: case.input.clone(),
        expected_output: case.expected_output.clone(),
        actual_output: outcome.stdout.trim().to_owned(),
        passed,
        execution_time_ms: outcome.execution_time_ms,
        memory_kb: outcome.memory_kb,
        error: !outcome.success,
        status: outcome.status,
        message: outcome.message,
    }
}
