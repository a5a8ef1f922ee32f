use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied to every execution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Wall clock budget for the whole build-and-run pipeline, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Maximum bytes captured per output stream (stdout and stderr separately)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl ExecutionLimits {
    /// 1 kibibyte in bytes
    pub const KIB: usize = 1024;
    /// 1 mebibyte in bytes
    pub const MIB: usize = 1024 * 1024;
    /// Longest budget a deadline can be computed for
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Create limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wall clock budget in seconds
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Set the per-stream output cap in bytes
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// The wall clock budget as a [`Duration`]
    ///
    /// Negative or NaN budgets count as zero; budgets too large to represent
    /// saturate at [`ExecutionLimits::MAX_TIMEOUT`].
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0))
            .map_or(Self::MAX_TIMEOUT, |timeout| timeout.min(Self::MAX_TIMEOUT))
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_max_output_bytes() -> usize {
    ExecutionLimits::MIB
}

/// A single ad-hoc execution request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Raw source code as submitted
    #[serde(default)]
    pub code: String,

    /// Language identifier (e.g. "cpp", "py")
    #[serde(default)]
    pub language: String,

    /// Text fed to the program's standard input, if any
    #[serde(default, alias = "input")]
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Classification of an execution outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Program ran and exited with code 0
    Success,

    /// The build step rejected the source
    CompileError,

    /// Program exited non-zero or was killed by a signal
    RuntimeError,

    /// Wall clock budget exceeded
    Timeout,

    /// A captured stream exceeded the output cap
    OutputLimitExceeded,

    /// The compiler or interpreter binary is not installed on the host
    ToolchainMissing,
}

impl OutcomeStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success)
    }
}

/// Result of one execution attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,

    pub status: OutcomeStatus,

    /// Human-readable summary or diagnostic
    pub message: String,

    /// Captured standard output (empty on failure)
    #[serde(rename = "output")]
    pub stdout: String,

    /// Captured standard error or compiler diagnostic
    #[serde(rename = "error")]
    pub stderr: String,

    /// Exit code of the last step that ran, if it exited normally
    #[serde(default)]
    pub exit_code: Option<i32>,

    /// Elapsed wall clock time in milliseconds
    pub execution_time_ms: u64,

    /// Peak memory indicator in kilobytes
    pub memory_kb: u64,

    /// Registry identifier of the language
    #[serde(default)]
    pub language: String,
}

impl ExecutionOutcome {
    /// Build a failed outcome. Stdout is always empty on failure.
    pub fn failure(
        status: OutcomeStatus,
        message: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            status,
            message: message.into(),
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: None,
            execution_time_ms: 0,
            memory_kb: 0,
            language: String::new(),
        }
    }
}

/// One input/expected-output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    #[serde(alias = "output")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Result of running one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub input: String,
    pub expected_output: String,

    /// Program output with leading/trailing whitespace trimmed
    pub actual_output: String,

    pub passed: bool,

    pub execution_time_ms: u64,

    pub memory_kb: u64,

    /// True when the program failed to execute, as opposed to answering wrong
    pub error: bool,

    pub status: OutcomeStatus,

    pub message: String,
}

/// Aggregate over a set of test case results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_time_ms: u64,
    pub max_memory_kb: u64,
}

impl TestRunSummary {
    /// Summarise results in order
    pub fn from_results(results: &[TestCaseResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            total_time_ms: results.iter().map(|r| r.execution_time_ms).sum(),
            max_memory_kb: results.iter().map(|r| r.memory_kb).max().unwrap_or(0),
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Ordered results of a harness run and their summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    pub results: Vec<TestCaseResult>,
    pub summary: TestRunSummary,
}

impl TestRun {
    pub fn new(results: Vec<TestCaseResult>) -> Self {
        let summary = TestRunSummary::from_results(&results);
        Self { results, summary }
    }
}
