//! A library for running untrusted snippets of code.
//!
//! Crucible takes source code in one of several languages, turns it into a
//! complete program, compiles it when needed, and runs it with stdin, a wall
//! clock deadline and an output cap. It can also judge one program against a
//! list of input/expected-output test cases.
//!
//! # Features
//!
//! - **Multi-language**: JavaScript, Python, Java, C++, C, Go, Rust, PHP and Ruby.
//! - **Snippet wrapping**: bare statements get a minimal entry point.
//! - **Isolated workspaces**: every attempt runs in its own directory, removed afterwards.
//! - **Measurement**: wall clock time and peak memory per execution.
//! - **Test harness**: ordered per-case verdicts plus an aggregate summary.
//! - **TOML configuration**: limits, workspace root and case parallelism.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG};
pub use language::{LanguageInfo, LanguageProfile, LanguageRegistry, UnknownLanguage};
pub use runner::{ExecError, Executor, RequestError, TestHarness, outputs_match};
pub use types::{
    ExecutionLimits, ExecutionOutcome, ExecutionRequest, OutcomeStatus, TestCase, TestCaseResult,
    TestRun, TestRunSummary,
};
pub use workspace::{Workspace, WorkspaceError, WorkspaceManager};

pub mod config;
pub mod language;
pub mod metrics;
pub mod process;
pub mod runner;
pub mod types;
pub mod workspace;
