//! Code runner for Crucible
//!
//! Provides the single-run executor and the batch test harness.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

pub use crate::runner::execute::SUCCESS_MESSAGE;
pub use crate::runner::harness::{TestHarness, judge, outputs_match};

mod execute;
mod harness;

use crate::{
    config::Config,
    language::{LanguageProfile, LanguageRegistry, UnknownLanguage},
    metrics::{DefaultProbe, MemoryProbe},
    process::StepError,
    types::{ExecutionOutcome, ExecutionRequest},
    workspace::{WorkspaceError, WorkspaceManager},
};

/// Name of the stdin redirection file inside a workspace
pub const STDIN_FILE: &str = "input.txt";

/// Request-shape violations, rejected before anything runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("code is required")]
    MissingCode,

    #[error("language is required")]
    MissingLanguage,

    #[error(transparent)]
    UnsupportedLanguage(#[from] UnknownLanguage),
}

/// Errors that escape the executor
///
/// Compile errors, crashes, timeouts and missing toolchains are reported as
/// [`ExecutionOutcome`] data instead.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("process error: {0}")]
    Process(#[from] StepError),
}

impl ExecError {
    /// HTTP status an API layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ExecError::Request(_) => 400,
            ExecError::Workspace(_) | ExecError::Process(_) => 500,
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, ExecError::Request(_))
    }
}

/// Runs one piece of code once
#[derive(Debug, Clone)]
pub struct Executor {
    config: Config,
    registry: &'static LanguageRegistry,
    workspaces: WorkspaceManager,
    probe: Arc<dyn MemoryProbe>,
}

impl Executor {
    /// Create a new executor with the given configuration
    pub fn new(config: Config) -> Self {
        let workspaces = WorkspaceManager::new(&config.workspace_root);
        Self {
            config,
            registry: LanguageRegistry::builtin(),
            workspaces,
            probe: Arc::new(DefaultProbe::default()),
        }
    }

    /// Create a new executor with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Replace the memory probe
    pub fn with_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &'static LanguageRegistry {
        self.registry
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Check that code and language are present and the language is known
    ///
    /// Only empty code is rejected; whitespace-only code is a valid program.
    pub fn validate(&self, code: &str, language: &str) -> Result<&'static LanguageProfile, RequestError> {
        if code.is_empty() {
            return Err(RequestError::MissingCode);
        }
        if language.trim().is_empty() {
            return Err(RequestError::MissingLanguage);
        }
        Ok(self.registry.resolve(language)?)
    }

    /// Run the request's code once
    #[instrument(skip(self, request), fields(language = %request.language))]
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecError> {
        let profile = self.validate(&request.code, &request.language)?;
        self.execute_profile(profile, &request.code, request.stdin.as_deref())
            .await
    }

    /// Run already-validated code for a resolved profile
    pub(crate) async fn execute_profile(
        &self,
        profile: &'static LanguageProfile,
        code: &str,
        stdin: Option<&str>,
    ) -> Result<ExecutionOutcome, ExecError> {
        execute::execute(
            &self.workspaces,
            &self.config.limits,
            self.probe.as_ref(),
            profile,
            code,
            stdin,
        )
        .await
    }
}
