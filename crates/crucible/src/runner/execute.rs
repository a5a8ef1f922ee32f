//! Single execution pipeline
//!
//! Wrap, lay out, build, run and classify one piece of code inside a fresh
//! workspace. The workspace is released on every path out of [`execute`].

use std::path::Path;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::language::{Command, LanguageProfile};
use crate::metrics::{MemoryProbe, PeakMemory, Stopwatch};
use crate::process::{Step, StepError, StepOutput, Termination, run_step};
use crate::runner::{ExecError, STDIN_FILE};
use crate::types::{ExecutionLimits, ExecutionOutcome, OutcomeStatus};
use crate::workspace::{Workspace, WorkspaceManager};

/// Message attached to a successful run
pub const SUCCESS_MESSAGE: &str = "Code executed successfully";

#[instrument(skip(workspaces, limits, probe, profile, code, stdin), fields(language = profile.id))]
pub(crate) async fn execute(
    workspaces: &WorkspaceManager,
    limits: &ExecutionLimits,
    probe: &dyn MemoryProbe,
    profile: &'static LanguageProfile,
    code: &str,
    stdin: Option<&str>,
) -> Result<ExecutionOutcome, ExecError> {
    let workspace = workspaces.acquire(profile).await?;
    debug!(workspace = workspace.id(), "executing");

    let result = run_in(&workspace, limits, probe, profile, code, stdin).await;

    if let Err(e) = workspace.release().await {
        warn!(error = %e, "failed to release workspace");
    }

    result
}

async fn run_in(
    workspace: &Workspace,
    limits: &ExecutionLimits,
    probe: &dyn MemoryProbe,
    profile: &'static LanguageProfile,
    code: &str,
    stdin: Option<&str>,
) -> Result<ExecutionOutcome, ExecError> {
    let source = profile.wrap(code);
    let layout = profile.layout(workspace.path(), &source);
    workspace
        .write_file(&format!("{}.{}", layout.stem, profile.extension), source.as_bytes())
        .await?;

    let stdin_path = match stdin {
        Some(input) => Some(workspace.write_file(STDIN_FILE, input.as_bytes()).await?),
        None => None,
    };

    let invocation = profile.invocation(&layout);
    let clock = Stopwatch::start();
    // Build and run share one budget
    let deadline = Instant::now() + limits.timeout();

    let pipeline = Pipeline {
        cwd: workspace.path(),
        deadline,
        limits,
        probe,
        profile,
    };

    // Memory is reported for the program only; compiler usage is left out
    if let Some(build) = &invocation.build {
        let output = match pipeline.step(build, None).await? {
            Ok(output) => output,
            Err(missing) => return Ok(pipeline.finish(missing, clock, PeakMemory::default())),
        };
        debug!(memory = ?output.memory.get(), "build step settled");

        if !output.is_success() {
            let outcome = pipeline.build_failed(&output);
            return Ok(pipeline.finish(outcome, clock, PeakMemory::default()));
        }
    }

    let output = match pipeline.step(&invocation.run, stdin_path.as_deref()).await? {
        Ok(output) => output,
        Err(missing) => return Ok(pipeline.finish(missing, clock, PeakMemory::default())),
    };
    let memory = output.memory;

    let outcome = pipeline.classify_run(output);
    Ok(pipeline.finish(outcome, clock, memory))
}

struct Pipeline<'a> {
    cwd: &'a Path,
    deadline: Instant,
    limits: &'a ExecutionLimits,
    probe: &'a dyn MemoryProbe,
    profile: &'static LanguageProfile,
}

impl Pipeline<'_> {
    /// Run one step
    ///
    /// The inner `Err` is a ready-made outcome for a toolchain that is not
    /// installed; other spawn failures escape as infrastructure errors.
    async fn step(
        &self,
        command: &Command,
        stdin: Option<&Path>,
    ) -> Result<Result<StepOutput, ExecutionOutcome>, ExecError> {
        let step = Step {
            command,
            cwd: self.cwd,
            stdin,
            deadline: self.deadline,
            max_output: self.limits.max_output_bytes,
        };

        match run_step(step, self.probe).await {
            Ok(output) => Ok(Ok(output)),
            Err(e) if e.is_not_found() => Ok(Err(self.toolchain_missing(command, &e))),
            Err(e) => Err(e.into()),
        }
    }

    fn toolchain_missing(&self, command: &Command, error: &StepError) -> ExecutionOutcome {
        let toolchain = self.profile.toolchain;
        warn!(program = %command.program_name(), "toolchain not installed");
        ExecutionOutcome::failure(
            OutcomeStatus::ToolchainMissing,
            format!(
                "{} ({}) not found. {}",
                toolchain.label,
                command.program_name(),
                toolchain.hint
            ),
            error.to_string(),
        )
    }

    fn build_failed(&self, output: &StepOutput) -> ExecutionOutcome {
        match output.termination {
            Termination::TimedOut => self.timed_out(),
            Termination::OutputLimitExceeded => self.output_exceeded(),
            Termination::Exited(_) => {
                let diagnostic = diagnostic(&output.stderr, &output.stdout);
                debug!(exit_code = ?output.exit_code(), "build failed");
                let mut outcome = ExecutionOutcome::failure(
                    OutcomeStatus::CompileError,
                    "Compilation failed",
                    diagnostic,
                );
                outcome.exit_code = output.exit_code();
                outcome
            }
        }
    }

    fn classify_run(&self, output: StepOutput) -> ExecutionOutcome {
        match output.termination {
            Termination::TimedOut => self.timed_out(),
            Termination::OutputLimitExceeded => self.output_exceeded(),
            Termination::Exited(status) if status.success() => ExecutionOutcome {
                success: true,
                status: OutcomeStatus::Success,
                message: SUCCESS_MESSAGE.to_owned(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: Some(0),
                execution_time_ms: 0,
                memory_kb: 0,
                language: String::new(),
            },
            Termination::Exited(_) => {
                let message = match (output.exit_code(), output.signal()) {
                    (Some(code), _) => format!("Process exited with code {code}"),
                    (None, Some(signal)) => format!("Process terminated by signal {signal}"),
                    (None, None) => "Process exited abnormally".to_owned(),
                };
                let mut outcome = ExecutionOutcome::failure(
                    OutcomeStatus::RuntimeError,
                    message,
                    String::from_utf8_lossy(&output.stderr),
                );
                outcome.exit_code = output.exit_code();
                outcome
            }
        }
    }

    fn timed_out(&self) -> ExecutionOutcome {
        ExecutionOutcome::failure(
            OutcomeStatus::Timeout,
            format!(
                "Execution timed out after {} seconds",
                self.limits.timeout_secs
            ),
            "",
        )
    }

    fn output_exceeded(&self) -> ExecutionOutcome {
        ExecutionOutcome::failure(
            OutcomeStatus::OutputLimitExceeded,
            format!(
                "Output exceeded the limit of {} bytes",
                self.limits.max_output_bytes
            ),
            "",
        )
    }

    /// Stamp timing, memory and language onto an outcome
    fn finish(&self, mut outcome: ExecutionOutcome, clock: Stopwatch, memory: PeakMemory) -> ExecutionOutcome {
        outcome.execution_time_ms = clock.elapsed_ms();
        outcome.memory_kb = memory.kilobytes();
        outcome.language = self.profile.id.to_owned();
        debug!(
            status = ?outcome.status,
            time_ms = outcome.execution_time_ms,
            memory_kb = outcome.memory_kb,
            "execution finished"
        );
        outcome
    }
}

/// Compiler diagnostic: stderr, followed by stdout when the compiler wrote any
fn diagnostic(stderr: &[u8], stdout: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    match (stderr.is_empty(), stdout.is_empty()) {
        (_, true) => stderr.into_owned(),
        (true, false) => stdout.into_owned(),
        (false, false) => format!("{stderr}\n{stdout}"),
    }
}
