//! Child process invocation
//!
//! Spawns one build or run step directly (no shell), enforces a wall clock
//! deadline and an output cap, and samples memory while the process runs.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument};

use crate::language::Command;
use crate::metrics::{MemoryProbe, PeakMemory, SAMPLE_INTERVAL};

/// Errors that prevent a step from producing an output
#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    /// The program binary does not exist on the host
    pub fn is_not_found(&self) -> bool {
        matches!(self, StepError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// One process to run
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub command: &'a Command,
    /// Working directory
    pub cwd: &'a Path,
    /// File redirected into stdin; stdin is null when absent
    pub stdin: Option<&'a Path>,
    /// Absolute point in time at which the process is killed
    pub deadline: Instant,
    /// Cap on each captured stream in bytes
    pub max_output: usize,
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process exited on its own (normally or by signal)
    Exited(ExitStatus),
    /// The deadline passed and the process group was killed
    TimedOut,
    /// A stream exceeded the output cap and the process group was killed
    OutputLimitExceeded,
}

/// Captured result of a step
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub termination: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub memory: PeakMemory,
}

impl StepOutput {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.termination, Termination::Exited(status) if status.success())
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited(status) => status.code(),
            _ => None,
        }
    }

    /// Signal number if the process was killed by a signal
    pub fn signal(&self) -> Option<i32> {
        match self.termination {
            #[cfg(unix)]
            Termination::Exited(status) => std::os::unix::process::ExitStatusExt::signal(&status),
            _ => None,
        }
    }
}

/// Run one step to completion, deadline, or output overflow
#[instrument(skip(step, probe), fields(program = %step.command.program_name()))]
pub async fn run_step(step: Step<'_>, probe: &dyn MemoryProbe) -> Result<StepOutput, StepError> {
    let mut command = tokio::process::Command::new(&step.command.program);
    command
        .args(&step.command.args)
        .current_dir(step.cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match step.stdin {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?.into_std().await;
            command.stdin(file);
        }
        None => {
            command.stdin(Stdio::null());
        }
    }

    // Own process group so the whole tree can be killed at once
    #[cfg(unix)]
    command.process_group(0);

    debug!(args = ?step.command.args, cwd = ?step.cwd, "spawning step");

    let rusage_before = probe.fallback();
    let mut child = command.spawn().map_err(|source| StepError::Spawn {
        program: step.command.program_name(),
        source,
    })?;

    // Kills leftover group members on every exit, including cancellation
    let _group = ProcessGroup::of(&child);

    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut memory = PeakMemory::default();
    // Freshly exec'd, so this reads the program itself and not the spawner
    if let Some(pid) = pid {
        memory.record(probe.sample(pid));
    }

    let settled = tokio::time::timeout_at(
        step.deadline,
        collect(&mut child, stdout, stderr, step.max_output, probe, pid, &mut memory),
    )
    .await;

    let mut output = match settled {
        Ok(Ok(Collected::Exited {
            status,
            stdout,
            stderr,
        })) => StepOutput {
            termination: Termination::Exited(status),
            stdout,
            stderr,
            memory,
        },
        Ok(Ok(Collected::Overflow)) => {
            terminate(&mut child).await;
            StepOutput {
                termination: Termination::OutputLimitExceeded,
                stdout: Vec::new(),
                stderr: Vec::new(),
                memory,
            }
        }
        Ok(Err(e)) => {
            terminate(&mut child).await;
            return Err(StepError::Io(e));
        }
        Err(_) => {
            terminate(&mut child).await;
            StepOutput {
                termination: Termination::TimedOut,
                stdout: Vec::new(),
                stderr: Vec::new(),
                memory,
            }
        }
    };

    output.memory.record_growth(rusage_before, probe.fallback());

    debug!(termination = ?output.termination, memory = ?output.memory.get(), "step settled");
    Ok(output)
}

/// Kill a child and every process in its group, then reap it
///
/// Safe to call on a child that already exited.
pub async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id()
        && let Ok(pgid) = libc::pid_t::try_from(pid)
    {
        // SAFETY: killpg only sends a signal; a stale group id yields ESRCH.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }

    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill after group signal");
    }
}

/// SIGKILLs a child's process group when dropped
///
/// The child leads its own group, so this also reaches grandchildren that
/// `kill_on_drop` alone would leave running.
struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<libc::pid_t>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        #[cfg(unix)]
        {
            Self {
                pgid: child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child;
            Self {}
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            // SAFETY: killpg only sends a signal; an empty group yields ESRCH.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
}

enum Collected {
    Exited {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    Overflow,
}

struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Read at most `cap` bytes, noting whether the stream had more
async fn read_capped<R>(reader: Option<R>, cap: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if let Some(reader) = reader {
        let limit = u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1);
        reader.take(limit).read_to_end(&mut bytes).await?;
    }
    let overflowed = bytes.len() > cap;
    bytes.truncate(cap);
    Ok(Captured { bytes, overflowed })
}

async fn collect(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    cap: usize,
    probe: &dyn MemoryProbe,
    pid: Option<u32>,
    memory: &mut PeakMemory,
) -> std::io::Result<Collected> {
    let stdout_read = read_capped(stdout, cap);
    let stderr_read = read_capped(stderr, cap);
    tokio::pin!(stdout_read, stderr_read);

    let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdout_bytes = None;
    let mut stderr_bytes = None;

    while stdout_bytes.is_none() || stderr_bytes.is_none() {
        tokio::select! {
            captured = &mut stdout_read, if stdout_bytes.is_none() => {
                let captured = captured?;
                if captured.overflowed {
                    return Ok(Collected::Overflow);
                }
                stdout_bytes = Some(captured.bytes);
            }
            captured = &mut stderr_read, if stderr_bytes.is_none() => {
                let captured = captured?;
                if captured.overflowed {
                    return Ok(Collected::Overflow);
                }
                stderr_bytes = Some(captured.bytes);
            }
            _ = ticker.tick() => {
                if let Some(pid) = pid {
                    memory.record(probe.sample(pid));
                }
            }
        }
    }

    let status = loop {
        tokio::select! {
            status = child.wait() => break status?,
            _ = ticker.tick() => {
                if let Some(pid) = pid {
                    memory.record(probe.sample(pid));
                }
            }
        }
    };

    Ok(Collected::Exited {
        status,
        stdout: stdout_bytes.unwrap_or_default(),
        stderr: stderr_bytes.unwrap_or_default(),
    })
}
