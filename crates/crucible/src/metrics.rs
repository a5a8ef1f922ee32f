//! Timing and memory measurement
//!
//! Memory figures are resource-usage indicators, not exact accounting. The
//! per-process reading comes from procfs where available. Otherwise the
//! rusage high-water mark of reaped children is used, but only when it grew
//! while the step ran; under concurrent executions that growth can still
//! belong to a sibling.

use std::fmt::Debug;
use std::time::{Duration, Instant};

/// How often a running process is sampled
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Source of memory readings, in kilobytes
pub trait MemoryProbe: Debug + Send + Sync {
    /// Peak resident memory of a live process
    fn sample(&self, pid: u32) -> Option<u64>;

    /// Reading used when no per-process sample could be taken
    fn fallback(&self) -> Option<u64> {
        None
    }
}

/// Reads `VmHWM` from `/proc/<pid>/status` (Linux)
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsProbe;

impl ProcfsProbe {
    /// Extract the resident high-water mark from a status file
    pub fn parse_status(content: &str) -> Option<u64> {
        content
            .lines()
            .find_map(|line| line.strip_prefix("VmHWM:"))
            .and_then(|value| value.split_whitespace().next())
            .and_then(|kb| kb.parse().ok())
    }
}

impl MemoryProbe for ProcfsProbe {
    fn sample(&self, pid: u32) -> Option<u64> {
        let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        Self::parse_status(&status)
    }
}

/// `getrusage(RUSAGE_CHILDREN)` maximum resident set size
#[derive(Debug, Clone, Copy, Default)]
pub struct RusageProbe;

impl RusageProbe {
    #[cfg(unix)]
    fn children_max_rss() -> Option<u64> {
        let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
        // SAFETY: getrusage only writes into the provided struct.
        let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, usage.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        // SAFETY: rc == 0 means the struct was filled in.
        let max_rss = unsafe { usage.assume_init() }.ru_maxrss;
        let max_rss = u64::try_from(max_rss).ok()?;

        // macOS reports bytes, everyone else kilobytes
        if cfg!(target_os = "macos") {
            Some(max_rss / 1024)
        } else {
            Some(max_rss)
        }
    }

    #[cfg(not(unix))]
    fn children_max_rss() -> Option<u64> {
        None
    }
}

impl MemoryProbe for RusageProbe {
    fn sample(&self, _pid: u32) -> Option<u64> {
        None
    }

    fn fallback(&self) -> Option<u64> {
        Self::children_max_rss()
    }
}

/// procfs samples while running, rusage when no sample was taken
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProbe {
    procfs: ProcfsProbe,
    rusage: RusageProbe,
}

impl MemoryProbe for DefaultProbe {
    fn sample(&self, pid: u32) -> Option<u64> {
        self.procfs.sample(pid)
    }

    fn fallback(&self) -> Option<u64> {
        self.rusage.fallback()
    }
}

/// Largest reading seen across samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakMemory(Option<u64>);

impl PeakMemory {
    pub fn record(&mut self, sample: Option<u64>) {
        if let Some(kb) = sample {
            self.0 = Some(self.0.map_or(kb, |peak| peak.max(kb)));
        }
    }

    /// Credit a fallback reading to this step if it grew while the step ran
    ///
    /// Ignored once a per-process sample exists. A reading that did not grow
    /// belongs to an earlier child, such as a compiler.
    pub fn record_growth(&mut self, before: Option<u64>, after: Option<u64>) {
        if self.0.is_some() {
            return;
        }
        if let Some(after) = after
            && before.is_none_or(|before| after > before)
        {
            self.0 = Some(after);
        }
    }

    pub fn get(&self) -> Option<u64> {
        self.0
    }

    /// Final figure in kilobytes, 0 when nothing could be measured
    pub fn kilobytes(&self) -> u64 {
        self.0.unwrap_or(0)
    }
}

/// Monotonic wall clock timer
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
