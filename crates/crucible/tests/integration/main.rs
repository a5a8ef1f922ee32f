//! Integration tests for crucible
//!
//! These tests spawn real compilers and interpreters. Python 3 and g++ are
//! expected on the host; tests for other toolchains are `#[ignore]`d.
//! Run with: cargo test -p crucible --features toolchain-tests
//!
//! To include the ignored ones:
//!    cargo test -p crucible --features toolchain-tests -- --include-ignored

#![cfg(feature = "toolchain-tests")]

use std::fs;
use std::path::Path;

use crucible::{Config, Executor, TestHarness};
use tempfile::TempDir;

mod config_loading;
mod execution;
mod harness;
mod languages;
mod workspace_cleanup;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Config whose workspaces live under a private temp dir
pub(crate) fn test_config(root: &Path) -> Config {
    Config::builtin().with_workspace_root(root.join("workspaces"))
}

/// Executor plus the temp dir that owns its workspace root
pub(crate) fn test_executor() -> (TempDir, Executor) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let executor = Executor::new(test_config(tmp.path()));
    (tmp, executor)
}

pub(crate) fn test_harness(max_parallel_cases: usize) -> (TempDir, TestHarness) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(tmp.path()).with_max_parallel_cases(max_parallel_cases);
    (tmp, TestHarness::new(Executor::new(config)))
}

/// Number of workspace directories left behind under an executor's root
pub(crate) fn leftover_workspaces(executor: &Executor) -> usize {
    fs::read_dir(executor.workspaces().root())
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Live processes whose command line contains `needle` (Linux procfs)
pub(crate) fn live_processes(needle: &str) -> usize {
    let Ok(entries) = fs::read_dir("/proc") else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| fs::read(entry.path().join("cmdline")).ok())
        .filter(|cmdline| String::from_utf8_lossy(cmdline).replace('\0', " ").contains(needle))
        .count()
}

/// Poll until no process matches `needle`, for up to about a second
pub(crate) async fn surviving_processes(needle: &str) -> usize {
    for _ in 0..50 {
        if live_processes(needle) == 0 {
            return 0;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    live_processes(needle)
}
