use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::types::ExecutionLimits;

mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../crucible.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Crucible
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory under which per-attempt workspaces are created.
    ///
    /// Defaults to `crucible` inside the system temp directory.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// How many test cases of one run may execute concurrently
    #[serde(default = "default_max_parallel_cases")]
    pub max_parallel_cases: usize,

    /// Limits applied to every execution attempt
    #[serde(default)]
    pub limits: ExecutionLimits,
}

impl Config {
    /// Create a new config from the embedded example
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with built-in values only, ignoring the embedded example
    pub fn builtin() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            max_parallel_cases: default_max_parallel_cases(),
            limits: ExecutionLimits::default(),
        }
    }

    /// Use a different workspace root
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Replace the execution limits
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the test case concurrency
    pub fn with_max_parallel_cases(mut self, count: usize) -> Self {
        self.max_parallel_cases = count;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).unwrap_or_else(|_| Self::builtin())
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("crucible")
}

fn default_max_parallel_cases() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_builtin_values() {
        let config = Config::default();
        let builtin = Config::builtin();
        assert_eq!(config.workspace_root, builtin.workspace_root);
        assert_eq!(config.max_parallel_cases, 1);
        assert_eq!(config.limits, ExecutionLimits::default());
    }

    #[test]
    fn workspace_root_defaults_to_temp_dir() {
        let config = Config::builtin();
        assert!(config.workspace_root.starts_with(std::env::temp_dir()));
        assert!(config.workspace_root.ends_with("crucible"));
    }

    #[test]
    fn builder_methods() {
        let config = Config::builtin()
            .with_workspace_root("/var/tmp/runs")
            .with_max_parallel_cases(4)
            .with_limits(ExecutionLimits::new().with_timeout_secs(2.0));
        assert_eq!(config.workspace_root, PathBuf::from("/var/tmp/runs"));
        assert_eq!(config.max_parallel_cases, 4);
        assert_eq!(config.limits.timeout_secs, 2.0);
    }
}
