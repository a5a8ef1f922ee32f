//! Configuration file loading for Crucible
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.limits.timeout_secs.is_finite() && self.limits.timeout_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "limits.timeout_secs must be positive, got {}",
                self.limits.timeout_secs
            )));
        }
        if self.limits.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_output_bytes must be non-zero".to_owned(),
            ));
        }
        if self.max_parallel_cases == 0 {
            return Err(ConfigError::Invalid(
                "max_parallel_cases must be at least 1".to_owned(),
            ));
        }
        if self.workspace_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("workspace_root is empty".to_owned()));
        }
        Ok(())
    }
}
