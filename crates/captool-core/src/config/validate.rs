//! Configuration validation.

use crate::error::ConfigError;

use super::{Config, SpiceConfig};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.spice.validate()?;
        if self.logging.format != "pretty" && self.logging.format != "json" {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}

impl SpiceConfig {
    /// Validate the scorer settings.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.java_bin.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "spice.java_bin must not be empty".into(),
            ));
        }
        if self.jar.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "spice.jar must not be empty".into(),
            ));
        }
        if !self.heap.starts_with("-Xmx") || self.heap.len() <= 4 {
            return Err(ConfigError::ValidationError(format!(
                "spice.heap must look like -Xmx8G, got {:?}",
                self.heap
            )));
        }
        Ok(())
    }
}
