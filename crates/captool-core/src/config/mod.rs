//! Configuration management for captool.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`, so a missing file or a
//! partial file both produce a usable configuration.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for captool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SPICE scorer settings
    pub spice: SpiceConfig,

    /// Pretrained embedding settings
    pub embedding: EmbeddingConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.captool.captool/config.toml
    /// - Linux: ~/.config/captool/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\captool\config\config.toml
    ///
    /// Falls back to ~/.captool/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "captool", "captool")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".captool").join("config.toml")
            })
    }

    /// Get the resolved embedding cache directory (with ~ expansion).
    pub fn embedding_output_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.embedding.output_dir);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

impl SpiceConfig {
    /// Resolved scorer install directory (with ~ expansion).
    pub fn install_dir(&self) -> PathBuf {
        expand_path(&self.install_dir)
    }

    /// Resolved path to the scorer jar.
    pub fn jar_path(&self) -> PathBuf {
        self.install_dir().join(expand_path(Path::new(&self.jar)))
    }

    /// Resolved shared scratch directory.
    pub fn temp_dir(&self) -> PathBuf {
        self.install_dir().join(expand_path(&self.temp_dir))
    }

    /// Resolved root for per-instance cache directories.
    pub fn cache_root(&self) -> PathBuf {
        self.install_dir().join(expand_path(&self.cache_dir))
    }
}

/// Expand a leading `~`. `Path::join` keeps absolute results as-is.
fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.spice.java_bin, "java");
        assert_eq!(config.spice.heap, "-Xmx8G");
        assert!(config.spice.subset);
        assert!(config.spice.silent);
        assert_eq!(config.spice.timeout_ms, 0);
        assert!(config.embedding.validate_cache);
        assert!(config.embedding.seed.is_none());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[spice]"));
        assert!(toml.contains("[embedding]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[spice]\ntimeout_ms = 500\n").unwrap();
        assert_eq!(config.spice.timeout_ms, 500);
        assert_eq!(config.spice.jar, "spice-1.0.jar");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[spice]\nheap = \"8G\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("spice.heap"));
    }

    #[test]
    fn test_spice_paths_resolve_against_install_dir() {
        let spice = SpiceConfig {
            install_dir: PathBuf::from("/opt/spice"),
            ..SpiceConfig::default()
        };
        assert_eq!(spice.jar_path(), PathBuf::from("/opt/spice/spice-1.0.jar"));
        assert_eq!(spice.temp_dir(), PathBuf::from("/opt/spice/tmp"));
        assert_eq!(spice.cache_root(), PathBuf::from("/opt/spice/cache"));
    }

    #[test]
    fn test_absolute_temp_dir_overrides_install_dir() {
        let spice = SpiceConfig {
            install_dir: PathBuf::from("/opt/spice"),
            temp_dir: PathBuf::from("/scratch/spice"),
            ..SpiceConfig::default()
        };
        assert_eq!(spice.temp_dir(), PathBuf::from("/scratch/spice"));
    }
}
