//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SPICE scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiceConfig {
    /// Java runtime used to launch the scorer
    pub java_bin: String,

    /// Scorer jar, relative to `install_dir` unless absolute
    pub jar: String,

    /// Directory the scorer runs from (holds the jar and its lib/ folder)
    pub install_dir: PathBuf,

    /// JVM heap flag passed before the jar
    pub heap: String,

    /// Shared scratch directory for input/output files.
    /// Relative paths resolve against `install_dir`.
    pub temp_dir: PathBuf,

    /// Root under which each scorer instance creates its private cache.
    /// Relative paths resolve against `install_dir`.
    pub cache_dir: PathBuf,

    /// Only report tuple categories relevant to the given objects
    pub subset: bool,

    /// Suppress the scorer's own console output
    pub silent: bool,

    /// Kill the scorer after this many milliseconds. 0 disables the limit.
    pub timeout_ms: u64,
}

impl Default for SpiceConfig {
    fn default() -> Self {
        Self {
            java_bin: "java".to_string(),
            jar: "spice-1.0.jar".to_string(),
            install_dir: PathBuf::from("~/.captool/spice"),
            heap: "-Xmx8G".to_string(),
            temp_dir: PathBuf::from("tmp"),
            cache_dir: PathBuf::from("cache"),
            subset: true,
            silent: true,
            timeout_ms: 0,
        }
    }
}

/// Pretrained embedding loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Directory where cache artifacts are written
    pub output_dir: String,

    /// Rebuild the cache when it was built for a different word map.
    /// When false, an existing cache is returned as-is.
    pub validate_cache: bool,

    /// Seed for the uniform initialization of unmatched rows
    pub seed: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            output_dir: "~/.captool/embeddings".to_string(),
            validate_cache: true,
            seed: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
