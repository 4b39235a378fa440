//! Error types for captool.
//!
//! Errors are organized by component so callers can tell a scoring failure
//! from an embedding failure, and every variant carries the path or exit
//! status needed to act on it.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Top-level error type for captool operations.
#[derive(Error, Debug)]
pub enum CaptoolError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caption metric errors
    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    /// Embedding loading errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while computing a caption metric through the external scorer.
#[derive(Error, Debug)]
pub enum MetricError {
    /// Scorer settings are unusable
    #[error("Invalid scorer configuration: {0}")]
    Config(#[from] ConfigError),

    /// Candidate/reference batch violates its shape preconditions
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// The scorer process could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The scorer exited unsuccessfully
    #[error("{program} exited with {status}")]
    ToolFailed { program: String, status: ExitStatus },

    /// The scorer did not finish within the configured limit
    #[error("{program} timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },

    /// The scorer's output file does not match the expected layout
    #[error("Malformed scorer output {path}: {message}")]
    MalformedOutput { path: PathBuf, message: String },

    /// Could not create the private cache directory
    #[error("Failed to prepare cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temp file I/O failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the batch failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building or loading an embedding table.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Reading or writing a file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A numeric field in the embedding file could not be parsed
    #[error("Parse error in {path} line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A vocabulary word's vector has the wrong length
    #[error("Dimension mismatch in {path} line {line}: expected {expected}, got {actual}")]
    DimensionMismatch {
        path: PathBuf,
        line: usize,
        expected: usize,
        actual: usize,
    },

    /// The embedding file has no usable first line
    #[error("Embedding file {0} is empty or has no vector fields")]
    Empty(PathBuf),

    /// The word map is unusable (bad indices, unreadable JSON)
    #[error("Invalid word map: {0}")]
    WordMap(String),

    /// The cache artifact is corrupt or truncated
    #[error("Corrupt embedding cache {path}: {message}")]
    Cache { path: PathBuf, message: String },
}

/// Convenience type alias for captool results.
pub type Result<T> = std::result::Result<T, CaptoolError>;

/// Convenience type alias for metric results.
pub type MetricResult<T> = std::result::Result<T, MetricError>;

/// Convenience type alias for embedding results.
pub type EmbeddingResult<T> = std::result::Result<T, EmbeddingError>;
