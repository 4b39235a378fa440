//! captool core - utilities for image captioning training and evaluation.
//!
//! Two independent components:
//!
//! - [`metrics::Spice`] scores candidate captions against references by
//!   running the external SPICE scorer over a JSON file contract.
//! - [`embedding::EmbeddingLoader`] builds a vocabulary-aligned table from
//!   pretrained GloVe-style word vectors, with an on-disk cache.
//!
//! # Usage
//!
//! ```rust,ignore
//! use captool_core::{Config, Spice};
//!
//! #[tokio::main]
//! async fn main() -> captool_core::Result<()> {
//!     let config = Config::load()?;
//!     let spice = Spice::new(config.spice.clone())?;
//!
//!     let candidates = vec![vec!["a dog runs on the beach".to_string()]];
//!     let references = vec![vec!["a brown dog running along the shore".to_string()]];
//!     let output = spice.compute_score(&candidates, &references).await?;
//!     println!("SPICE: {:.4}", output.average);
//!
//!     spice.close()?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod embedding;
pub mod error;
pub mod metrics;

// Re-exports for convenient access
pub use config::Config;
pub use embedding::{EmbeddingLoader, LoadedEmbeddings, TableSource, WordMap};
pub use error::{
    CaptoolError, ConfigError, EmbeddingError, EmbeddingResult, MetricError, MetricResult, Result,
};
pub use metrics::{CaptionMetric, MetricOutput, SampleScores, Spice};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_spice_is_a_caption_metric() {
        let root = tempfile::tempdir().unwrap();
        let config = config::SpiceConfig {
            install_dir: root.path().to_path_buf(),
            ..Default::default()
        };
        let metric: Box<dyn CaptionMetric> = Box::new(Spice::new(config).unwrap());
        assert_eq!(metric.method(), "SPICE");

        let err = metric.compute_score(&[], &[vec!["a".into()]]).await.unwrap_err();
        assert!(matches!(err, MetricError::InvalidBatch(_)));
    }
}
