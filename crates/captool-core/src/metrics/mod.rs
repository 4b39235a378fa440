//! Caption evaluation metrics backed by external scorers.
//!
//! - [`Spice`]: SPICE via the scene-graph scorer jar
//! - [`score`]: score records, NaN coercion and aggregation
//! - [`runner`]: the subprocess seam the scorers run through

pub mod runner;
pub mod score;
pub mod spice;

use async_trait::async_trait;

use crate::error::MetricResult;

pub use runner::{ProcessRunner, ToolInvocation, ToolRunner};
pub use score::{float_convert, nan_mean, MetricOutput, MetricScores, SampleScores};
pub use spice::{Spice, SPICE_METHOD};

/// A captioning metric computed over one aligned batch.
#[async_trait]
pub trait CaptionMetric: Send + Sync {
    /// Fixed name identifying the metric.
    fn method(&self) -> &'static str;

    /// Score `candidates[i]` against `references[i]` for every sample.
    async fn compute_score(
        &self,
        candidates: &[Vec<String>],
        references: &[Vec<String>],
    ) -> MetricResult<MetricOutput>;
}
