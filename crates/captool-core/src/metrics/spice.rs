//! SPICE metric via the external scene-graph scorer.
//!
//! Each call writes the batch to a JSON file in the shared temp directory,
//! runs the scorer jar once over it, and reads per-sample scores back from
//! the scorer's output file:
//!
//! ```text
//! batch -> in.json -> java -jar spice.jar -> out.json -> scores (by image_id)
//! ```
//!
//! Every instance owns a private cache directory that the scorer uses for its
//! parse cache. It is removed by [`Spice::close`] or, best-effort, on drop.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::{TempDir, TempPath};

use crate::config::SpiceConfig;
use crate::error::{MetricError, MetricResult};

use super::runner::{ProcessRunner, ToolInvocation, ToolRunner};
use super::score::{aggregate_value, convert_sample, nan_mean, MetricOutput, SampleScores};
use super::CaptionMetric;

/// Name reported by [`Spice::method`].
pub const SPICE_METHOD: &str = "SPICE";

/// One sample as the scorer expects it.
#[derive(Debug, Serialize)]
struct SpiceInput<'a> {
    image_id: usize,
    tests: &'a [String],
    refs: &'a [String],
}

/// One sample as the scorer reports it.
#[derive(Debug, Deserialize)]
struct SpiceResult {
    image_id: usize,
    scores: BTreeMap<String, BTreeMap<String, Value>>,
}

/// SPICE scorer bound to one private cache directory.
pub struct Spice {
    config: SpiceConfig,
    runner: Box<dyn ToolRunner>,
    cache_path: PathBuf,
    cache_dir: Option<TempDir>,
}

impl Spice {
    /// Create a scorer that launches the real scorer process.
    pub fn new(config: SpiceConfig) -> MetricResult<Self> {
        Self::with_runner(config, Box::new(ProcessRunner))
    }

    /// Create a scorer with a custom tool runner.
    ///
    /// Validates the settings, then eagerly creates the private cache
    /// directory under the configured cache root, with a random suffix so
    /// concurrent instances never share.
    pub fn with_runner(config: SpiceConfig, runner: Box<dyn ToolRunner>) -> MetricResult<Self> {
        config.validate()?;
        let cache_root = config.cache_root();
        std::fs::create_dir_all(&cache_root).map_err(|source| MetricError::CacheDir {
            path: cache_root.clone(),
            source,
        })?;
        let cache_dir = tempfile::Builder::new()
            .prefix("spice-")
            .tempdir_in(&cache_root)
            .map_err(|source| MetricError::CacheDir {
                path: cache_root.clone(),
                source,
            })?;
        let cache_path = cache_dir.path().to_path_buf();
        tracing::debug!("SPICE cache directory: {:?}", cache_path);

        Ok(Self {
            config,
            runner,
            cache_path,
            cache_dir: Some(cache_dir),
        })
    }

    /// The private cache directory passed to the scorer.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_path
    }

    /// Release the scorer, removing its cache directory.
    ///
    /// Unlike dropping, this reports a failure to remove the directory.
    pub fn close(mut self) -> MetricResult<()> {
        match self.cache_dir.take() {
            Some(dir) => dir.close().map_err(|source| MetricError::CacheDir {
                path: self.cache_path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }

    /// Score a batch of candidate captions against their references.
    ///
    /// `candidates[i]` and `references[i]` belong to the same image. Both
    /// slices must have the same length and every entry must hold at least
    /// one caption; violations are rejected before anything is written.
    pub async fn compute_score(
        &self,
        candidates: &[Vec<String>],
        references: &[Vec<String>],
    ) -> MetricResult<MetricOutput> {
        let batch = build_batch(candidates, references)?;

        let temp_dir = self.config.temp_dir();
        std::fs::create_dir_all(&temp_dir).map_err(|source| MetricError::Io {
            path: temp_dir.clone(),
            source,
        })?;

        let input = write_input(&temp_dir, &batch)?;
        let output = tempfile::Builder::new()
            .prefix("spice-out-")
            .suffix(".json")
            .tempfile_in(&temp_dir)
            .map_err(|source| MetricError::Io {
                path: temp_dir.clone(),
                source,
            })?
            .into_temp_path();

        let invocation = self.invocation(&input, &output);
        tracing::debug!("Running {}", invocation.command_line());

        let status = self.runner.run(&invocation).await?;
        if !status.success() {
            return Err(MetricError::ToolFailed {
                program: invocation.program,
                status,
            });
        }

        let results = read_results(&output)?;
        let per_sample = align_results(batch.len(), results, &output)?;
        let average = nan_mean(per_sample.iter().map(aggregate_value));

        close_temp(input)?;
        close_temp(output)?;

        tracing::debug!(
            "SPICE scored {} samples, average {:.4}",
            per_sample.len(),
            average
        );
        Ok(MetricOutput {
            average,
            per_sample,
        })
    }

    /// Fixed name of the metric.
    pub fn method(&self) -> &'static str {
        SPICE_METHOD
    }

    fn invocation(&self, input: &Path, output: &Path) -> ToolInvocation {
        let mut args: Vec<OsString> = vec![
            "-jar".into(),
            self.config.heap.clone().into(),
            self.config.jar_path().into(),
            input.into(),
            "-cache".into(),
            self.cache_path.clone().into(),
            "-out".into(),
            output.into(),
        ];
        if self.config.subset {
            args.push("-subset".into());
        }
        if self.config.silent {
            args.push("-silent".into());
        }

        ToolInvocation {
            program: self.config.java_bin.clone(),
            args,
            working_dir: self.config.install_dir(),
            timeout: (self.config.timeout_ms > 0)
                .then(|| Duration::from_millis(self.config.timeout_ms)),
        }
    }
}

impl Drop for Spice {
    fn drop(&mut self) {
        if let Some(dir) = self.cache_dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(
                    "Failed to remove SPICE cache directory {:?}: {}",
                    self.cache_path,
                    e
                );
            }
        }
    }
}

#[async_trait]
impl CaptionMetric for Spice {
    fn method(&self) -> &'static str {
        SPICE_METHOD
    }

    async fn compute_score(
        &self,
        candidates: &[Vec<String>],
        references: &[Vec<String>],
    ) -> MetricResult<MetricOutput> {
        Spice::compute_score(self, candidates, references).await
    }
}

/// Check batch shape and pair each sample with its positional id.
fn build_batch<'a>(
    candidates: &'a [Vec<String>],
    references: &'a [Vec<String>],
) -> MetricResult<Vec<SpiceInput<'a>>> {
    if candidates.len() != references.len() {
        return Err(MetricError::InvalidBatch(format!(
            "{} candidate samples but {} reference samples",
            candidates.len(),
            references.len()
        )));
    }

    candidates
        .iter()
        .zip(references)
        .enumerate()
        .map(|(image_id, (tests, refs))| {
            if tests.is_empty() {
                return Err(MetricError::InvalidBatch(format!(
                    "sample {image_id} has no candidate captions"
                )));
            }
            if refs.is_empty() {
                return Err(MetricError::InvalidBatch(format!(
                    "sample {image_id} has no reference captions"
                )));
            }
            Ok(SpiceInput {
                image_id,
                tests,
                refs,
            })
        })
        .collect()
}

fn write_input(temp_dir: &Path, batch: &[SpiceInput<'_>]) -> MetricResult<TempPath> {
    let io_err = |source: std::io::Error| MetricError::Io {
        path: temp_dir.to_path_buf(),
        source,
    };

    let mut file = tempfile::Builder::new()
        .prefix("spice-in-")
        .suffix(".json")
        .tempfile_in(temp_dir)
        .map_err(io_err)?;

    {
        let mut writer = BufWriter::new(file.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, batch)?;
        writer.flush().map_err(io_err)?;
    }

    Ok(file.into_temp_path())
}

fn read_results(path: &Path) -> MetricResult<Vec<SpiceResult>> {
    let content = std::fs::read_to_string(path).map_err(|source| MetricError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| MetricError::MalformedOutput {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Re-associate scorer results with the input order by `image_id`.
fn align_results(
    expected: usize,
    results: Vec<SpiceResult>,
    path: &Path,
) -> MetricResult<Vec<SampleScores>> {
    let malformed = |message: String| MetricError::MalformedOutput {
        path: path.to_path_buf(),
        message,
    };

    let mut by_id: HashMap<usize, SampleScores> = HashMap::with_capacity(results.len());
    for result in results {
        if result.image_id >= expected {
            return Err(malformed(format!(
                "unexpected image_id {} (batch has {} samples)",
                result.image_id, expected
            )));
        }
        if by_id
            .insert(result.image_id, convert_sample(&result.scores))
            .is_some()
        {
            return Err(malformed(format!("duplicate image_id {}", result.image_id)));
        }
    }

    (0..expected)
        .map(|id| {
            by_id
                .remove(&id)
                .ok_or_else(|| malformed(format!("missing scores for image_id {id}")))
        })
        .collect()
}

fn close_temp(path: TempPath) -> MetricResult<()> {
    let display = path.to_path_buf();
    path.close().map_err(|source| MetricError::Io {
        path: display,
        source,
    })
}
