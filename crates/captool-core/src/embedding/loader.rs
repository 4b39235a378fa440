//! Vocabulary-aligned embedding tables from pretrained word vectors.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, EmbeddingResult};

use super::cache;
use super::glove;
use super::word_map::WordMap;
use super::{NoProgress, ProgressSink};

/// Lines between progress updates.
const PROGRESS_STEP: usize = 4096;

/// Where a loaded table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSource {
    /// Read back from an existing cache artifact
    Cache,
    /// Built from the text embedding file (and cached)
    Text,
}

/// An embedding table aligned to a word map.
#[derive(Debug, Clone)]
pub struct LoadedEmbeddings {
    /// `(words, dim)` table; row `i` belongs to the word with index `i`
    pub table: Array2<f32>,
    /// Embedding dimension
    pub dim: usize,
    /// Cache artifact backing this table
    pub cache_path: PathBuf,
    /// Whether the table was read from the cache
    pub source: TableSource,
}

/// Builds embedding tables from text word vectors, caching the result.
pub struct EmbeddingLoader {
    validate_cache: bool,
    seed: Option<u64>,
    progress: Box<dyn ProgressSink>,
}

impl Default for EmbeddingLoader {
    fn default() -> Self {
        Self::new(&EmbeddingConfig::default())
    }
}

impl EmbeddingLoader {
    /// Create a loader from the embedding settings.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            validate_cache: config.validate_cache,
            seed: config.seed,
            progress: Box::new(NoProgress),
        }
    }

    /// Report parsing progress to `progress`.
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Load the table for `word_map` from `emb_file`, using the cache in
    /// `output_dir` when one exists for this file and `output_name`.
    pub fn load(
        &self,
        emb_file: &Path,
        word_map: &WordMap,
        output_dir: &Path,
        output_name: &str,
    ) -> EmbeddingResult<LoadedEmbeddings> {
        let cache_path = cache::cache_path(emb_file, output_dir, output_name)?;
        let fingerprint = word_map.fingerprint();

        if cache_path.is_file() {
            let cached = cache::load(&cache_path)?;
            let matches =
                cached.fingerprint == fingerprint && cached.table.nrows() == word_map.len();
            if matches || !self.validate_cache {
                tracing::info!("Loading embeddings from {:?}", cache_path);
                return Ok(LoadedEmbeddings {
                    table: cached.table,
                    dim: cached.dim,
                    cache_path,
                    source: TableSource::Cache,
                });
            }
            tracing::warn!(
                "Embedding cache {:?} was built for a different word map, rebuilding",
                cache_path
            );
        }

        let table = self.build(emb_file, word_map)?;
        let dim = table.ncols();

        tracing::info!("Saving vectors to {:?}", cache_path);
        cache::save(&cache_path, &table, &fingerprint)?;

        Ok(LoadedEmbeddings {
            table,
            dim,
            cache_path,
            source: TableSource::Text,
        })
    }

    /// Parse `emb_file` into a table for `word_map`, without touching the cache.
    pub fn build(&self, emb_file: &Path, word_map: &WordMap) -> EmbeddingResult<Array2<f32>> {
        let shape = glove::scan(emb_file)?;
        let dim = shape.dim;
        tracing::info!(
            "Loading embeddings from {:?} ({} lines, dim {})",
            emb_file,
            shape.lines,
            dim
        );

        let mut table = self.init_table(word_map.len(), dim);
        // Tokens can repeat in large dumps; count rows, not lines.
        let mut matched = vec![false; word_map.len()];

        self.progress.start(shape.lines as u64);
        let reader = glove::open(emb_file)?;
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|source| EmbeddingError::Io {
                path: emb_file.to_path_buf(),
                source,
            })?;
            if line_no % PROGRESS_STEP == 0 {
                self.progress.advance(PROGRESS_STEP as u64);
            }

            let parsed = glove::parse_line(&line).map_err(|message| EmbeddingError::Parse {
                path: emb_file.to_path_buf(),
                line: line_no,
                message,
            })?;
            let Some((word, vector)) = parsed else {
                continue;
            };
            let Some(row) = word_map.get(word) else {
                continue;
            };

            if vector.len() != dim {
                return Err(EmbeddingError::DimensionMismatch {
                    path: emb_file.to_path_buf(),
                    line: line_no,
                    expected: dim,
                    actual: vector.len(),
                });
            }
            table
                .row_mut(row)
                .iter_mut()
                .zip(vector)
                .for_each(|(dst, v)| *dst = v);
            matched[row] = true;
        }
        self.progress.advance((shape.lines % PROGRESS_STEP) as u64);
        self.progress.finish();

        let found = matched.iter().filter(|m| **m).count();
        tracing::info!(
            "Matched {}/{} vocabulary words ({} keep random init)",
            found,
            word_map.len(),
            word_map.len() - found
        );
        Ok(table)
    }

    /// `(rows, dim)` table drawn uniformly from `[-b, b]`, `b = sqrt(3 / dim)`.
    fn init_table(&self, rows: usize, dim: usize) -> Array2<f32> {
        let bound = (3.0 / dim as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Array2::from_shape_simple_fn((rows, dim), || rng.sample(&dist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    const VECTORS: &str = "the 0.1 0.2 0.3 0.4\ndog 1.0 -1.0 2.5 0.0\ncat 0.5 0.5 0.5 0.5\n";

    fn word_map(pairs: &[(&str, usize)]) -> WordMap {
        WordMap::new(pairs.iter().map(|(w, i)| (w.to_string(), *i)).collect::<HashMap<_, _>>())
            .unwrap()
    }

    fn write_vectors(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("vectors.txt");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn seeded() -> EmbeddingLoader {
        EmbeddingLoader::new(&EmbeddingConfig {
            seed: Some(7),
            ..EmbeddingConfig::default()
        })
    }

    #[test]
    fn test_matched_rows_copied_and_unseen_row_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), VECTORS);
        let words = word_map(&[("dog", 0), ("zebra", 1), ("cat", 2)]);

        let loaded = seeded().load(&emb, &words, dir.path(), "test").unwrap();

        assert_eq!(loaded.source, TableSource::Text);
        assert_eq!(loaded.dim, 4);
        assert_eq!(loaded.table.dim(), (3, 4));
        assert_eq!(loaded.table.row(0).to_vec(), vec![1.0, -1.0, 2.5, 0.0]);
        assert_eq!(loaded.table.row(2).to_vec(), vec![0.5, 0.5, 0.5, 0.5]);

        let bound = (3.0f32 / 4.0).sqrt();
        let unseen = loaded.table.row(1);
        assert!(unseen.iter().all(|v| (-bound..=bound).contains(v)));
        assert!(unseen.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_second_load_comes_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), VECTORS);
        let words = word_map(&[("the", 0), ("zebra", 1)]);
        let loader = EmbeddingLoader::default();

        let first = loader.load(&emb, &words, dir.path(), "run").unwrap();
        std::fs::remove_file(&emb).unwrap();
        let second = loader.load(&emb, &words, dir.path(), "run").unwrap();

        assert_eq!(second.source, TableSource::Cache);
        assert_eq!(second.dim, first.dim);
        let bits = |t: &Array2<f32>| t.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first.table), bits(&second.table));
        assert_eq!(first.cache_path, dir.path().join("vectors.txt_run.emb"));
    }

    #[test]
    fn test_stale_cache_rebuilt_when_validating() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), VECTORS);
        let loader = seeded();

        loader
            .load(&emb, &word_map(&[("the", 0)]), dir.path(), "run")
            .unwrap();
        let rebuilt = loader
            .load(&emb, &word_map(&[("the", 0), ("cat", 1)]), dir.path(), "run")
            .unwrap();

        assert_eq!(rebuilt.source, TableSource::Text);
        assert_eq!(rebuilt.table.nrows(), 2);
        assert_eq!(rebuilt.table.row(1).to_vec(), vec![0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_stale_cache_reused_verbatim_without_validation() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), VECTORS);
        let loader = EmbeddingLoader::new(&EmbeddingConfig {
            validate_cache: false,
            ..EmbeddingConfig::default()
        });

        loader
            .load(&emb, &word_map(&[("the", 0)]), dir.path(), "run")
            .unwrap();
        let reused = loader
            .load(&emb, &word_map(&[("the", 0), ("cat", 1)]), dir.path(), "run")
            .unwrap();

        assert_eq!(reused.source, TableSource::Cache);
        assert_eq!(reused.table.nrows(), 1);
    }

    #[test]
    fn test_seed_makes_init_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), VECTORS);
        let words = word_map(&[("x", 0), ("y", 1)]);

        let a = seeded().build(&emb, &words).unwrap();
        let b = seeded().build(&emb, &words).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_number_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), "the 0.1 0.2\nbad 0.1 oops\n");

        let err = seeded()
            .build(&emb, &word_map(&[("the", 0)]))
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_short_vector_for_vocab_word() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), "the 0.1 0.2 0.3\ndog 0.1 0.2\n");

        let err = seeded()
            .build(&emb, &word_map(&[("dog", 0)]))
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = seeded()
            .load(
                &dir.path().join("absent.txt"),
                &word_map(&[("the", 0)]),
                dir.path(),
                "run",
            )
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Io { .. }));
    }

    #[test]
    fn test_repeated_token_last_vector_wins() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), "dog 1 2\ncat 5 6\ndog 3 4\n");
        let words = word_map(&[("dog", 0), ("bird", 1)]);

        // Install a subscriber so the info! arguments are evaluated.
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .finish();
        let table = tracing::subscriber::with_default(subscriber, || {
            seeded().build(&emb, &words).unwrap()
        });

        assert_eq!(table.row(0).to_vec(), vec![3.0, 4.0]);
    }

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicU64,
        advanced: AtomicU64,
    }

    impl ProgressSink for Arc<CountingProgress> {
        fn start(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn advance(&self, lines: u64) {
            self.advanced.fetch_add(lines, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_progress_covers_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write_vectors(dir.path(), VECTORS);
        let progress = Arc::new(CountingProgress::default());

        seeded()
            .with_progress(Box::new(progress.clone()))
            .build(&emb, &word_map(&[("cat", 0)]))
            .unwrap();

        assert_eq!(progress.total.load(Ordering::SeqCst), 3);
        assert_eq!(progress.advanced.load(Ordering::SeqCst), 3);
    }
}
