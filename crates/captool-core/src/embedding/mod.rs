//! Pretrained word embeddings aligned to a caption vocabulary.
//!
//! Turns a GloVe-style text file into an `ndarray` table whose row `i` is the
//! vector of the word with index `i` in the word map. Words missing from the
//! file keep a uniform random initialization. Built tables are cached next to
//! the training outputs so the text file is parsed only once.
//!
//! # Usage
//!
//! ```rust,ignore
//! use captool_core::embedding::{EmbeddingLoader, WordMap};
//! use captool_core::Config;
//!
//! let config = Config::default();
//! let words = WordMap::from_json_file("WORDMAP_coco.json".as_ref())?;
//! let loaded = EmbeddingLoader::new(&config.embedding).load(
//!     "glove.6B.300d.txt".as_ref(),
//!     &words,
//!     &config.embedding_output_dir(),
//!     "coco_5_cap_per_img",
//! )?;
//! assert_eq!(loaded.table.nrows(), words.len());
//! ```

pub mod cache;
pub mod glove;
pub(crate) mod loader;
pub(crate) mod word_map;

pub use loader::{EmbeddingLoader, LoadedEmbeddings, TableSource};
pub use word_map::WordMap;

/// Receives line progress while an embedding file is parsed.
pub trait ProgressSink: Send + Sync {
    /// Parsing begins; `total` lines will be read.
    fn start(&self, total: u64);

    /// `lines` more lines have been read.
    fn advance(&self, lines: u64);

    /// Parsing finished.
    fn finish(&self) {}
}

/// Discards progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}

    fn advance(&self, _lines: u64) {}
}
