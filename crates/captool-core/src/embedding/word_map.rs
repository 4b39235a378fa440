//! Word-to-row mapping for embedding tables.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Maps each vocabulary word to its row in the embedding table.
///
/// Indices are dense: a map with `n` words uses exactly the rows `0..n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordMap {
    words: HashMap<String, usize>,
}

impl WordMap {
    /// Build a word map, rejecting duplicate or out-of-range indices.
    pub fn new(words: HashMap<String, usize>) -> EmbeddingResult<Self> {
        let mut seen = vec![false; words.len()];
        for (word, &index) in &words {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(EmbeddingError::WordMap(format!(
                        "index {index} of {word:?} is used by more than one word"
                    )))
                }
                None => {
                    return Err(EmbeddingError::WordMap(format!(
                        "index {index} of {word:?} is out of range for {} words",
                        words.len()
                    )))
                }
            }
        }
        Ok(Self { words })
    }

    /// Load a word map from a JSON object file (`{"word": index, ...}`).
    pub fn from_json_file(path: &Path) -> EmbeddingResult<Self> {
        let file = File::open(path).map_err(|source| EmbeddingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let words: HashMap<String, usize> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| EmbeddingError::WordMap(format!("{}: {}", path.display(), e)))?;
        Self::new(words)
    }

    /// Row index for a word.
    pub fn get(&self, word: &str) -> Option<usize> {
        self.words.get(word).copied()
    }

    /// Number of words (and table rows).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the map holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// BLAKE3 digest of the sorted word/index pairs.
    ///
    /// Stored in the cache header so a table built for another vocabulary can
    /// be detected.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut pairs: Vec<(&str, usize)> =
            self.words.iter().map(|(w, &i)| (w.as_str(), i)).collect();
        pairs.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        for (word, index) in pairs {
            hasher.update(word.as_bytes());
            hasher.update(&[0]);
            hasher.update(&(index as u64).to_le_bytes());
        }
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(w, i)| (w.to_string(), *i)).collect()
    }

    #[test]
    fn test_dense_map_accepted() {
        let words = WordMap::new(map(&[("<pad>", 0), ("dog", 1), ("cat", 2)])).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words.get("cat"), Some(2));
        assert_eq!(words.get("bird"), None);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let err = WordMap::new(map(&[("dog", 0), ("cat", 5)])).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = WordMap::new(map(&[("dog", 1), ("cat", 1)])).unwrap_err();
        assert!(matches!(err, EmbeddingError::WordMap(_)));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = WordMap::new(map(&[("dog", 0), ("cat", 1)])).unwrap();
        let b = WordMap::new(map(&[("cat", 1), ("dog", 0)])).unwrap();
        let swapped = WordMap::new(map(&[("dog", 1), ("cat", 0)])).unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), swapped.fingerprint());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WORDMAP.json");
        std::fs::write(&path, r#"{"<start>": 0, "a": 1, "dog": 2}"#).unwrap();

        let words = WordMap::from_json_file(&path).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words.get("dog"), Some(2));
    }

    #[test]
    fn test_from_json_file_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WORDMAP.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = WordMap::from_json_file(&path).unwrap_err();
        assert!(matches!(err, EmbeddingError::WordMap(_)));
    }
}
