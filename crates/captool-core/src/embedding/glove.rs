//! Plain-text word vector format (GloVe style).
//!
//! One word per line: `<token> <v1> <v2> ... <vD>`, fields separated by single
//! spaces. Empty fragments (doubled or trailing spaces) are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Dimension and line count of an embedding file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileShape {
    /// Vector length, taken from the first line
    pub dim: usize,
    /// Total number of lines, for progress reporting
    pub lines: usize,
}

/// Split a line into its token and parsed vector.
///
/// Returns `Ok(None)` for blank lines. Fails on the first field that is not
/// a float.
pub fn parse_line(line: &str) -> Result<Option<(&str, Vec<f32>)>, String> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut parts = line.split(' ');
    let token = match parts.next() {
        Some(token) if !token.is_empty() => token,
        _ => return Ok(None),
    };

    let vector = parts
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<f32>()
                .map_err(|e| format!("invalid number {field:?} for {token:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some((token, vector)))
}

/// Read the file once to find its dimension and line count.
pub fn scan(path: &Path) -> EmbeddingResult<FileShape> {
    let reader = open(path)?;
    let mut dim = None;
    let mut lines = 0;

    for line in reader.lines() {
        let line = line.map_err(|source| EmbeddingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if dim.is_none() {
            dim = Some(field_count(&line));
        }
        lines += 1;
    }

    match dim {
        Some(dim) if dim > 0 => Ok(FileShape { dim, lines }),
        _ => Err(EmbeddingError::Empty(path.to_path_buf())),
    }
}

/// Open an embedding file for buffered reading.
pub fn open(path: &Path) -> EmbeddingResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| EmbeddingError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Number of vector fields on a line (everything after the token).
fn field_count(line: &str) -> usize {
    line.split(' ')
        .filter(|field| !field.trim().is_empty())
        .count()
        .saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let (token, vector) = parse_line("the 0.418 0.24968 -0.41242\n").unwrap().unwrap();
        assert_eq!(token, "the");
        assert_eq!(vector, vec![0.418, 0.24968, -0.41242]);
    }

    #[test]
    fn test_parse_line_skips_empty_fragments() {
        let (token, vector) = parse_line("dog 1.0  2.0 3.0 \r\n").unwrap().unwrap();
        assert_eq!(token, "dog");
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parse_line_blank() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("\n").unwrap().is_none());
    }

    #[test]
    fn test_parse_line_rejects_bad_number() {
        let err = parse_line("cat 0.1 zero 0.3").unwrap_err();
        assert!(err.contains("zero"));
    }

    #[test]
    fn test_scan_reads_dim_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "a 1 2 3 4\nb 5 6 7 8\nc 9 10 11 12\n").unwrap();

        let shape = scan(&path).unwrap();
        assert_eq!(shape, FileShape { dim: 4, lines: 3 });
    }

    #[test]
    fn test_scan_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "").unwrap();

        assert!(matches!(scan(&path), Err(EmbeddingError::Empty(_))));
    }

    #[test]
    fn test_scan_missing_file() {
        let err = scan(Path::new("/nonexistent/vectors.txt")).unwrap_err();
        assert!(matches!(err, EmbeddingError::Io { .. }));
    }
}
