//! On-disk cache for built embedding tables.
//!
//! Single little-endian binary file:
//!
//! ```text
//! magic "CAPEMB01" | rows u64 | dim u64 | word map fingerprint [u8; 32] | rows*dim f32
//! ```
//!
//! Writes go to a temp file in the same directory and are renamed into place,
//! so concurrent readers never see a partial table.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Extension of cache artifacts.
pub const CACHE_EXTENSION: &str = "emb";

const MAGIC: &[u8; 8] = b"CAPEMB01";
const HEADER_LEN: usize = 8 + 8 + 8 + 32;

/// A table read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedTable {
    pub table: Array2<f32>,
    pub dim: usize,
    pub fingerprint: [u8; 32],
}

/// Cache path for an embedding file and output name:
/// `<output_dir>/<basename(emb_file)>_<output_name>.emb`.
pub fn cache_path(
    emb_file: &Path,
    output_dir: &Path,
    output_name: &str,
) -> EmbeddingResult<PathBuf> {
    let base = emb_file.file_name().ok_or_else(|| EmbeddingError::Io {
        path: emb_file.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "embedding path has no file name",
        ),
    })?;
    let file_name = format!(
        "{}_{}.{}",
        base.to_string_lossy(),
        output_name,
        CACHE_EXTENSION
    );
    Ok(output_dir.join(file_name))
}

/// Write a table to `path` atomically.
pub fn save(path: &Path, table: &Array2<f32>, fingerprint: &[u8; 32]) -> EmbeddingResult<()> {
    let io_err = |source: std::io::Error| EmbeddingError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut file = tempfile::Builder::new()
        .prefix(".captool-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;

    {
        let (rows, dim) = table.dim();
        let mut writer = BufWriter::new(file.as_file_mut());
        writer.write_all(MAGIC).map_err(io_err)?;
        writer.write_all(&(rows as u64).to_le_bytes()).map_err(io_err)?;
        writer.write_all(&(dim as u64).to_le_bytes()).map_err(io_err)?;
        writer.write_all(fingerprint).map_err(io_err)?;
        for value in table.iter() {
            writer.write_all(&value.to_le_bytes()).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
    }

    file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Read a cached table from `path`.
pub fn load(path: &Path) -> EmbeddingResult<CachedTable> {
    let corrupt = |message: String| EmbeddingError::Cache {
        path: path.to_path_buf(),
        message,
    };

    let bytes = std::fs::read(path).map_err(|source| EmbeddingError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(corrupt("missing header".to_string()));
    }

    let read_u64 = |offset: usize| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[offset..offset + 8]);
        u64::from_le_bytes(buf) as usize
    };
    let rows = read_u64(8);
    let dim = read_u64(16);
    let mut fingerprint = [0u8; 32];
    fingerprint.copy_from_slice(&bytes[24..HEADER_LEN]);

    let expected = rows
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt(format!("implausible shape {rows}x{dim}")))?;
    let data = &bytes[HEADER_LEN..];
    if data.len() != expected {
        return Err(corrupt(format!(
            "expected {} bytes for {}x{} table, got {}",
            expected,
            rows,
            dim,
            data.len()
        )));
    }

    let values: Vec<f32> = data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let table = Array2::from_shape_vec((rows, dim), values).map_err(|e| corrupt(e.to_string()))?;

    Ok(CachedTable {
        table,
        dim,
        fingerprint,
    })
}
