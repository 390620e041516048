//! Compressed on-disk persistence of per-level fingerprint sequences.
//!
//! One store file holds the ordered fingerprints of one molecule at one
//! iteration level, postcard-encoded and wrapped in the compression selected
//! by the file extension. Writes are atomic: data lands in a sibling
//! temporary file which is flushed and then renamed over the target, so a
//! concurrent exists-check never observes a half-written level.

use crate::core::models::fingerprint::Fingerprint;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to encode fingerprints: {0}")]
    Encode(#[source] postcard::Error),
    #[error("Failed to decode fingerprints: {0}")]
    Decode(#[source] postcard::Error),
    #[error("Failed to decompress '{path}': {source}", path = path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk form of a fingerprint file, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Raw postcard bytes (`.fps`).
    Plain,
    /// LZ4 block compression (`.fps.lz4`), fastest.
    Lz4,
    /// Gzip at best ratio (`.fps.gz`), smallest; the default.
    #[default]
    Gzip,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Plain => ".fps",
            Self::Lz4 => ".fps.lz4",
            Self::Gzip => ".fps.gz",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            ".fps" => Some(Self::Plain),
            ".fps.lz4" => Some(Self::Lz4),
            ".fps.gz" => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// Maps `(out_dir_base, level, molecule_name)` to the level's output file.
///
/// Layout: `"<out_dir_base><level>/<molecule_name><extension>"`. The level is
/// appended to the directory basename itself, so each iteration level gets
/// its own sibling directory. Injective across `(level, molecule_name)` pairs
/// as long as molecule names are unique within a run.
pub fn output_path(
    out_dir_base: &Path,
    level: usize,
    molecule_name: &str,
    format: OutputFormat,
) -> PathBuf {
    let mut dir = out_dir_base.as_os_str().to_os_string();
    dir.push(level.to_string());
    PathBuf::from(dir).join(format!("{molecule_name}{}", format.extension()))
}

/// Serializes a fingerprint sequence to `path` in the given format.
///
/// The parent directory must already exist. The write goes through a
/// temporary sibling file and a rename, and the file is flushed to disk
/// before the rename, so the target path only ever holds a complete level.
pub fn save(path: &Path, format: OutputFormat, fingerprints: &[Fingerprint]) -> Result<(), StoreError> {
    let encoded = postcard::to_stdvec(fingerprints).map_err(StoreError::Encode)?;

    let payload = match format {
        OutputFormat::Plain => encoded,
        OutputFormat::Lz4 => lz4_flex::compress_prepend_size(&encoded),
        OutputFormat::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(&encoded)?;
            encoder.finish()?
        }
    };

    let tmp_path = tmp_sibling(path);
    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result.map_err(StoreError::Io)
}

/// Reads back a fingerprint sequence written by [`save`].
pub fn load(path: &Path, format: OutputFormat) -> Result<Vec<Fingerprint>, StoreError> {
    let raw = fs::read(path)?;

    let encoded = match format {
        OutputFormat::Plain => raw,
        OutputFormat::Lz4 => {
            lz4_flex::decompress_size_prepended(&raw).map_err(|e| StoreError::Decompress {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?
        }
        OutputFormat::Gzip => {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| StoreError::Decompress {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            out
        }
    };

    postcard::from_bytes(&encoded).map_err(StoreError::Decode)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
