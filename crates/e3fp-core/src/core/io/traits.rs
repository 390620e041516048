use crate::core::models::molecule::Molecule;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Defines the interface for reading a conformer ensemble file.
///
/// An ensemble file holds one molecule together with all of its 3D conformers.
/// Implementors handle the format-specific parsing; the trait provides the
/// path-based convenience entry point used by the batch workflow.
pub trait ConformerEnsembleFile {
    /// The error type for parse and I/O failures.
    type Error: Error + From<io::Error>;

    /// Reads a molecule and its conformers from a buffered reader.
    ///
    /// `name_hint` supplies a molecule name for formats (or files) that do not
    /// carry one themselves; it is typically the input file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead, name_hint: Option<&str>)
    -> Result<Molecule, Self::Error>;

    /// Reads a molecule from a file path, using the file stem as name hint.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Molecule, Self::Error> {
        let path = path.as_ref();
        let stem = path.file_stem().and_then(|s| s.to_str());
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, stem)
    }
}

/// Failure to turn a structure file into an in-memory molecule.
///
/// Deliberately coarse: the batch driver only needs the offending path and a
/// human-readable reason, whatever the underlying format error was.
#[derive(Debug, Error)]
#[error("Failed to load molecule from '{path}': {message}", path = path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub message: String,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, source: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: source.to_string(),
        }
    }
}

/// The molecule-loading seam of the batch driver.
///
/// Loaders are invoked once per input file from worker threads, so they must
/// be shareable across threads.
pub trait MoleculeLoader: Sync {
    fn load(&self, path: &Path) -> Result<Molecule, LoadError>;
}
