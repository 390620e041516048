use super::generate::{self, GenerateOptions, GenerationError, GenerationOutcome};
use super::progress::{Progress, ProgressReporter};
use crate::core::io::traits::{LoadError, MoleculeLoader};
use crate::engine::config::FingerprintingConfig;
use crate::engine::fingerprinter::FingerprinterFactory;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Worker-pool mode for one batch run.
///
/// `Parallel` distributes files across the rayon pool; without the
/// `parallel` feature it degrades to sequential processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    Sequential,
    #[default]
    Parallel,
}

/// The outcome of processing one input file.
///
/// Failures carry their cause; they are recorded, never propagated — one
/// file's failure must not abort the batch.
#[derive(Debug)]
pub enum FileOutcome {
    Generated {
        molecule: String,
        levels: usize,
        fingerprints: usize,
    },
    AlreadyComplete {
        molecule: String,
    },
    LoadFailed(LoadError),
    GenerationFailed(GenerationError),
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated { .. } | Self::AlreadyComplete { .. })
    }
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Expands the input list into the effective file set.
///
/// A single directory argument is replaced by its contained files,
/// non-recursively and in sorted order; subdirectories are not descended
/// into. Any other input list is taken literally.
///
/// # Errors
///
/// Returns an error if the directory cannot be enumerated.
pub fn resolve_inputs(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    if let [single] = inputs
        && single.is_dir()
    {
        let mut files = Vec::new();
        for entry in fs::read_dir(single)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        return Ok(files);
    }
    Ok(inputs.to_vec())
}

/// Runs fingerprint generation over a set of input files.
///
/// Each file is processed to completion by one worker — load, generate,
/// persist — and yields an independent [`FileReport`]. No output ordering is
/// guaranteed across files; within one file, levels are always written in
/// increasing order. The output directory tree is the only resource shared
/// between workers, and directory creation is create-if-absent, so
/// concurrent workers never conflict as long as molecule names are unique.
///
/// # Errors
///
/// Only input resolution can fail the batch as a whole; per-file failures
/// are logged and returned inside the reports.
#[instrument(skip_all, name = "batch_run")]
pub fn run<L, F>(
    inputs: &[PathBuf],
    config: &FingerprintingConfig,
    options: &GenerateOptions,
    loader: &L,
    factory: &F,
    parallelism: Parallelism,
    reporter: &ProgressReporter<'_>,
) -> io::Result<Vec<FileReport>>
where
    L: MoleculeLoader,
    F: FingerprinterFactory,
{
    let files = resolve_inputs(inputs)?;
    info!(files = files.len(), ?parallelism, "Starting fingerprint generation batch.");
    reporter.report(Progress::BatchStart {
        total_files: files.len() as u64,
    });

    let process = |path: &PathBuf| {
        let outcome = process_file(path, config, options, loader, factory);
        match &outcome {
            FileOutcome::Generated {
                molecule,
                levels,
                fingerprints,
            } => info!(
                "Generated {fingerprints} fingerprint(s) across {levels} level(s) for '{molecule}'."
            ),
            FileOutcome::AlreadyComplete { molecule } => {
                info!("'{molecule}' already complete; skipped.");
            }
            FileOutcome::LoadFailed(e) => error!("{e}"),
            FileOutcome::GenerationFailed(e) => error!("{e}"),
        }
        reporter.report(Progress::FileFinish {
            path: path.clone(),
            success: outcome.is_success(),
        });
        FileReport {
            path: path.clone(),
            outcome,
        }
    };

    let reports: Vec<FileReport> = match parallelism {
        Parallelism::Sequential => files.iter().map(process).collect(),
        Parallelism::Parallel => {
            #[cfg(feature = "parallel")]
            {
                files.par_iter().map(process).collect()
            }
            #[cfg(not(feature = "parallel"))]
            {
                files.iter().map(process).collect()
            }
        }
    };

    reporter.report(Progress::BatchFinish);
    let failures = reports.iter().filter(|r| !r.outcome.is_success()).count();
    info!(
        files = reports.len(),
        failures, "Batch finished; see per-file log lines for failures."
    );
    Ok(reports)
}

fn process_file<L, F>(
    path: &Path,
    config: &FingerprintingConfig,
    options: &GenerateOptions,
    loader: &L,
    factory: &F,
) -> FileOutcome
where
    L: MoleculeLoader,
    F: FingerprinterFactory,
{
    let molecule = match loader.load(path) {
        Ok(molecule) => molecule,
        Err(e) => return FileOutcome::LoadFailed(e),
    };

    match generate::run(&molecule, config, options, factory) {
        Ok(GenerationOutcome::AlreadyComplete) => FileOutcome::AlreadyComplete {
            molecule: molecule.name().to_string(),
        },
        Ok(GenerationOutcome::Generated(levels)) => FileOutcome::Generated {
            molecule: molecule.name().to_string(),
            fingerprints: levels.values().map(Vec::len).sum(),
            levels: levels.len(),
        },
        Err(e) => FileOutcome::GenerationFailed(e),
    }
}
