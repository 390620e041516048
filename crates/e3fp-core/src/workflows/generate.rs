use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::molecule::Molecule;
use crate::core::store::{self, OutputFormat, StoreError, output_path};
use crate::engine::config::FingerprintingConfig;
use crate::engine::error::EngineError;
use crate::engine::fingerprinter::{Fingerprinter, FingerprinterFactory};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Fingerprints of one molecule, keyed by iteration level; each level holds
/// one fingerprint per processed conformer, in conformer order. Transient —
/// built during one generation run and dropped after persistence.
pub type LevelFingerprints = BTreeMap<usize, Vec<Fingerprint>>;

/// Per-run generation knobs, separate from the fingerprinting parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Basename of the per-level output directories; the iteration level is
    /// appended to it.
    pub out_dir_base: PathBuf,
    /// Compression form (and extension) of the output files.
    pub format: OutputFormat,
    /// Fingerprint only the first N conformers; `None` means all.
    pub first: Option<usize>,
    /// Regenerate even when all output files already exist.
    pub overwrite: bool,
    /// Persist results; `false` returns the collection without touching disk.
    pub save: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir_base: PathBuf::from("E3FP"),
            format: OutputFormat::default(),
            first: None,
            overwrite: false,
            save: true,
        }
    }
}

/// Distinguishes real work from the cache-hit no-op.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Fingerprints were generated (and persisted when saving is on).
    Generated(LevelFingerprints),
    /// Every level's output file already existed; nothing was computed.
    AlreadyComplete,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Fingerprinting failed for molecule '{molecule}': {source}")]
    Fingerprinting {
        molecule: String,
        #[source]
        source: EngineError,
    },

    #[error("Failed to persist level {level} of molecule '{molecule}' to '{path}': {source}", path = path.display())]
    Persistence {
        molecule: String,
        level: usize,
        path: PathBuf,
        #[source]
        source: StoreError,
    },
}

/// Generates fingerprints for every conformer of one molecule across all
/// iteration levels, and persists one file per level.
///
/// The engine is invoked exactly once per conformer (up to `options.first`);
/// fingerprints for each level are queried from that single invocation. With
/// persistence enabled and `overwrite` off, the run is skipped entirely when
/// all level files already exist — this makes re-invoking a batch over
/// already-processed molecules cheap. The existence check is the sole cache
/// signal: outputs produced under a different configuration at the same paths
/// are not detected.
///
/// Level files are written in increasing level order, each atomically, so a
/// concurrent completeness check never sees a higher level before a lower
/// one. On a persistence failure, already-written lower levels are left on
/// disk; there is no cross-level rollback.
///
/// # Errors
///
/// [`GenerationError::Fingerprinting`] if the engine fails on any conformer —
/// in that case nothing is persisted for the molecule at any level — or
/// [`GenerationError::Persistence`] if a level write fails.
#[instrument(skip_all, fields(molecule = %molecule.name()), name = "generate_workflow")]
pub fn run<F: FingerprinterFactory>(
    molecule: &Molecule,
    config: &FingerprintingConfig,
    options: &GenerateOptions,
    factory: &F,
) -> Result<GenerationOutcome, GenerationError> {
    let name = molecule.name();

    // With an unbounded max level the number of level files is unknown until
    // the engine has run, so the check only applies to bounded runs.
    if options.save
        && !options.overwrite
        && let Some(max) = config.max_level
    {
        let complete = (0..=max)
            .all(|level| output_path(&options.out_dir_base, level, name, options.format).is_file());
        if complete {
            warn!("All fingerprint files for '{name}' already exist. Skipping.");
            return Ok(GenerationOutcome::AlreadyComplete);
        }
    }

    info!("Generating fingerprints for '{name}'.");
    let mut engine = factory.create(config);
    let conformer_count = match options.first {
        Some(first) => molecule.conformers().len().min(first),
        None => molecule.conformers().len(),
    };

    let mut per_conformer: Vec<Vec<Fingerprint>> = Vec::with_capacity(conformer_count);
    for j in 0..conformer_count {
        engine
            .run(molecule, j)
            .map_err(|source| GenerationError::Fingerprinting {
                molecule: name.to_string(),
                source,
            })?;

        let top = config
            .max_level
            .unwrap_or_else(|| engine.max_realized_level());
        let mut fingerprints = Vec::with_capacity(top + 1);
        for level in 0..=top {
            let mut fingerprint = engine.fingerprint_at_level(level).ok_or_else(|| {
                GenerationError::Fingerprinting {
                    molecule: name.to_string(),
                    source: EngineError::LevelNotComputed { level },
                }
            })?;
            fingerprint.name = format!("{name}_{j}");
            fingerprints.push(fingerprint);
        }
        per_conformer.push(fingerprints);
    }
    debug!(
        conformers = per_conformer.len(),
        "Fingerprinted all requested conformers."
    );

    let levels = collect_levels(per_conformer);

    if options.save {
        persist(name, &levels, options)?;
        info!("Saved fingerprints for '{name}'.");
    }

    Ok(GenerationOutcome::Generated(levels))
}

/// Regroups per-conformer fingerprints by level.
///
/// Under an unbounded max level, conformers may stabilize at different
/// depths; shorter runs are padded with their frozen final-level fingerprint
/// so every level holds exactly one fingerprint per processed conformer.
fn collect_levels(per_conformer: Vec<Vec<Fingerprint>>) -> LevelFingerprints {
    let depth = per_conformer.iter().map(Vec::len).max().unwrap_or(0);

    let mut levels = LevelFingerprints::new();
    for fingerprints in per_conformer {
        let frozen = fingerprints.last().cloned();
        let realized = fingerprints.len();
        for (level, fingerprint) in fingerprints.into_iter().enumerate() {
            levels.entry(level).or_default().push(fingerprint);
        }
        if let Some(frozen) = frozen {
            for level in realized..depth {
                let mut padded = frozen.clone();
                padded.level = level;
                levels.entry(level).or_default().push(padded);
            }
        }
    }
    levels
}

fn persist(
    name: &str,
    levels: &LevelFingerprints,
    options: &GenerateOptions,
) -> Result<(), GenerationError> {
    for (&level, fingerprints) in levels {
        let path = output_path(&options.out_dir_base, level, name, options.format);
        let written: Result<(), StoreError> = (|| {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            store::save(&path, options.format, fingerprints)
        })();
        written.map_err(|source| GenerationError::Persistence {
            molecule: name.to_string(),
            level,
            path: path.clone(),
            source,
        })?;
        debug!(level, path = %path.display(), "Level written.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::fingerprint::{Representation, RepresentationKind};
    use crate::core::models::molecule::{Atom, Conformer};
    use nalgebra::Point3;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine double: deterministic identifiers, configurable natural
    /// termination depth and per-conformer failure, with shared run counting.
    struct MockEngine {
        runs: Arc<AtomicUsize>,
        fail_on: Option<usize>,
        natural: usize,
        varying_depth: bool,
        max_level: Option<usize>,
        current: Option<usize>,
    }

    impl MockEngine {
        fn natural_for(&self, conformer: usize) -> usize {
            if self.varying_depth {
                self.natural + conformer % 2
            } else {
                self.natural
            }
        }
    }

    impl Fingerprinter for MockEngine {
        fn run(&mut self, _molecule: &Molecule, conformer: usize) -> Result<(), EngineError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.current = None;
            if self.fail_on == Some(conformer) {
                return Err(EngineError::Internal("induced failure".into()));
            }
            self.current = Some(conformer);
            Ok(())
        }

        fn fingerprint_at_level(&self, level: usize) -> Option<Fingerprint> {
            let conformer = self.current?;
            if let Some(max) = self.max_level
                && level > max
            {
                return None;
            }
            let effective = level.min(self.natural_for(conformer));
            let mut representation = Representation::empty(RepresentationKind::Bits);
            representation.insert((effective * 1000 + conformer) as u32);
            Some(Fingerprint::unnamed(level, representation, None))
        }

        fn max_realized_level(&self) -> usize {
            self.current.map_or(0, |j| self.natural_for(j))
        }
    }

    #[derive(Default)]
    struct SpyFactory {
        runs: Arc<AtomicUsize>,
        fail_on: Option<usize>,
        natural: usize,
        varying_depth: bool,
    }

    impl FingerprinterFactory for SpyFactory {
        type Engine = MockEngine;

        fn create(&self, config: &FingerprintingConfig) -> MockEngine {
            MockEngine {
                runs: self.runs.clone(),
                fail_on: self.fail_on,
                natural: self.natural,
                varying_depth: self.varying_depth,
                max_level: config.max_level,
                current: None,
            }
        }
    }

    fn molecule_with_conformers(name: &str, count: usize) -> Molecule {
        let mut mol = Molecule::new(name, vec![Atom::new("C")], vec![]).unwrap();
        for i in 0..count {
            mol.add_conformer(Conformer::new(vec![Point3::new(i as f64, 0.0, 0.0)]))
                .unwrap();
        }
        mol
    }

    fn bounded_config(max: usize) -> FingerprintingConfig {
        FingerprintingConfig::builder()
            .max_level(Some(max))
            .build()
            .unwrap()
    }

    fn options_in(dir: &Path) -> GenerateOptions {
        GenerateOptions {
            out_dir_base: dir.join("E3FP"),
            format: OutputFormat::Plain,
            ..GenerateOptions::default()
        }
    }

    fn spy(natural: usize) -> SpyFactory {
        SpyFactory {
            natural,
            ..SpyFactory::default()
        }
    }

    #[test]
    fn produces_one_file_per_level_with_capped_conformers() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 3);
        let factory = spy(5);
        let options = GenerateOptions {
            first: Some(2),
            ..options_in(dir.path())
        };

        let outcome = run(&mol, &bounded_config(2), &options, &factory).unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated(_)));

        for level in 0..=2usize {
            let path = output_path(&options.out_dir_base, level, "mol", OutputFormat::Plain);
            let fingerprints = store::load(&path, OutputFormat::Plain).unwrap();
            assert_eq!(fingerprints.len(), 2, "level {level}");
            let names: Vec<_> = fingerprints.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, ["mol_0", "mol_1"]);
        }
        assert!(
            !output_path(&options.out_dir_base, 3, "mol", OutputFormat::Plain).exists()
        );
        // One engine invocation per processed conformer.
        assert_eq!(factory.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn complete_output_set_is_skipped_without_engine_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 2);
        let factory = spy(5);
        let options = options_in(dir.path());
        let config = bounded_config(1);

        run(&mol, &config, &options, &factory).unwrap();
        assert_eq!(factory.runs.load(Ordering::SeqCst), 2);

        let outcome = run(&mol, &config, &options, &factory).unwrap();
        assert!(matches!(outcome, GenerationOutcome::AlreadyComplete));
        assert_eq!(factory.runs.load(Ordering::SeqCst), 2, "cache hit must not run the engine");
    }

    #[test]
    fn missing_level_file_defeats_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 1);
        let factory = spy(5);
        let options = options_in(dir.path());
        let config = bounded_config(2);

        run(&mol, &config, &options, &factory).unwrap();
        fs::remove_file(output_path(&options.out_dir_base, 1, "mol", OutputFormat::Plain)).unwrap();

        let outcome = run(&mol, &config, &options, &factory).unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated(_)));
        assert_eq!(factory.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn overwrite_regenerates_despite_complete_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 1);
        let factory = spy(5);
        let config = bounded_config(1);
        let mut options = options_in(dir.path());

        run(&mol, &config, &options, &factory).unwrap();
        options.overwrite = true;
        let outcome = run(&mol, &config, &options, &factory).unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated(_)));
        assert_eq!(factory.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn engine_failure_leaves_no_output_at_any_level() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 3);
        let factory = SpyFactory {
            fail_on: Some(1),
            natural: 5,
            ..SpyFactory::default()
        };
        let options = options_in(dir.path());

        let err = run(&mol, &bounded_config(2), &options, &factory).unwrap_err();
        assert!(matches!(err, GenerationError::Fingerprinting { ref molecule, .. } if molecule == "mol"));

        // The failure struck on the second conformer; nothing may be on disk.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty(), "no level directories expected: {entries:?}");
    }

    #[test]
    fn persistence_failure_keeps_lower_levels() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 1);
        let factory = spy(5);
        let options = options_in(dir.path());
        let config = bounded_config(1);

        // Occupy the level-1 directory path with a plain file so its
        // create_dir_all fails after level 0 has been written.
        let mut blocked = options.out_dir_base.as_os_str().to_os_string();
        blocked.push("1");
        fs::write(PathBuf::from(blocked), b"in the way").unwrap();

        let err = run(&mol, &config, &options, &factory).unwrap_err();
        assert!(matches!(err, GenerationError::Persistence { level: 1, .. }));
        assert!(
            output_path(&options.out_dir_base, 0, "mol", OutputFormat::Plain).is_file(),
            "level 0 must survive the level 1 failure"
        );
    }

    #[test]
    fn save_disabled_returns_collection_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 2);
        let factory = spy(1);
        let options = GenerateOptions {
            save: false,
            ..options_in(dir.path())
        };

        let outcome = run(&mol, &bounded_config(1), &options, &factory).unwrap();
        let GenerationOutcome::Generated(levels) = outcome else {
            panic!("expected generated outcome");
        };
        assert_eq!(levels.len(), 2);
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn unbounded_runs_pad_shallow_conformers_to_full_depth() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 2);
        // Conformer 0 stabilizes at level 1, conformer 1 at level 2.
        let factory = SpyFactory {
            natural: 1,
            varying_depth: true,
            ..SpyFactory::default()
        };
        let options = GenerateOptions {
            save: false,
            ..options_in(dir.path())
        };
        let config = FingerprintingConfig::default();

        let GenerationOutcome::Generated(levels) = run(&mol, &config, &options, &factory).unwrap()
        else {
            panic!("expected generated outcome");
        };

        assert_eq!(levels.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        for (level, fingerprints) in &levels {
            assert_eq!(fingerprints.len(), 2, "level {level}");
            assert_eq!(fingerprints[0].name, "mol_0");
            assert_eq!(fingerprints[1].name, "mol_1");
        }
        // The padded level-2 entry of conformer 0 reuses its frozen level-1
        // representation but reports the padded level.
        let frozen = &levels[&1][0];
        let padded = &levels[&2][0];
        assert_eq!(padded.representation, frozen.representation);
        assert_eq!(padded.level, 2);
    }

    #[test]
    fn molecule_without_conformers_yields_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mol = molecule_with_conformers("mol", 0);
        let factory = spy(3);
        let options = options_in(dir.path());

        let GenerationOutcome::Generated(levels) =
            run(&mol, &FingerprintingConfig::default(), &options, &factory).unwrap()
        else {
            panic!("expected generated outcome");
        };
        assert!(levels.is_empty());
        assert_eq!(factory.runs.load(Ordering::SeqCst), 0);
    }
}
