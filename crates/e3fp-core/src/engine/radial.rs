use crate::core::models::fingerprint::{Fingerprint, Representation, Substructure};
use crate::core::models::molecule::Molecule;
use crate::engine::config::FingerprintingConfig;
use crate::engine::error::EngineError;
use crate::engine::fingerprinter::{Fingerprinter, FingerprinterFactory};
use fxhash::FxHasher64;
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hasher;
use tracing::trace;

/// Distances are folded into identifiers at this resolution, so coordinate
/// noise below it cannot flip bits.
const DISTANCE_QUANTUM: f64 = 0.05;

/// Tolerance on the signed volume used for the stereo term.
const CHIRALITY_EPSILON: f64 = 1e-6;

/// Reference shell-growth hashing engine.
///
/// Level 0 hashes each atom's element symbol. At level *k* the shell around
/// each atom spans the radius `k × shell_radius`; the atom's identifier is a
/// stable hash of its previous identifier together with the previous
/// identifiers and quantized distances of every atom inside the shell,
/// optionally extended with a chirality sign derived from the three nearest
/// neighbors. Growth terminates naturally once no atom's shell membership
/// changes between consecutive levels.
///
/// The implementation is a faithful realization of the [`Fingerprinter`]
/// contract rather than a reproduction of any published hash values.
#[derive(Debug)]
pub struct RadialFingerprinter {
    config: FingerprintingConfig,
    levels: Vec<LevelState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Shell {
    identifier: u32,
    members: BTreeSet<usize>,
}

#[derive(Debug)]
struct LevelState {
    shells: Vec<Shell>,
}

impl RadialFingerprinter {
    pub fn new(config: FingerprintingConfig) -> Self {
        Self {
            config,
            levels: Vec::new(),
        }
    }

    fn grow_level(
        &self,
        level: usize,
        positions: &[Point3<f64>],
        fragments: Option<&[usize]>,
        previous: &[Shell],
    ) -> Vec<Shell> {
        let radius = level as f64 * self.config.shell_radius;
        let mut shells = Vec::with_capacity(positions.len());

        for (i, center) in positions.iter().enumerate() {
            let mut members = BTreeSet::from([i]);
            let mut neighbors: Vec<(i64, u32, usize)> = Vec::new();

            for (j, other) in positions.iter().enumerate() {
                if j == i {
                    continue;
                }
                if let Some(frags) = fragments
                    && frags[j] != frags[i]
                {
                    continue;
                }
                let distance = (other - center).norm();
                if distance <= radius {
                    members.insert(j);
                    neighbors.push((quantize(distance), previous[j].identifier, j));
                }
            }

            neighbors.sort_unstable();

            let stereo_sign = self
                .config
                .stereo
                .then(|| chirality_sign(i, &neighbors, positions));

            let identifier = shell_identifier(level, previous[i].identifier, &neighbors, stereo_sign);
            shells.push(Shell {
                identifier,
                members,
            });
        }

        shells
    }
}

impl Fingerprinter for RadialFingerprinter {
    fn run(&mut self, molecule: &Molecule, conformer: usize) -> Result<(), EngineError> {
        self.levels.clear();

        if molecule.atoms().is_empty() {
            return Err(EngineError::EmptyMolecule {
                name: molecule.name().to_string(),
            });
        }
        let conf = molecule
            .conformer(conformer)
            .ok_or(EngineError::ConformerOutOfRange {
                index: conformer,
                count: molecule.conformers().len(),
            })?;
        let positions = conf.positions();

        let fragments = (!self.config.include_disconnected).then(|| molecule.fragments());

        let initial: Vec<Shell> = molecule
            .atoms()
            .iter()
            .enumerate()
            .map(|(i, atom)| Shell {
                identifier: initial_identifier(&atom.element),
                members: BTreeSet::from([i]),
            })
            .collect();
        self.levels.push(LevelState { shells: initial });

        let mut level = 1;
        loop {
            if let Some(max) = self.config.max_level
                && level > max
            {
                break;
            }

            let previous = &self.levels[level - 1].shells;
            let shells = self.grow_level(level, positions, fragments.as_deref(), previous);

            let stabilized = shells
                .iter()
                .zip(previous)
                .all(|(next, prev)| next.members == prev.members);
            if stabilized {
                trace!(level, "Shell growth stabilized; terminating.");
                break;
            }

            self.levels.push(LevelState { shells });
            level += 1;
        }

        Ok(())
    }

    fn fingerprint_at_level(&self, level: usize) -> Option<Fingerprint> {
        if self.levels.is_empty() {
            return None;
        }
        if let Some(max) = self.config.max_level
            && level > max
        {
            return None;
        }

        // Past natural termination the shells are frozen, so deeper levels
        // reuse the last realized state.
        let state = &self.levels[level.min(self.levels.len() - 1)];

        let mut representation = Representation::empty(self.config.kind);
        let mut substructures = self
            .config
            .retain_substructures
            .then(BTreeMap::<u32, Substructure>::new);

        for (i, shell) in state.shells.iter().enumerate() {
            representation.insert(shell.identifier);
            if let Some(map) = &mut substructures {
                map.entry(shell.identifier).or_insert_with(|| Substructure {
                    center: i,
                    atoms: shell.members.iter().copied().collect(),
                });
            }
        }

        Some(Fingerprint::unnamed(level, representation, substructures))
    }

    fn max_realized_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }
}

/// Factory for [`RadialFingerprinter`] engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialFingerprinterFactory;

impl FingerprinterFactory for RadialFingerprinterFactory {
    type Engine = RadialFingerprinter;

    fn create(&self, config: &FingerprintingConfig) -> Self::Engine {
        RadialFingerprinter::new(config.clone())
    }
}

fn quantize(distance: f64) -> i64 {
    (distance / DISTANCE_QUANTUM).round() as i64
}

fn fold(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

fn initial_identifier(element: &str) -> u32 {
    let mut hasher = FxHasher64::default();
    hasher.write(element.as_bytes());
    fold(hasher.finish())
}

fn shell_identifier(
    level: usize,
    center: u32,
    neighbors: &[(i64, u32, usize)],
    stereo_sign: Option<i8>,
) -> u32 {
    let mut hasher = FxHasher64::default();
    hasher.write_u64(level as u64);
    hasher.write_u32(center);
    for &(distance, identifier, _) in neighbors {
        hasher.write_i64(distance);
        hasher.write_u32(identifier);
    }
    if let Some(sign) = stereo_sign {
        hasher.write_i8(sign);
    }
    fold(hasher.finish())
}

/// Sign of the signed volume spanned by the vectors from the center to its
/// three nearest shell members. Zero for planar or under-determined shells.
fn chirality_sign(
    center: usize,
    neighbors: &[(i64, u32, usize)],
    positions: &[Point3<f64>],
) -> i8 {
    if neighbors.len() < 3 {
        return 0;
    }
    let origin = positions[center];
    let v1 = positions[neighbors[0].2] - origin;
    let v2 = positions[neighbors[1].2] - origin;
    let v3 = positions[neighbors[2].2] - origin;
    let volume = v1.cross(&v2).dot(&v3);
    if volume > CHIRALITY_EPSILON {
        1
    } else if volume < -CHIRALITY_EPSILON {
        -1
    } else {
        0
    }
}
