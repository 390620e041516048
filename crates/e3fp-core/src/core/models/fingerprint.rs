use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Selects how substructure identifiers are represented in a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RepresentationKind {
    /// Presence-only bit set: each identifier is either on or off.
    #[default]
    Bits,
    /// Occurrence counts: each identifier maps to how often it was produced.
    Counts,
}

/// The active identifiers of one fingerprint, bit-based or count-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    Bits(BTreeSet<u32>),
    Counts(BTreeMap<u32, u32>),
}

impl Representation {
    pub fn empty(kind: RepresentationKind) -> Self {
        match kind {
            RepresentationKind::Bits => Self::Bits(BTreeSet::new()),
            RepresentationKind::Counts => Self::Counts(BTreeMap::new()),
        }
    }

    pub fn kind(&self) -> RepresentationKind {
        match self {
            Self::Bits(_) => RepresentationKind::Bits,
            Self::Counts(_) => RepresentationKind::Counts,
        }
    }

    /// Records one occurrence of an identifier.
    ///
    /// For bit fingerprints repeated insertions are idempotent; for count
    /// fingerprints they increment the identifier's count.
    pub fn insert(&mut self, identifier: u32) {
        match self {
            Self::Bits(set) => {
                set.insert(identifier);
            }
            Self::Counts(map) => {
                *map.entry(identifier).or_insert(0) += 1;
            }
        }
    }

    pub fn contains(&self, identifier: u32) -> bool {
        match self {
            Self::Bits(set) => set.contains(&identifier),
            Self::Counts(map) => map.contains_key(&identifier),
        }
    }

    pub fn count(&self, identifier: u32) -> u32 {
        match self {
            Self::Bits(set) => u32::from(set.contains(&identifier)),
            Self::Counts(map) => map.get(&identifier).copied().unwrap_or(0),
        }
    }

    /// Number of distinct identifiers present.
    pub fn len(&self) -> usize {
        match self {
            Self::Bits(set) => set.len(),
            Self::Counts(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The atoms an identifier stands for: a shell center and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substructure {
    /// Ordinal of the atom the shell was grown around.
    pub center: usize,
    /// Ordinals of all atoms inside the shell, in ascending order.
    pub atoms: Vec<usize>,
}

/// A fingerprint of one conformer at one iteration level.
///
/// The name is assigned by the generation workflow as
/// `"<molecule_name>_<conformer_index>"`; engines produce fingerprints with an
/// empty name. Immutable after creation apart from that naming step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub name: String,
    /// Iteration level this fingerprint summarizes shells for.
    pub level: usize,
    pub representation: Representation,
    /// Identifier-to-substructure provenance, kept only when configured.
    pub substructures: Option<BTreeMap<u32, Substructure>>,
}

impl Fingerprint {
    /// Creates a not-yet-named fingerprint, as produced by an engine.
    pub fn unnamed(
        level: usize,
        representation: Representation,
        substructures: Option<BTreeMap<u32, Substructure>>,
    ) -> Self {
        Self {
            name: String::new(),
            level,
            representation,
            substructures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_insertion_is_idempotent() {
        let mut repr = Representation::empty(RepresentationKind::Bits);
        repr.insert(42);
        repr.insert(42);
        assert_eq!(repr.len(), 1);
        assert_eq!(repr.count(42), 1);
        assert!(repr.contains(42));
        assert!(!repr.contains(7));
    }

    #[test]
    fn count_insertion_accumulates() {
        let mut repr = Representation::empty(RepresentationKind::Counts);
        repr.insert(42);
        repr.insert(42);
        repr.insert(7);
        assert_eq!(repr.len(), 2);
        assert_eq!(repr.count(42), 2);
        assert_eq!(repr.count(7), 1);
        assert_eq!(repr.count(9), 0);
    }

    #[test]
    fn kind_round_trips_through_empty() {
        for kind in [RepresentationKind::Bits, RepresentationKind::Counts] {
            let repr = Representation::empty(kind);
            assert_eq!(repr.kind(), kind);
            assert!(repr.is_empty());
        }
    }

    #[test]
    fn unnamed_fingerprint_has_empty_name() {
        let fp = Fingerprint::unnamed(3, Representation::empty(RepresentationKind::Bits), None);
        assert!(fp.name.is_empty());
        assert_eq!(fp.level, 3);
        assert!(fp.substructures.is_none());
    }
}
