use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Molecule name '{0}' is not usable as a file name component")]
    InvalidName(String),
    #[error("Conformer has {got} coordinates but the molecule has {expected} atoms")]
    ConformerSizeMismatch { expected: usize, got: usize },
    #[error("Bond ({0}, {1}) references an atom that does not exist")]
    BondOutOfRange(usize, usize),
}

/// One atom of a molecule, independent of any particular 3D geometry.
///
/// Atom identity is positional: the atom's index in [`Molecule::atoms`] is the
/// ordinal used by bonds, conformer coordinates, and fingerprint substructures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// Element symbol, e.g. `"C"`, `"N"`, `"Cl"`.
    pub element: String,
}

impl Atom {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
        }
    }
}

/// One 3D geometry instance of a molecule.
///
/// A conformer carries exactly one coordinate per atom, in atom order. Within a
/// molecule, a conformer is identified only by its ordinal position (0-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    positions: Vec<Point3<f64>>,
}

impl Conformer {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A named molecule owning an ordered sequence of conformers.
///
/// Immutable once loaded for the duration of fingerprint generation. The name
/// must be usable as a path-component fragment because output files for the
/// molecule are named after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    name: String,
    atoms: Vec<Atom>,
    bonds: Vec<(usize, usize)>,
    conformers: Vec<Conformer>,
}

impl Molecule {
    /// Creates a molecule with no conformers.
    ///
    /// # Errors
    ///
    /// Returns [`MoleculeError::InvalidName`] if the name is empty or contains
    /// path separators, and [`MoleculeError::BondOutOfRange`] if a bond
    /// references a nonexistent atom.
    pub fn new(
        name: impl Into<String>,
        atoms: Vec<Atom>,
        bonds: Vec<(usize, usize)>,
    ) -> Result<Self, MoleculeError> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(MoleculeError::InvalidName(name));
        }
        for &(a, b) in &bonds {
            if a >= atoms.len() || b >= atoms.len() {
                return Err(MoleculeError::BondOutOfRange(a, b));
            }
        }
        Ok(Self {
            name,
            atoms,
            bonds,
            conformers: Vec::new(),
        })
    }

    /// Appends a conformer, which must have one coordinate per atom.
    pub fn add_conformer(&mut self, conformer: Conformer) -> Result<(), MoleculeError> {
        if conformer.len() != self.atoms.len() {
            return Err(MoleculeError::ConformerSizeMismatch {
                expected: self.atoms.len(),
                got: conformer.len(),
            });
        }
        self.conformers.push(conformer);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[(usize, usize)] {
        &self.bonds
    }

    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    pub fn conformer(&self, index: usize) -> Option<&Conformer> {
        self.conformers.get(index)
    }

    /// Assigns each atom to a covalently connected fragment.
    ///
    /// Returns one fragment id per atom; two atoms share an id iff they are
    /// connected through the bond list. Atoms with no bonds form singleton
    /// fragments. Used to exclude disconnected atoms from shell hashing.
    pub fn fragments(&self) -> Vec<usize> {
        let n = self.atoms.len();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], i: usize) -> usize {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            let mut cur = i;
            while parent[cur] != root {
                let next = parent[cur];
                parent[cur] = root;
                cur = next;
            }
            root
        }

        for &(a, b) in &self.bonds {
            let ra = find(&mut parent, a);
            let rb = find(&mut parent, b);
            if ra != rb {
                parent[ra] = rb;
            }
        }

        // Renumber roots to dense fragment ids in atom order.
        let mut ids = vec![usize::MAX; n];
        let mut next_id = 0;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let root = find(&mut parent, i);
            if ids[root] == usize::MAX {
                ids[root] = next_id;
                next_id += 1;
            }
            out.push(ids[root]);
        }
        out
    }
}
