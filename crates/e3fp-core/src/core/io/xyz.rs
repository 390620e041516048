use crate::core::io::traits::{ConformerEnsembleFile, LoadError, MoleculeLoader};
use crate::core::models::molecule::{Atom, Conformer, Molecule, MoleculeError};
use nalgebra::Point3;
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("File contains no conformer blocks")]
    Empty,
    #[error("File has no molecule name and no name hint was supplied")]
    MissingName,
    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid integer (value: '{value}')")]
    InvalidInt { value: String },
    #[error("Invalid float (value: '{value}')")]
    InvalidFloat { value: String },
    #[error("Atom record needs an element symbol and three coordinates")]
    MalformedAtomRecord,
    #[error("Invalid bond token '{value}' (expected 'i-j')")]
    InvalidBond { value: String },
}

/// A multi-conformer ensemble in concatenated-XYZ form.
///
/// Each block is a standard XYZ frame: an atom count line, a comment line, and
/// one `element x y z` record per atom. Blocks are concatenated back to back
/// and must agree on atom count and element order.
///
/// The first block's comment line names the molecule; any further
/// whitespace-separated `i-j` tokens on it declare bonds between 0-based atom
/// ordinals. Comment lines of later blocks are ignored. This reader is
/// intentionally minimal — it exists so the pipeline has a concrete
/// [`ConformerEnsembleFile`]; richer chemical formats plug in through the
/// same trait.
pub struct XyzEnsembleFile;

impl ConformerEnsembleFile for XyzEnsembleFile {
    type Error = XyzError;

    fn read_from(
        reader: &mut impl BufRead,
        name_hint: Option<&str>,
    ) -> Result<Molecule, Self::Error> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line?);
        }

        let mut cursor = 0;
        let mut molecule: Option<Molecule> = None;

        while let Some(count_line) = next_content_line(&lines, &mut cursor) {
            let (line_no, text) = count_line;
            let atom_count: usize =
                text.trim()
                    .parse()
                    .map_err(|_| XyzError::Parse {
                        line: line_no,
                        kind: XyzParseErrorKind::InvalidInt {
                            value: text.trim().to_string(),
                        },
                    })?;

            let comment = lines
                .get(cursor)
                .ok_or_else(|| XyzError::Inconsistency("Truncated block header".into()))?
                .clone();
            cursor += 1;

            let mut elements = Vec::with_capacity(atom_count);
            let mut positions = Vec::with_capacity(atom_count);
            for _ in 0..atom_count {
                let line_no = cursor + 1;
                let record = lines
                    .get(cursor)
                    .ok_or_else(|| XyzError::Inconsistency("Truncated atom records".into()))?;
                cursor += 1;
                let (element, point) = parse_atom_record(record, line_no)?;
                elements.push(element);
                positions.push(point);
            }

            match &mut molecule {
                None => {
                    let (name, bonds) = parse_first_comment(&comment, name_hint)?;
                    let atoms = elements.into_iter().map(Atom::new).collect();
                    let mut mol = Molecule::new(name, atoms, bonds)?;
                    mol.add_conformer(Conformer::new(positions))?;
                    molecule = Some(mol);
                }
                Some(mol) => {
                    if elements.len() != mol.atoms().len() {
                        return Err(XyzError::Inconsistency(format!(
                            "Conformer block has {} atoms, expected {}",
                            elements.len(),
                            mol.atoms().len()
                        )));
                    }
                    for (i, element) in elements.iter().enumerate() {
                        if *element != mol.atoms()[i].element {
                            return Err(XyzError::Inconsistency(format!(
                                "Element mismatch at atom {i}: '{element}' vs '{}'",
                                mol.atoms()[i].element
                            )));
                        }
                    }
                    mol.add_conformer(Conformer::new(positions))?;
                }
            }
        }

        molecule.ok_or(XyzError::Empty)
    }
}

fn next_content_line<'a>(lines: &'a [String], cursor: &mut usize) -> Option<(usize, &'a str)> {
    while *cursor < lines.len() {
        let idx = *cursor;
        *cursor += 1;
        if !lines[idx].trim().is_empty() {
            return Some((idx + 1, &lines[idx]));
        }
    }
    None
}

fn parse_atom_record(record: &str, line_no: usize) -> Result<(String, Point3<f64>), XyzError> {
    let mut parts = record.split_whitespace();
    let element = parts
        .next()
        .ok_or(XyzError::Parse {
            line: line_no,
            kind: XyzParseErrorKind::MalformedAtomRecord,
        })?
        .to_string();
    let mut coords = [0.0f64; 3];
    for coord in &mut coords {
        let token = parts.next().ok_or(XyzError::Parse {
            line: line_no,
            kind: XyzParseErrorKind::MalformedAtomRecord,
        })?;
        *coord = token.parse().map_err(|_| XyzError::Parse {
            line: line_no,
            kind: XyzParseErrorKind::InvalidFloat {
                value: token.to_string(),
            },
        })?;
    }
    Ok((element, Point3::new(coords[0], coords[1], coords[2])))
}

fn parse_first_comment(
    comment: &str,
    name_hint: Option<&str>,
) -> Result<(String, Vec<(usize, usize)>), XyzError> {
    let mut tokens = comment.split_whitespace().peekable();
    let name = match tokens.peek() {
        Some(first) if !is_bond_token(first) => {
            let name = (*first).to_string();
            tokens.next();
            name
        }
        _ => name_hint.map(str::to_string).ok_or(XyzError::MissingName)?,
    };

    let mut bonds = Vec::new();
    for token in tokens {
        let invalid = || XyzError::Parse {
            line: 2,
            kind: XyzParseErrorKind::InvalidBond {
                value: token.to_string(),
            },
        };
        let (a, b) = token.split_once('-').ok_or_else(invalid)?;
        let a: usize = a.parse().map_err(|_| invalid())?;
        let b: usize = b.parse().map_err(|_| invalid())?;
        bonds.push((a, b));
    }
    Ok((name, bonds))
}

fn is_bond_token(token: &str) -> bool {
    token
        .split_once('-')
        .is_some_and(|(a, b)| a.parse::<usize>().is_ok() && b.parse::<usize>().is_ok())
}

/// [`MoleculeLoader`] over concatenated-XYZ ensemble files.
#[derive(Debug, Clone, Copy, Default)]
pub struct XyzLoader;

impl MoleculeLoader for XyzLoader {
    fn load(&self, path: &Path) -> Result<Molecule, LoadError> {
        XyzEnsembleFile::read_from_path(path).map_err(|e| LoadError::new(path, e))
    }
}
