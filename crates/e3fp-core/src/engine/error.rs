use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Molecule '{name}' has no atoms")]
    EmptyMolecule { name: String },

    #[error("Conformer index {index} is out of range ({count} conformers)")]
    ConformerOutOfRange { index: usize, count: usize },

    #[error("No fingerprint computed at level {level}; run the engine first")]
    LevelNotComputed { level: usize },

    #[error("Internal engine error: {0}")]
    Internal(String),
}
