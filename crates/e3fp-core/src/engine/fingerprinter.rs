use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::molecule::Molecule;
use crate::engine::config::FingerprintingConfig;
use crate::engine::error::EngineError;

/// The iterative shell-growth fingerprinting capability.
///
/// One engine instance handles one molecule at a time: [`run`](Self::run) is
/// invoked once per conformer and internally produces the state for *every*
/// level from 0 up to the configured (or naturally reached) maximum in a
/// single pass. The per-level results are then queried with
/// [`fingerprint_at_level`](Self::fingerprint_at_level); a subsequent `run`
/// replaces them.
pub trait Fingerprinter {
    /// Fingerprints one conformer of `molecule`, replacing any previous state.
    ///
    /// # Errors
    ///
    /// Returns an error if the conformer cannot be fingerprinted; the caller
    /// is expected to discard all results for the molecule.
    fn run(&mut self, molecule: &Molecule, conformer: usize) -> Result<(), EngineError>;

    /// Returns the (unnamed) fingerprint of the last-run conformer at `level`.
    ///
    /// Levels past the naturally reached maximum but within the configured
    /// bound yield the stabilized final-level result. Returns `None` before
    /// the first `run` or beyond any configured bound.
    fn fingerprint_at_level(&self, level: usize) -> Option<Fingerprint>;

    /// Highest level actually realized for the last-run conformer.
    fn max_realized_level(&self) -> usize;
}

/// Creates engines from a configuration.
///
/// This is the substitution seam of the generation workflow: production code
/// supplies a factory for a real engine, tests supply spies and failing
/// doubles. Factories are shared across worker threads by the batch driver.
pub trait FingerprinterFactory: Sync {
    type Engine: Fingerprinter;

    fn create(&self, config: &FingerprintingConfig) -> Self::Engine;
}
