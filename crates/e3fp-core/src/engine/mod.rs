//! The fingerprinting capability: configuration, the [`fingerprinter::Fingerprinter`]
//! trait that the generation workflow drives, and a reference shell-growth
//! hashing engine.
//!
//! The workflow layer never depends on hashing internals — it creates engines
//! through [`fingerprinter::FingerprinterFactory`], invokes them once per
//! conformer, and queries the per-level results. Any engine honoring that
//! contract can be substituted, including test doubles.

pub mod config;
pub mod error;
pub mod fingerprinter;
pub mod radial;
