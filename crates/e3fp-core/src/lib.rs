//! # E3FP Core Library
//!
//! A library for generating extended three-dimensional fingerprints (E3FP-style)
//! from conformer ensembles of small molecules, and for persisting one fingerprint
//! set per iteration level per molecule with cheap re-run caching.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear
//! separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models ([`core::models::molecule::Molecule`],
//!   [`core::models::fingerprint::Fingerprint`]), the conformer-ensemble I/O traits, and the
//!   compressed fingerprint store.
//!
//! - **[`engine`]: The Capability.** Defines the fingerprinting configuration and the
//!   [`engine::fingerprinter::Fingerprinter`] trait — the substitutable shell-growth hashing
//!   capability — together with a reference radial-hash implementation.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer. It drives
//!   fingerprint generation for one molecule across all conformers and levels
//!   ([`workflows::generate`]) and distributes whole input files across a worker pool
//!   ([`workflows::batch`]).

pub mod core;
pub mod engine;
pub mod workflows;
