//! Public API layer: per-molecule fingerprint generation and the batch driver.

pub mod batch;
pub mod generate;
pub mod progress;
