pub mod fingerprint;
pub mod molecule;
