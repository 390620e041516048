//! Foundation layer: data models, conformer-ensemble I/O, and the fingerprint store.

pub mod io;
pub mod models;
pub mod store;
