//! Domain layer types and invariants.

pub mod entries;
pub mod error;
pub mod filters;
pub mod subjects;
