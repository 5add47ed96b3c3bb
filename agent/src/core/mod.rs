//! Pure, deterministic logic for the execution core.

pub mod chdir;
pub mod transcript;
pub mod types;
