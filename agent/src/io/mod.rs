//! Side-effecting components behind the execution core.

pub mod config;
pub mod confirm;
pub mod llm;
pub mod process;
pub mod session;
