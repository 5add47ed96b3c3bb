//! Shared deterministic types for the execution core.
//!
//! These types define stable contracts between components. They carry no
//! I/O and must stay deterministic so scripted tests can assert on them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Human decision for a single proposed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Declined,
}

/// Captured result of one command request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Process exit code. Signal-terminated or timed-out children report -1.
    pub exit_code: i32,
    /// Captured standard output, bounded by the configured byte limit.
    pub stdout: String,
    /// Captured standard error. Timeout and truncation notices are appended
    /// here so the transcript stays three-field.
    pub stderr: String,
    /// False only for declined requests recorded in history.
    pub executed: bool,
    /// Resolved absolute directory reported by a directory-change command.
    ///
    /// A subprocess's own `cd` never propagates to the parent, so the
    /// runner reports the target and session state applies it.
    pub new_workdir: Option<PathBuf>,
}

impl ExecutionOutcome {
    /// Outcome recorded for a command the user refused to run.
    pub fn declined() -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            executed: false,
            new_workdir: None,
        }
    }

    /// True when the command ran and exited zero.
    pub fn success(&self) -> bool {
        self.executed && self.exit_code == 0
    }
}

/// One command/outcome pair in the session's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    pub outcome: ExecutionOutcome,
}
