//! Session state: the tracked working directory and execution history.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::core::types::{ExecutionOutcome, HistoryEntry};

/// A directory change resolved to a path that is not an existing
/// directory. The previous working directory is always retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStateTransition {
    pub attempted: PathBuf,
}

impl fmt::Display for InvalidStateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot change directory to {}: not an existing directory",
            self.attempted.display()
        )
    }
}

impl std::error::Error for InvalidStateTransition {}

/// The one durable piece of state across turns.
///
/// Owned by the interactive loop and passed by mutable reference into the
/// execution tool; nothing else mutates it. Invariant: `workdir` always
/// names the directory the next command will execute in.
#[derive(Debug)]
pub struct SessionState {
    workdir: PathBuf,
    history: Vec<HistoryEntry>,
}

impl SessionState {
    /// Create session state rooted at `initial`, normally the process's
    /// starting directory. The directory must exist.
    pub fn new(initial: PathBuf) -> Result<Self> {
        let workdir = initial
            .canonicalize()
            .with_context(|| format!("resolve initial directory {}", initial.display()))?;
        if !workdir.is_dir() {
            return Err(anyhow!("not a directory: {}", workdir.display()));
        }
        debug!(workdir = %workdir.display(), "session started");
        Ok(Self {
            workdir,
            history: Vec::new(),
        })
    }

    /// Directory the next command will execute in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Apply a directory change.
    ///
    /// Fails with [`InvalidStateTransition`] when `path` is not an existing
    /// directory; the previous value is kept untouched.
    pub fn set_workdir(&mut self, path: PathBuf) -> Result<()> {
        let Ok(resolved) = path.canonicalize() else {
            return Err(InvalidStateTransition { attempted: path }.into());
        };
        if !resolved.is_dir() {
            return Err(InvalidStateTransition { attempted: path }.into());
        }
        info!(from = %self.workdir.display(), to = %resolved.display(), "working directory changed");
        self.workdir = resolved;
        Ok(())
    }

    /// Append one command/outcome pair. Append-only; never fails.
    pub fn record(&mut self, command: &str, outcome: ExecutionOutcome) {
        debug!(
            command,
            executed = outcome.executed,
            exit_code = outcome.exit_code,
            "recording outcome"
        );
        self.history.push(HistoryEntry {
            command: command.to_string(),
            outcome,
        });
    }

    /// Executed and declined commands in arrival order.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}
