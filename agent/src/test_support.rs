//! Test-only scripted doubles for the gate, runner, and chat backend.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::types::{Decision, ExecutionOutcome};
use crate::io::confirm::ConfirmationGate;
use crate::io::llm::{ChatBackend, ChatMessage, ToolDefinition};
use crate::io::process::CommandRunner;
use crate::io::session::SessionState;

/// Create a session rooted in a fresh scratch directory.
///
/// Keep the returned guard alive for the duration of the test; the
/// directory is removed when it drops.
pub fn scratch_session() -> (tempfile::TempDir, SessionState) {
    let temp = tempfile::tempdir().expect("tempdir");
    let session = SessionState::new(temp.path().to_path_buf()).expect("session");
    (temp, session)
}

/// Build an executed outcome with the given streams.
pub fn outcome(exit_code: i32, stdout: &str, stderr: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        executed: true,
        new_workdir: None,
    }
}

/// Gate that replays a fixed sequence of decisions and records what it was
/// asked about.
pub struct ScriptedGate {
    decisions: VecDeque<Decision>,
    pub seen: Vec<String>,
}

impl ScriptedGate {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: decisions.into(),
            seen: Vec::new(),
        }
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&mut self, command: &str) -> Result<Decision> {
        self.seen.push(command.to_string());
        self.decisions
            .pop_front()
            .ok_or_else(|| anyhow!("scripted gate exhausted"))
    }
}

/// Runner that replays fixed outcomes and records calls without spawning
/// any process.
pub struct ScriptedRunner {
    outcomes: RefCell<VecDeque<ExecutionOutcome>>,
    pub calls: RefCell<Vec<(String, PathBuf)>>,
}

impl ScriptedRunner {
    pub fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<ExecutionOutcome> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), cwd.to_path_buf()));
        self.outcomes
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted runner exhausted"))
    }
}

/// Backend that replays fixed assistant messages.
pub struct ScriptedBackend {
    replies: RefCell<VecDeque<ChatMessage>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ChatMessage>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
        }
    }
}

impl ChatBackend for ScriptedBackend {
    fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ChatMessage> {
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted backend exhausted"))
    }
}
