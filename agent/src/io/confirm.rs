//! Human approval gate consulted before every execution.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::Decision;

/// Blocking yes/no gate for a proposed command.
///
/// Implementations must not execute anything or touch session state; the
/// interaction itself is the only side effect. The call suspends the whole
/// loop until the human answers.
pub trait ConfirmationGate {
    /// Present `command` and block until the human answers.
    fn confirm(&mut self, command: &str) -> Result<Decision>;
}

/// Classify one line of human input.
///
/// Exactly the token `y` (any case, line terminator removed) approves.
/// Everything else declines, including empty input, `yes`, and padded
/// forms like `Y `: ambiguous input must never run a command, and there
/// is no re-prompt.
pub fn decision_from_reply(reply: &str) -> Decision {
    let line = reply.strip_suffix('\n').unwrap_or(reply);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.eq_ignore_ascii_case("y") {
        Decision::Approved
    } else {
        Decision::Declined
    }
}

/// Gate backed by the terminal: prompts on stdout, reads one line from
/// stdin.
pub struct StdinGate;

impl ConfirmationGate for StdinGate {
    fn confirm(&mut self, command: &str) -> Result<Decision> {
        let mut stdout = std::io::stdout();
        write!(stdout, "Execute '{command}'? [y/N]: ").context("write confirmation prompt")?;
        stdout.flush().context("flush confirmation prompt")?;

        let mut reply = String::new();
        let read = std::io::stdin()
            .read_line(&mut reply)
            .context("read confirmation reply")?;
        // Closed stdin fails closed.
        if read == 0 {
            return Ok(Decision::Declined);
        }
        let decision = decision_from_reply(&reply);
        debug!(command, ?decision, "confirmation received");
        Ok(decision)
    }
}
