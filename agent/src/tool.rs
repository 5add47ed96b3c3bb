//! Execution tool facade: the one operation the model-facing loop invokes.

use anyhow::Result;
use tracing::info;

use crate::core::transcript::{DECLINE_NOTICE, format_outcome};
use crate::core::types::{Decision, ExecutionOutcome};
use crate::io::confirm::ConfirmationGate;
use crate::io::process::CommandRunner;
use crate::io::session::SessionState;

/// Run one proposed command through the confirmation gate.
///
/// Composes gate, runner, and session update, and renders the outcome as a
/// bounded text result for the conversation. Ordinary command failure
/// (non-zero exit) is a successfully reported outcome; only environment
/// and state-transition faults, and gate I/O faults, propagate. The caller
/// must surface those to the human and keep the loop alive.
pub fn invoke<G: ConfirmationGate, R: CommandRunner>(
    gate: &mut G,
    runner: &R,
    session: &mut SessionState,
    command: &str,
) -> Result<String> {
    if gate.confirm(command)? == Decision::Declined {
        info!(command, "user declined execution");
        session.record(command, ExecutionOutcome::declined());
        return Ok(DECLINE_NOTICE.to_string());
    }

    let outcome = runner.run(command, session.workdir())?;
    if let Some(new_workdir) = outcome.new_workdir.clone() {
        session.set_workdir(new_workdir)?;
    }
    let rendered = format_outcome(&outcome);
    session.record(command, outcome);
    Ok(rendered)
}
