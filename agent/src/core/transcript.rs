//! Stable text form of an execution outcome for the model-facing protocol.
//!
//! The formatted blob is the tool result the model reads; the order of
//! sections is fixed so a model can rely on it.

use crate::core::types::ExecutionOutcome;

/// Fixed notice returned when the human refuses a command.
///
/// Distinct from any formatted outcome so the model never mistakes a
/// decline for an empty successful run.
pub const DECLINE_NOTICE: &str = "The user declined the execution of this command.";

const STDOUT_MARKER: &str = "=== stdout ===\n";
const STDERR_MARKER: &str = "\n=== stderr ===\n";

/// Render an outcome as the stable three-section transcript blob.
///
/// Layout: `exit_code: <n>`, a stdout section, a stderr section, streams
/// verbatim.
pub fn format_outcome(outcome: &ExecutionOutcome) -> String {
    format!(
        "exit_code: {}\n{STDOUT_MARKER}{}{STDERR_MARKER}{}",
        outcome.exit_code, outcome.stdout, outcome.stderr
    )
}

/// Recover exit code, stdout, and stderr from a formatted transcript.
///
/// Anchors on the last stderr marker, so stdout that happens to contain
/// marker-looking text still round-trips. Captured stderr only ever gains
/// appended notices, never raw markers.
pub fn parse_outcome(text: &str) -> Option<ExecutionOutcome> {
    let rest = text.strip_prefix("exit_code: ")?;
    let (code_line, rest) = rest.split_once('\n')?;
    let exit_code: i32 = code_line.parse().ok()?;
    let body = rest.strip_prefix(STDOUT_MARKER)?;
    let split = body.rfind(STDERR_MARKER)?;
    Some(ExecutionOutcome {
        exit_code,
        stdout: body[..split].to_string(),
        stderr: body[split + STDERR_MARKER.len()..].to_string(),
        executed: true,
        new_workdir: None,
    })
}
