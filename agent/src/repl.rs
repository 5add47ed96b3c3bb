//! Interactive conversation loop around the execution tool.
//!
//! One turn is fully resolved (model reply, confirmations, executions,
//! state updates) before the next line of input is read. The confirmation
//! gate's blocking read is the sole suspension point.

use std::io::Write;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::io::confirm::ConfirmationGate;
use crate::io::llm::{
    ChatBackend, ChatMessage, EXEC_TOOL_NAME, ExecArguments, ToolDefinition, exec_tool_definition,
};
use crate::io::process::CommandRunner;
use crate::io::session::SessionState;
use crate::tool;

const SEPARATOR_WIDTH: usize = 80;

/// The conversation loop's working set: model backend, gated execution,
/// session state, and message history.
pub struct Repl<B, G, R> {
    backend: B,
    gate: G,
    runner: R,
    session: SessionState,
    messages: Vec<ChatMessage>,
    tools: Vec<ToolDefinition>,
    max_tool_rounds: u32,
}

impl<B: ChatBackend, G: ConfirmationGate, R: CommandRunner> Repl<B, G, R> {
    pub fn new(
        backend: B,
        gate: G,
        runner: R,
        session: SessionState,
        system_prompt: &str,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            backend,
            gate,
            runner,
            session,
            messages: vec![ChatMessage::system(system_prompt)],
            tools: vec![exec_tool_definition()],
            max_tool_rounds,
        }
    }

    /// Directory shown in the prompt; delegates to session state.
    pub fn workdir_display(&self) -> String {
        self.session.workdir().display().to_string()
    }

    /// Run one conversational turn and return the assistant's final text.
    ///
    /// On error the message history is rolled back to the turn start, so a
    /// failed turn leaves no half-answered tool calls behind and the next
    /// turn starts from a consistent conversation.
    pub fn take_turn(&mut self, input: &str) -> Result<String> {
        let checkpoint = self.messages.len();
        match self.turn_inner(input) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                self.messages.truncate(checkpoint);
                Err(err)
            }
        }
    }

    fn turn_inner(&mut self, input: &str) -> Result<String> {
        // The model's next command should always be directory-aware.
        let contextual = format!(
            "{input}\nCurrent working directory: `{}`",
            self.session.workdir().display()
        );
        self.messages.push(ChatMessage::user(contextual));

        for round in 0..self.max_tool_rounds {
            let reply = self.backend.complete(&self.messages, &self.tools)?;

            if reply.tool_calls.is_empty() {
                let text = reply.content.clone().unwrap_or_default();
                self.messages.push(reply);
                return Ok(strip_think(&text).to_string());
            }

            debug!(round, calls = reply.tool_calls.len(), "model requested tools");
            let calls = reply.tool_calls.clone();
            self.messages.push(reply);
            for call in calls {
                let result = self.dispatch(&call.function.name, &call.function.arguments)?;
                self.messages.push(ChatMessage::tool(call.id, result));
            }
        }
        Err(anyhow!(
            "turn exceeded {} tool rounds without a final answer",
            self.max_tool_rounds
        ))
    }

    fn dispatch(&mut self, name: &str, arguments: &str) -> Result<String> {
        if name != EXEC_TOOL_NAME {
            // Unknown tool names are reported back to the model rather
            // than aborting the turn.
            warn!(name, "model requested unknown tool");
            return Ok(format!("Unknown tool: {name}"));
        }
        let args: ExecArguments = serde_json::from_str(arguments)
            .with_context(|| format!("parse {EXEC_TOOL_NAME} arguments"))?;
        tool::invoke(&mut self.gate, &self.runner, &mut self.session, &args.command)
    }

    #[cfg(test)]
    fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Drop reasoning markup some models emit before their visible answer.
fn strip_think(text: &str) -> &str {
    match text.rsplit_once("</think>") {
        Some((_, rest)) => rest.trim(),
        None => text.trim(),
    }
}

/// Drive the conversation over the terminal until the human quits.
///
/// `quit` (any case) exits; empty lines re-prompt; any other line is a
/// turn. Every turn error prints one diagnostic line and the loop
/// continues; only `quit` or EOF ends the session.
pub fn run_loop<B: ChatBackend, G: ConfirmationGate, R: CommandRunner>(
    mut repl: Repl<B, G, R>,
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        write!(stdout, "[{}]> ", repl.workdir_display()).context("write prompt")?;
        stdout.flush().context("flush prompt")?;

        let mut line = String::new();
        let read = stdin.read_line(&mut line).context("read input")?;
        if read == 0 {
            // EOF behaves like quit.
            return Ok(());
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") {
            return Ok(());
        }

        match repl.take_turn(input) {
            Ok(reply) => {
                if !reply.is_empty() {
                    writeln!(stdout, "{reply}").context("write reply")?;
                }
            }
            Err(err) => {
                writeln!(stdout, "Error: {err:#}").context("write error")?;
            }
        }
        writeln!(stdout, "{}", "-".repeat(SEPARATOR_WIDTH)).context("write separator")?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::DECLINE_NOTICE;
    use crate::core::types::Decision;
    use crate::io::session::InvalidStateTransition;
    use crate::test_support::{ScriptedBackend, ScriptedGate, ScriptedRunner, outcome, scratch_session};

    fn tool_call_reply(command: &str) -> ChatMessage {
        ChatMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: vec![crate::io::llm::ToolCall {
                id: "call-1".to_string(),
                call_type: "function".to_string(),
                function: crate::io::llm::FunctionCall {
                    name: EXEC_TOOL_NAME.to_string(),
                    arguments: format!("{{\"command\":{}}}", serde_json::to_string(command).unwrap()),
                },
            }],
            tool_call_id: None,
        }
    }

    fn text_reply(text: &str) -> ChatMessage {
        ChatMessage {
            role: "assistant".to_string(),
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn repl_with(
        replies: Vec<ChatMessage>,
        decisions: Vec<Decision>,
        outcomes: Vec<crate::core::types::ExecutionOutcome>,
    ) -> (Repl<ScriptedBackend, ScriptedGate, ScriptedRunner>, tempfile::TempDir) {
        let (temp, session) = scratch_session();
        let repl = Repl::new(
            ScriptedBackend::new(replies),
            ScriptedGate::new(decisions),
            ScriptedRunner::new(outcomes),
            session,
            "system prompt",
            4,
        );
        (repl, temp)
    }

    #[test]
    fn plain_turn_returns_the_assistant_text() {
        let (mut repl, _temp) = repl_with(vec![text_reply("Hello there.")], vec![], vec![]);
        let reply = repl.take_turn("hi").expect("turn");
        assert_eq!(reply, "Hello there.");
    }

    #[test]
    fn user_turns_carry_the_working_directory() {
        let (mut repl, temp) = repl_with(vec![text_reply("ok")], vec![], vec![]);
        repl.take_turn("list files").expect("turn");

        let canonical = temp.path().canonicalize().expect("canonicalize");
        let user = &repl.messages[1];
        let content = user.content.as_deref().expect("content");
        assert!(content.starts_with("list files\n"));
        assert!(content.contains(&format!("Current working directory: `{}`", canonical.display())));
    }

    #[test]
    fn tool_round_feeds_the_result_back_and_finishes() {
        let (mut repl, _temp) = repl_with(
            vec![tool_call_reply("echo hi"), text_reply("It printed hi.")],
            vec![Decision::Approved],
            vec![outcome(0, "hi\n", "")],
        );

        let reply = repl.take_turn("say hi via echo").expect("turn");
        assert_eq!(reply, "It printed hi.");

        // system, user, assistant(tool_calls), tool, assistant(final)
        assert_eq!(repl.message_count(), 5);
        let tool_msg = &repl.messages[3];
        assert_eq!(tool_msg.role, "tool");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));
        assert!(tool_msg.content.as_deref().expect("content").starts_with("exit_code: 0"));
    }

    #[test]
    fn declined_tool_call_reports_the_sentinel_to_the_model() {
        let (mut repl, _temp) = repl_with(
            vec![tool_call_reply("rm -rf /"), text_reply("Understood, skipping.")],
            vec![Decision::Declined],
            vec![],
        );

        let reply = repl.take_turn("clean up").expect("turn");
        assert_eq!(reply, "Understood, skipping.");
        assert_eq!(repl.messages[3].content.as_deref(), Some(DECLINE_NOTICE));
    }

    #[test]
    fn failed_turn_rolls_the_conversation_back() {
        let (_temp, session) = scratch_session();
        let mut repl = Repl::new(
            ScriptedBackend::new(vec![tool_call_reply("cd /does/not/exist")]),
            ScriptedGate::new(vec![Decision::Approved]),
            crate::io::process::ShellRunner::default(),
            session,
            "system prompt",
            4,
        );
        let before = repl.message_count();

        let err = repl.take_turn("go somewhere bad").unwrap_err();
        assert!(err.downcast_ref::<InvalidStateTransition>().is_some());
        assert_eq!(repl.message_count(), before);
    }

    #[test]
    fn runaway_tool_rounds_are_bounded() {
        let (mut repl, _temp) = repl_with(
            vec![
                tool_call_reply("echo 1"),
                tool_call_reply("echo 2"),
                tool_call_reply("echo 3"),
                tool_call_reply("echo 4"),
            ],
            vec![Decision::Approved; 4],
            vec![
                outcome(0, "1\n", ""),
                outcome(0, "2\n", ""),
                outcome(0, "3\n", ""),
                outcome(0, "4\n", ""),
            ],
        );

        let err = repl.take_turn("loop forever").unwrap_err();
        assert!(err.to_string().contains("tool rounds"));
    }

    #[test]
    fn unknown_tools_are_reported_not_fatal() {
        let (mut repl, _temp) = repl_with(
            vec![
                ChatMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: vec![crate::io::llm::ToolCall {
                        id: "call-9".to_string(),
                        call_type: "function".to_string(),
                        function: crate::io::llm::FunctionCall {
                            name: "launch_missiles".to_string(),
                            arguments: "{}".to_string(),
                        },
                    }],
                    tool_call_id: None,
                },
                text_reply("That tool does not exist."),
            ],
            vec![],
            vec![],
        );

        let reply = repl.take_turn("do something odd").expect("turn");
        assert_eq!(reply, "That tool does not exist.");
        assert_eq!(
            repl.messages[3].content.as_deref(),
            Some("Unknown tool: launch_missiles")
        );
    }

    #[test]
    fn think_markup_is_stripped_from_final_replies() {
        assert_eq!(strip_think("<think>hmm</think>\nThe answer."), "The answer.");
        assert_eq!(strip_think("  plain  "), "plain");
    }
}
