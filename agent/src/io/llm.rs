//! OpenAI-compatible chat completions client with function calling.
//!
//! The [`ChatBackend`] trait decouples the conversation loop from the
//! actual model endpoint. Tests use scripted backends that return
//! predetermined messages without network access.

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::io::config::AgentConfig;

/// A message in the chat wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Result message answering one tool call.
    pub fn tool(tool_call_id: String, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id),
        }
    }
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_call_type() -> String {
    "function".to_string()
}

/// Function call details from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Function definition within a tool.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Name of the single tool this assistant advertises.
pub const EXEC_TOOL_NAME: &str = "execute_command";

/// The one tool: run a shell command after asking the human.
pub fn exec_tool_definition() -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: EXEC_TOOL_NAME.to_string(),
            description: "Execute a shell command after asking the human for confirmation. \
                 Returns the command's output, or a notice that the user declined."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute."
                    }
                },
                "required": ["command"]
            }),
        },
    }
}

/// Arguments of an `execute_command` call.
#[derive(Debug, Deserialize)]
pub struct ExecArguments {
    pub command: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: &'a [ToolDefinition],
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Abstraction over the model backend.
pub trait ChatBackend {
    /// Request the next assistant message for the conversation so far.
    fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ChatMessage>;
}

/// Blocking HTTP client for an OpenAI-compatible endpoint.
pub struct ChatClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    top_p: f64,
}

impl ChatClient {
    /// Build a client from config; the API key is read from the
    /// environment variable the config names.
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let api_key = if config.api_key_env.is_empty() {
            None
        } else {
            std::env::var(&config.api_key_env).ok()
        };
        let http = reqwest::blocking::Client::builder()
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }
}

impl ChatBackend for ChatClient {
    fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
            temperature: self.temperature,
            top_p: self.top_p,
        };
        debug!(url = %url, model = %self.model, messages = messages.len(), "requesting completion");

        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().context("send chat request")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("chat endpoint returned {status}: {body}");
        }
        let parsed: ChatResponse = response.json().context("parse chat response")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat response contained no choices"))?;
        Ok(choice.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_tool_definitions() {
        let messages = vec![ChatMessage::system("prompt")];
        let tools = vec![exec_tool_definition()];
        let request = ChatRequest {
            model: "test-model",
            messages: &messages,
            tools: &tools,
            temperature: 0.2,
            top_p: 1.0,
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], EXEC_TOOL_NAME);
        assert_eq!(
            value["tools"][0]["function"]["parameters"]["required"][0],
            "command"
        );
    }

    #[test]
    fn tool_messages_carry_the_call_id() {
        let message = ChatMessage::tool("call-1".to_string(), "ok".to_string());
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call-1");
        // Empty tool_calls must not be serialized at all.
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn response_with_tool_calls_deserializes() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call-1",
                        "type": "function",
                        "function": {
                            "name": "execute_command",
                            "arguments": "{\"command\":\"pwd\"}"
                        }
                    }]
                }
            }]
        }"#;

        let parsed: ChatResponse = serde_json::from_str(raw).expect("parse");
        let message = &parsed.choices[0].message;
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function.name, EXEC_TOOL_NAME);

        let args: ExecArguments =
            serde_json::from_str(&message.tool_calls[0].function.arguments).expect("args");
        assert_eq!(args.command, "pwd");
    }

    #[test]
    fn plain_text_response_deserializes() {
        let raw = r#"{
            "choices": [{
                "message": { "role": "assistant", "content": "All done." }
            }]
        }"#;

        let parsed: ChatResponse = serde_json::from_str(raw).expect("parse");
        let message = &parsed.choices[0].message;
        assert_eq!(message.content.as_deref(), Some("All done."));
        assert!(message.tool_calls.is_empty());
    }
}
