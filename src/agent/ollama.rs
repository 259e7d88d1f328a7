//! Tool-calling agent backed by a local Ollama server

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Responder;
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::{Error, Result};

/// Default Ollama server address
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Upper bound on model/tool round trips per command
const MAX_ITERATIONS_CAP: u32 = 20;

/// Request timeout for a single chat call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-block pattern"));

/// A chat message in Ollama's format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// `system`, `user`, `assistant` or `tool`
    pub role: String,
    /// Text content
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool that produced this message (role `tool`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_owned(),
            content: content.to_owned(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    /// System instruction
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new("system", content)
    }

    /// User turn
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new("user", content)
    }

    /// Tool result
    #[must_use]
    pub fn tool(name: &str, content: &str) -> Self {
        Self {
            tool_name: Some(name.to_owned()),
            ..Self::new("tool", content)
        }
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Function to call
    pub function: FunctionCall,
}

/// Function name and arguments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Tool name
    pub name: String,
    /// Arguments object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    think: bool,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Agent that answers through Ollama's chat API and runs tool calls locally
#[derive(Debug)]
pub struct OllamaAgent {
    client: reqwest::Client,
    base_url: String,
    model: String,
    system_prompt: String,
    think: bool,
    max_iterations: u32,
    tools: ToolRegistry,
    definitions: Vec<ToolDefinition>,
}

impl OllamaAgent {
    /// Create an agent
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, model: &str, system_prompt: &str, tools: ToolRegistry) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        let definitions = tools.definitions();

        tracing::debug!(
            base_url,
            model,
            tools = ?tools.names(),
            "ollama agent initialized"
        );

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            think: false,
            max_iterations: 5,
            tools,
            definitions,
        })
    }

    /// Enable or disable model reasoning output
    #[must_use]
    pub const fn with_think(mut self, think: bool) -> Self {
        self.think = think;
        self
    }

    /// Limit model/tool round trips per command
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.clamp(1, MAX_ITERATIONS_CAP);
        self
    }

    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat request and return the assistant message
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            think: self.think,
            tools: &self.definitions,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("ollama request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).map_or(body, |e| e.error);
            return Err(Error::Agent(format!("ollama error {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("failed to parse ollama response: {e}")))?;

        Ok(parsed.message)
    }
}

#[async_trait]
impl Responder for OllamaAgent {
    async fn respond(&self, command: &str) -> Result<String> {
        let mut messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(command),
        ];

        for turn in 0..self.max_iterations {
            let reply = self.chat(&messages).await?;

            if reply.tool_calls.is_empty() {
                let text = clean_reply(&reply.content);
                if text.is_empty() {
                    return Err(Error::Agent("model returned an empty reply".to_string()));
                }
                tracing::debug!(turn, response_len = text.len(), "agent responded");
                return Ok(text);
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in calls {
                let name = call.function.name;
                let result = self
                    .tools
                    .execute(&name, call.function.arguments)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(tool = %name, error = %e, "tool call failed");
                        format!("Error: {e}")
                    });

                tracing::info!(tool = %name, turn, "tool called");
                messages.push(ChatMessage::tool(&name, &result));
            }
        }

        Err(Error::Agent(format!(
            "no final answer after {} tool rounds",
            self.max_iterations
        )))
    }
}

/// Strip reasoning blocks and surrounding whitespace from model output
#[must_use]
pub fn clean_reply(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}
