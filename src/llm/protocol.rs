//! Chat protocol shared by the orchestrator, the extractor and the model client

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A capability invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back on the tool result
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One entry of the running conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Set on assistant turns that requested capabilities
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call: &ToolCall, result: &Value) -> Self {
        Self {
            role: Role::Tool,
            content: result.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// Schema description of a capability offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A single model call
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// What the model did on one turn
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// No capability requests: `text` is the final answer
    Finalized { text: String },
    /// One or more capability requests; `text` is any reasoning emitted alongside
    ToolRequested { text: String, calls: Vec<ToolCall> },
}

impl ModelTurn {
    pub fn text(&self) -> &str {
        match self {
            ModelTurn::Finalized { text } | ModelTurn::ToolRequested { text, .. } => text,
        }
    }

    /// Build from raw response parts; an empty call list means finalized.
    pub fn from_parts(text: String, calls: Vec<ToolCall>) -> Self {
        if calls.is_empty() {
            ModelTurn::Finalized { text }
        } else {
            ModelTurn::ToolRequested { text, calls }
        }
    }
}
