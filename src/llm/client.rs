//! OpenAI-compatible chat completions client with function calling
//!
//! Works against any backend that speaks the `/v1/chat/completions` wire
//! format (OpenAI, Azure-style proxies, self-hosted gateways).

use crate::config::LlmConfig;
use crate::error::{AnalystError, Result};
use crate::llm::protocol::{ChatMessage, ChatRequest, ModelTurn, Role, ToolCall, ToolSpec};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// A chat model that can answer or request capability invocations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ModelTurn>;
}

/// Append `/v1` to a base URL unless it already ends with it
pub fn ensure_v1_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        let tool_calls = if msg.tool_calls.is_empty() {
            None
        } else {
            Some(
                msg.tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: function_type(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        };

        // Assistant turns that only carry tool calls send a null content
        let content = if msg.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(msg.content.clone())
        };

        Self {
            role: msg.role,
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl WireMessage {
    fn into_turn(self) -> ModelTurn {
        let calls = self
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: parse_arguments(&call.function.arguments),
            })
            .collect();
        ModelTurn::from_parts(self.content.unwrap_or_default(), calls)
    }
}

/// Decode a function-call argument string; undecodable text is passed on as a
/// JSON string so the capability rejects it instead of the whole turn failing.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Chat completions client
pub struct OpenAiChatClient {
    base_url: String,
    api_key: String,
    model: String,
    http: Client,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalystError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: ensure_v1_base_url(&config.base_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ModelTurn> {
        let body = WireRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request
                .tools
                .iter()
                .map(|spec| WireTool {
                    kind: "function",
                    function: spec,
                })
                .collect(),
            temperature: request.temperature,
        };

        debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Chat completion error: {} - {}", status, body);
            return Err(AnalystError::UpstreamStatus {
                service: "llm".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| AnalystError::Model(format!("Failed to parse chat response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnalystError::Model("chat response had no choices".to_string()))?;

        let turn = choice.message.into_turn();
        debug!(
            chars = turn.text().len(),
            tool_request = matches!(turn, ModelTurn::ToolRequested { .. }),
            "Chat completion received"
        );
        Ok(turn)
    }
}
