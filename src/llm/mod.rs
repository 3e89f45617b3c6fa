//! Language model access
//!
//! - `protocol`: chat messages, tool calls and the closed `ModelTurn` result
//! - `client`: the `ChatModel` seam and its OpenAI-compatible implementation

pub mod client;
pub mod protocol;

#[cfg(test)]
pub use client::MockChatModel;
pub use client::{ensure_v1_base_url, ChatModel, OpenAiChatClient};
pub use protocol::{ChatMessage, ChatRequest, ModelTurn, Role, ToolCall, ToolSpec};
