//! Read-only data capabilities offered to the model during report generation
//!
//! A capability never fails from the caller's point of view: transport,
//! upstream and argument errors are logged and turned into the capability's
//! empty result so the model can decide what to do next.

pub mod football;

use crate::error::Result;
use crate::llm::{ToolCall, ToolSpec};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub use football::{football_capabilities, FootballCapability, FootballTool};

/// Shape of a capability's result, which decides what "empty" looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Record,
    List,
}

impl ResultShape {
    pub fn empty(&self) -> Value {
        match self {
            ResultShape::Record => Value::Object(Default::default()),
            ResultShape::List => Value::Array(Vec::new()),
        }
    }
}

/// A named, schema-described data retrieval operation
#[async_trait]
pub trait Capability: Send + Sync {
    fn spec(&self) -> ToolSpec;

    fn shape(&self) -> ResultShape;

    async fn invoke(&self, args: &Value) -> Result<Value>;
}

/// The fixed set of capabilities available to one orchestrator
#[derive(Clone, Default)]
pub struct CapabilitySet {
    entries: Vec<Arc<dyn Capability>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    /// Register a capability, replacing any existing one with the same name
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.spec().name;
        self.entries.retain(|existing| existing.spec().name != name);
        self.entries.push(capability);
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.entries.iter().map(|c| c.spec()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.spec().name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.entries.iter().find(|c| c.spec().name == name)
    }

    /// Invoke one requested capability
    pub async fn invoke(&self, call: &ToolCall) -> Value {
        let Some(capability) = self.find(&call.name) else {
            warn!(tool = %call.name, "Model requested unknown capability");
            return ResultShape::Record.empty();
        };

        match capability.invoke(&call.arguments).await {
            Ok(value) => {
                debug!(tool = %call.name, "Capability returned");
                value
            }
            Err(e) => {
                warn!(tool = %call.name, args = %call.arguments, "Capability failed: {}", e);
                capability.shape().empty()
            }
        }
    }

    /// Invoke every call of one model turn concurrently; results keep call order
    pub async fn invoke_all(&self, calls: &[ToolCall]) -> Vec<Value> {
        join_all(calls.iter().map(|call| self.invoke(call))).await
    }
}
