//! Tool-loop orchestrator
//!
//! Alternates between asking the model to reason and executing the
//! capabilities it requests, until the model answers without tool calls:
//!
//! ```text
//! Reason --(tool calls)--> ExecuteTools --> Reason
//! Reason --(no tool calls)--> Finalize
//! Reason --(round cap / deadline)--> Finalize (best-effort text)
//! ```

pub mod prompt;

use crate::capabilities::CapabilitySet;
use crate::config::{LlmConfig, PipelineConfig};
use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, ModelTurn, ToolCall};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, warn};

/// Produces the fundamentals report for a fixture
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Returns the report text, which may be empty when the model produced none
    async fn generate_report(&self, fixture_id: i64) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum model calls per report
    pub max_rounds: u32,
    /// Wall-clock budget for the whole loop
    pub deadline: Duration,
    pub temperature: Option<f32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 8,
            deadline: Duration::from_secs(300),
            temperature: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(llm: &LlmConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            max_rounds: pipeline.max_tool_rounds.max(1),
            deadline: pipeline.report_deadline(),
            temperature: llm.temperature,
        }
    }
}

enum LoopState {
    Reason,
    ExecuteTools(Vec<ToolCall>),
    Finalize { text: String, forced: bool },
}

pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    capabilities: Arc<CapabilitySet>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        capabilities: Arc<CapabilitySet>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            model,
            capabilities,
            config,
        }
    }

    #[instrument(skip(self), fields(max_rounds = self.config.max_rounds))]
    async fn run_loop(&self, fixture_id: i64) -> Result<String> {
        let started = Instant::now();
        let tools = self.capabilities.specs();
        let mut transcript = vec![
            ChatMessage::system(prompt::system_prompt(&tools, fixture_id)),
            ChatMessage::user(prompt::user_prompt(fixture_id)),
        ];
        let mut best_effort = String::new();
        let mut rounds = 0u32;
        let mut tool_calls = 0usize;
        let mut state = LoopState::Reason;

        let (report, forced) = loop {
            state = match state {
                LoopState::Reason => {
                    if rounds >= self.config.max_rounds {
                        warn!(fixture_id, rounds, "Tool round cap reached, finalizing");
                        LoopState::Finalize {
                            text: best_effort.clone(),
                            forced: true,
                        }
                    } else {
                        match self.config.deadline.checked_sub(started.elapsed()) {
                            None => {
                                warn!(fixture_id, rounds, "Report deadline passed, finalizing");
                                LoopState::Finalize {
                                    text: best_effort.clone(),
                                    forced: true,
                                }
                            }
                            Some(remaining) => {
                                let request = ChatRequest::new(transcript.clone())
                                    .with_tools(tools.clone())
                                    .with_temperature(self.config.temperature);
                                rounds += 1;
                                match timeout(remaining, self.model.complete(&request)).await {
                                    Err(_) => {
                                        warn!(
                                            fixture_id,
                                            rounds, "Model call hit report deadline, finalizing"
                                        );
                                        LoopState::Finalize {
                                            text: best_effort.clone(),
                                            forced: true,
                                        }
                                    }
                                    Ok(turn) => match turn? {
                                        ModelTurn::Finalized { text } => LoopState::Finalize {
                                            text,
                                            forced: false,
                                        },
                                        ModelTurn::ToolRequested { text, calls } => {
                                            if !text.trim().is_empty() {
                                                best_effort = text.clone();
                                            }
                                            if rounds >= self.config.max_rounds {
                                                // No round left to read the results
                                                warn!(
                                                    fixture_id,
                                                    rounds, "Tool round cap reached, finalizing"
                                                );
                                                LoopState::Finalize {
                                                    text: best_effort.clone(),
                                                    forced: true,
                                                }
                                            } else {
                                                transcript.push(
                                                    ChatMessage::assistant_with_tools(
                                                        text,
                                                        calls.clone(),
                                                    ),
                                                );
                                                LoopState::ExecuteTools(calls)
                                            }
                                        }
                                    },
                                }
                            }
                        }
                    }
                }
                LoopState::ExecuteTools(calls) => {
                    debug!(
                        fixture_id,
                        round = rounds,
                        tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                        "Executing capabilities"
                    );
                    let results = self.capabilities.invoke_all(&calls).await;
                    tool_calls += calls.len();
                    for (call, result) in calls.iter().zip(results.iter()) {
                        transcript.push(ChatMessage::tool_result(call, result));
                    }
                    LoopState::Reason
                }
                LoopState::Finalize { text, forced } => break (text, forced),
            };
        };

        // The transcript holds raw capability payloads; only the report leaves here
        drop(transcript);

        info!(
            fixture_id,
            chars = report.len(),
            rounds,
            tool_calls,
            forced,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report generated"
        );
        Ok(report)
    }
}

#[async_trait]
impl ReportGenerator for Orchestrator {
    async fn generate_report(&self, fixture_id: i64) -> Result<String> {
        self.run_loop(fixture_id).await
    }
}
