//! Decision extraction
//!
//! Condenses a fundamentals report into a `Decision` with one model call.
//! Extraction never fails: any model or parse problem yields the no-bet
//! decision.

use crate::domain::Decision;
use crate::error::{AnalystError, Result};
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const EXTRACTION_PROMPT: &str = "You are a highly constrained football betting analyst. Your sole \
task is to read the provided Markdown fundamentals report and output the prediction data. \
STRICTLY follow these rules: \
1. Output MUST be a single-line, valid JSON object. \
2. DO NOT include any markdown, code fences, explanations or preamble. \
3. Keep the home team and the away team apart; never mix the two up. \
4. Use exactly these keys: \
'place_bet': integer (1 = bet, 0 = no bet); \
'predicted_outcome': integer (3 = home win, 1 = draw, 0 = away win); \
'confidence': float between 0.0 and 1.0; \
'evidence_tags': string of short evidence phrases separated by '/', \
e.g. 'home side highly motivated/away striker injured/home defence solid'. \
Example output: {\"place_bet\":1,\"predicted_outcome\":3,\"confidence\":0.72,\"evidence_tags\":\"strong home form/away injuries\"}";

/// Turns a report into a decision
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn extract(&self, fixture_id: i64, report: &str) -> Decision;
}

pub struct DecisionExtractor {
    model: Arc<dyn ChatModel>,
    temperature: Option<f32>,
}

impl DecisionExtractor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    async fn try_extract(&self, fixture_id: i64, report: &str) -> Result<Decision> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(EXTRACTION_PROMPT),
            ChatMessage::user(format!("Fixture {fixture_id} report:\n\n{report}")),
        ])
        .with_temperature(self.temperature);

        let turn = self.model.complete(&request).await?;
        let payload = parse_decision_payload(turn.text())?;
        Ok(Decision::from_payload(&payload))
    }
}

#[async_trait]
impl DecisionSource for DecisionExtractor {
    async fn extract(&self, fixture_id: i64, report: &str) -> Decision {
        match self.try_extract(fixture_id, report).await {
            Ok(decision) => {
                info!(
                    fixture_id,
                    place_bet = decision.place_bet,
                    predicted_outcome = decision.predicted_outcome.code(),
                    confidence = decision.confidence,
                    evidence = %decision.evidence_tags,
                    "Decision extracted"
                );
                decision
            }
            Err(e) => {
                warn!(fixture_id, "Decision extraction failed, using no-bet default: {}", e);
                Decision::no_bet()
            }
        }
    }
}

/// Parse the model's answer as a JSON object.
///
/// Tries the trimmed text first, then the span from the first `{` to the
/// last `}` (which recovers answers wrapped in prose or code fences).
pub fn parse_decision_payload(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Ok(value);
        }
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            debug!("Recovering decision JSON from surrounding text");
            let value: Value = serde_json::from_str(&trimmed[start..=end])?;
            if value.is_object() {
                Ok(value)
            } else {
                Err(AnalystError::Validation("decision payload is not an object".into()))
            }
        }
        _ => Err(AnalystError::Validation(format!(
            "no JSON object in model output: {}",
            truncate(trimmed, 120)
        ))),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
