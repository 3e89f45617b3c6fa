use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::Decision;

/// The persisted unit: one row per fixture, overwritten on re-evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub fixture_id: i64,
    pub report: String,
    #[serde(flatten)]
    pub decision: Decision,
    /// Set on first insert only
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write
    pub updated_at: DateTime<Utc>,
}

/// Per-fixture result of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub fixture_id: i64,
    #[serde(flatten)]
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredictedOutcome;
    use serde_json::json;

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = EvaluationOutcome {
            fixture_id: 101,
            decision: Decision {
                place_bet: false,
                predicted_outcome: PredictedOutcome::AwayWin,
                confidence: 0.4,
                evidence_tags: "x".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "fixture_id": 101,
                "place_bet": 0,
                "predicted_outcome": 0,
                "confidence": 0.4,
                "evidence_tags": "x"
            })
        );
    }
}
