use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Predicted match result.
///
/// Codes follow the 3/1/0 points convention used by the downstream consumers,
/// so they are intentionally not contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum PredictedOutcome {
    AwayWin,
    Draw,
    HomeWin,
}

impl PredictedOutcome {
    pub fn code(&self) -> i16 {
        match self {
            PredictedOutcome::AwayWin => 0,
            PredictedOutcome::Draw => 1,
            PredictedOutcome::HomeWin => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PredictedOutcome::AwayWin),
            1 => Some(PredictedOutcome::Draw),
            3 => Some(PredictedOutcome::HomeWin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictedOutcome::AwayWin => "AWAY_WIN",
            PredictedOutcome::Draw => "DRAW",
            PredictedOutcome::HomeWin => "HOME_WIN",
        }
    }
}

impl Default for PredictedOutcome {
    fn default() -> Self {
        PredictedOutcome::Draw
    }
}

impl From<PredictedOutcome> for i16 {
    fn from(outcome: PredictedOutcome) -> Self {
        outcome.code()
    }
}

impl TryFrom<i16> for PredictedOutcome {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        PredictedOutcome::from_code(code as i64)
            .ok_or_else(|| format!("invalid outcome code {code}"))
    }
}

impl std::fmt::Display for PredictedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized betting decision derived from a fundamentals report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Serialized as 0/1
    #[serde(with = "flag")]
    pub place_bet: bool,
    pub predicted_outcome: PredictedOutcome,
    /// Always within [0.0, 1.0]
    pub confidence: f64,
    /// `/`-separated evidence phrases; empty when nothing was extracted
    #[serde(default)]
    pub evidence_tags: String,
}

impl Default for Decision {
    fn default() -> Self {
        Self::no_bet()
    }
}

impl Decision {
    /// The decision used whenever nothing usable came back from the model
    pub fn no_bet() -> Self {
        Self {
            place_bet: false,
            predicted_outcome: PredictedOutcome::Draw,
            confidence: 0.0,
            evidence_tags: String::new(),
        }
    }

    /// Normalize a loosely-typed model payload.
    ///
    /// Never fails: every field falls back to its no-bet default when it is
    /// missing or has an unusable value. The legacy key names
    /// (`if_bet`, `predict_winner`, `key_tag_evidence`) are accepted as aliases.
    pub fn from_payload(payload: &Value) -> Self {
        let place_bet = field(payload, &["place_bet", "if_bet"])
            .map(equals_one)
            .unwrap_or(false);

        let predicted_outcome = field(payload, &["predicted_outcome", "predict_winner"])
            .and_then(as_number)
            .filter(|n| n.fract() == 0.0)
            .and_then(|n| PredictedOutcome::from_code(n as i64))
            .unwrap_or_default();

        let confidence = clamp_confidence(
            field(payload, &["confidence"])
                .and_then(as_number)
                .unwrap_or(0.0),
        );

        let evidence_tags = field(payload, &["evidence_tags", "key_tag_evidence"])
            .map(as_tags)
            .unwrap_or_default();

        Self {
            place_bet,
            predicted_outcome,
            confidence,
            evidence_tags,
        }
    }

    /// Evidence phrases as a list
    pub fn evidence(&self) -> Vec<&str> {
        self.evidence_tags
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Clamp into [0, 1]; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn field<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn equals_one(value: &Value) -> bool {
    as_number(value).map(|n| n == 1.0).unwrap_or(false)
}

fn as_tags(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(as_tags)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

mod flag {
    use super::*;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(equals_one(&value))
    }
}
