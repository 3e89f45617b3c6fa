// API-Football (api-sports.io v3) integration
// Fixtures, standings, head-to-head, injuries and bookmaker odds

use crate::config::FootballConfig;
use crate::domain::{FixtureRef, TeamRef};
use crate::error::{AnalystError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_HOST: &str = "v3.football.api-sports.io";

/// API-Football REST client
pub struct ApiFootballClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiFootballClient {
    pub fn new(config: &FootballConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AnalystError::Validation(
                "football.api_key not configured".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalystError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// GET an endpoint and return its `response` array
    pub async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("API-Football request {} {:?}", endpoint, params);

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", API_HOST)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("API-Football error: {} - {}", status, body);
            return Err(AnalystError::UpstreamStatus {
                service: "api-football".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        unwrap_response(body)
    }

    /// All fixtures scheduled on a UTC calendar date
    pub async fn fixtures_by_date(&self, date: NaiveDate) -> Result<Vec<Value>> {
        let fixtures = self
            .get(
                "/fixtures",
                &[
                    ("date", date.format("%Y-%m-%d").to_string()),
                    ("timezone", "UTC".to_string()),
                ],
            )
            .await?;
        info!("Fetched {} fixtures for {}", fixtures.len(), date);
        Ok(fixtures)
    }

    pub async fn fixture_by_id(&self, fixture_id: i64) -> Result<Option<Value>> {
        let mut fixtures = self
            .get("/fixtures", &[("id", fixture_id.to_string())])
            .await?;
        Ok(if fixtures.is_empty() {
            None
        } else {
            Some(fixtures.swap_remove(0))
        })
    }

    pub async fn standings(&self, league_id: i64, season: i64, team_id: i64) -> Result<Vec<Value>> {
        self.get(
            "/standings",
            &[
                ("league", league_id.to_string()),
                ("season", season.to_string()),
                ("team", team_id.to_string()),
            ],
        )
        .await
    }

    pub async fn head_to_head(&self, home_id: i64, away_id: i64, last: u32) -> Result<Vec<Value>> {
        self.get(
            "/fixtures/headtohead",
            &[
                ("h2h", format!("{}-{}", home_id, away_id)),
                ("last", last.to_string()),
                ("timezone", "UTC".to_string()),
            ],
        )
        .await
    }

    pub async fn team_last_fixtures(&self, team_id: i64, last: u32) -> Result<Vec<Value>> {
        self.get(
            "/fixtures",
            &[
                ("team", team_id.to_string()),
                ("last", last.to_string()),
                ("timezone", "UTC".to_string()),
            ],
        )
        .await
    }

    pub async fn injuries(&self, fixture_id: i64) -> Result<Vec<Value>> {
        self.get(
            "/injuries",
            &[
                ("fixture", fixture_id.to_string()),
                ("timezone", "UTC".to_string()),
            ],
        )
        .await
    }

    pub async fn odds(&self, fixture_id: i64) -> Result<Vec<Value>> {
        self.get("/odds", &[("fixture", fixture_id.to_string())]).await
    }
}

/// Pull the `response` array out of an API envelope.
///
/// The API reports quota and parameter problems with HTTP 200 and a
/// non-empty `errors` member.
fn unwrap_response(mut body: Value) -> Result<Vec<Value>> {
    let has_errors = match body.get("errors") {
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        _ => false,
    };
    if has_errors {
        return Err(AnalystError::Capability(format!(
            "API-Football rejected request: {}",
            body["errors"]
        )));
    }

    match body.get_mut("response").map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Ok(vec![other]),
    }
}

/// Convert one `/fixtures` entry into a fixture reference
pub fn fixture_ref_from_api(raw: &Value) -> Option<FixtureRef> {
    let kickoff = raw
        .pointer("/fixture/date")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            raw.pointer("/fixture/timestamp")
                .and_then(Value::as_i64)
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        })?;

    Some(FixtureRef {
        fixture_id: raw.pointer("/fixture/id")?.as_i64()?,
        league_id: raw.pointer("/league/id")?.as_i64()?,
        league_name: str_at(raw, "/league/name"),
        season: raw.pointer("/league/season")?.as_i64()? as i32,
        round: str_at(raw, "/league/round"),
        kickoff,
        status: str_at(raw, "/fixture/status/short"),
        home: TeamRef {
            id: raw.pointer("/teams/home/id")?.as_i64()?,
            name: str_at(raw, "/teams/home/name").unwrap_or_default(),
        },
        away: TeamRef {
            id: raw.pointer("/teams/away/id")?.as_i64()?,
            name: str_at(raw, "/teams/away/name").unwrap_or_default(),
        },
    })
}

fn str_at(raw: &Value, pointer: &str) -> Option<String> {
    raw.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_fixture() -> Value {
        json!({
            "fixture": {
                "id": 1347805,
                "timezone": "UTC",
                "date": "2025-03-08T15:00:00+00:00",
                "timestamp": 1741446000,
                "venue": {"id": 556, "name": "Old Trafford", "city": "Manchester"},
                "status": {"long": "Not Started", "short": "NS", "elapsed": null}
            },
            "league": {"id": 39, "name": "Premier League", "country": "England", "season": 2024, "round": "Regular Season - 28"},
            "teams": {
                "home": {"id": 33, "name": "Manchester United", "winner": null},
                "away": {"id": 42, "name": "Arsenal", "winner": null}
            },
            "goals": {"home": null, "away": null}
        })
    }

    #[test]
    fn test_unwrap_response() {
        let items = unwrap_response(json!({"errors": [], "response": [1, 2]})).unwrap();
        assert_eq!(items.len(), 2);

        let empty = unwrap_response(json!({"errors": {}, "results": 0})).unwrap();
        assert!(empty.is_empty());

        let err = unwrap_response(
            json!({"errors": {"rateLimit": "Too many requests"}, "response": []}),
        );
        assert!(matches!(err, Err(AnalystError::Capability(_))));
    }

    #[test]
    fn test_fixture_ref_from_api() {
        let fixture = fixture_ref_from_api(&sample_fixture()).unwrap();
        assert_eq!(fixture.fixture_id, 1347805);
        assert_eq!(fixture.league_id, 39);
        assert_eq!(fixture.season, 2024);
        assert_eq!(fixture.home.name, "Manchester United");
        assert_eq!(fixture.away.id, 42);
        assert_eq!(fixture.status.as_deref(), Some("NS"));
        assert_eq!(fixture.kickoff.timestamp(), 1741446000);
        assert_eq!(fixture.label(), "Manchester United vs Arsenal");
    }

    #[test]
    fn test_fixture_ref_requires_ids() {
        let mut raw = sample_fixture();
        raw["teams"]["home"]["id"] = Value::Null;
        assert!(fixture_ref_from_api(&raw).is_none());
    }
}
