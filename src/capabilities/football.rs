//! Football data capabilities backed by API-Football
//!
//! Each tool reshapes the provider payload into a flat record (or list of
//! records) with only the fields an analyst needs.

use super::{Capability, CapabilitySet, ResultShape};
use crate::adapters::ApiFootballClient;
use crate::error::{AnalystError, Result};
use crate::llm::ToolSpec;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const RECENT_FIXTURES: u32 = 10;
const DEFAULT_H2H_WINDOW: u32 = 10;
const ODDS_BOOKMAKERS: [&str; 3] = ["William Hill", "Ladbrokes", "Bet365"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootballTool {
    FixtureBasicInfo,
    StandingHome,
    StandingAway,
    HeadToHead,
    HomeLast10,
    AwayLast10,
    Injuries,
    FixtureOdds,
}

impl FootballTool {
    pub const ALL: [FootballTool; 8] = [
        FootballTool::FixtureBasicInfo,
        FootballTool::StandingHome,
        FootballTool::StandingAway,
        FootballTool::HeadToHead,
        FootballTool::HomeLast10,
        FootballTool::AwayLast10,
        FootballTool::Injuries,
        FootballTool::FixtureOdds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FootballTool::FixtureBasicInfo => "get_fixture_basic_info",
            FootballTool::StandingHome => "get_standing_home_info",
            FootballTool::StandingAway => "get_standing_away_info",
            FootballTool::HeadToHead => "get_fixture_head2head",
            FootballTool::HomeLast10 => "get_home_last_10",
            FootballTool::AwayLast10 => "get_away_last_10",
            FootballTool::Injuries => "get_injuries",
            FootballTool::FixtureOdds => "get_fixture_odds",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FootballTool::FixtureBasicInfo => {
                "Basic fixture information by fixture_id: kickoff time, venue, league id/name/season/round, home and away team ids and names. Call this first to obtain the ids other tools need."
            }
            FootballTool::StandingHome => {
                "League standing of the home team for a season: rank, points, goal difference, form, and home/away/overall records."
            }
            FootballTool::StandingAway => {
                "League standing of the away team for a season: rank, points, goal difference, form, and home/away/overall records."
            }
            FootballTool::HeadToHead => {
                "Most recent head-to-head meetings between the two teams with winners and goals."
            }
            FootballTool::HomeLast10 => "The home team's last 10 fixtures with results.",
            FootballTool::AwayLast10 => "The away team's last 10 fixtures with results.",
            FootballTool::Injuries => "Injured and suspended players for a fixture.",
            FootballTool::FixtureOdds => {
                "Pre-match 1X2 odds (home/draw/away) from William Hill, Ladbrokes and Bet365."
            }
        }
    }

    pub fn parameters(&self) -> Value {
        match self {
            FootballTool::FixtureBasicInfo | FootballTool::Injuries | FootballTool::FixtureOdds => {
                object_schema(&[("fixture_id", "Fixture id")], &["fixture_id"])
            }
            FootballTool::StandingHome => object_schema(
                &[
                    ("league_id", "League id"),
                    ("season", "Season year, e.g. 2024"),
                    ("home_team_id", "Home team id"),
                ],
                &["league_id", "season", "home_team_id"],
            ),
            FootballTool::StandingAway => object_schema(
                &[
                    ("league_id", "League id"),
                    ("season", "Season year, e.g. 2024"),
                    ("away_team_id", "Away team id"),
                ],
                &["league_id", "season", "away_team_id"],
            ),
            FootballTool::HeadToHead => object_schema(
                &[
                    ("home_id", "Home team id"),
                    ("away_id", "Away team id"),
                    ("last", "Number of past meetings, default 10"),
                ],
                &["home_id", "away_id"],
            ),
            FootballTool::HomeLast10 => object_schema(&[("home_id", "Home team id")], &["home_id"]),
            FootballTool::AwayLast10 => object_schema(&[("away_id", "Away team id")], &["away_id"]),
        }
    }

    pub fn shape(&self) -> ResultShape {
        match self {
            FootballTool::FixtureBasicInfo
            | FootballTool::StandingHome
            | FootballTool::StandingAway
            | FootballTool::FixtureOdds => ResultShape::Record,
            FootballTool::HeadToHead
            | FootballTool::HomeLast10
            | FootballTool::AwayLast10
            | FootballTool::Injuries => ResultShape::List,
        }
    }
}

fn object_schema(properties: &[(&str, &str)], required: &[&str]) -> Value {
    let props: Map<String, Value> = properties
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({"type": "integer", "description": description}),
            )
        })
        .collect();
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

/// One football tool bound to the shared API client
pub struct FootballCapability {
    tool: FootballTool,
    client: Arc<ApiFootballClient>,
}

impl FootballCapability {
    pub fn new(tool: FootballTool, client: Arc<ApiFootballClient>) -> Self {
        Self { tool, client }
    }
}

/// The complete football capability set
pub fn football_capabilities(client: Arc<ApiFootballClient>) -> CapabilitySet {
    FootballTool::ALL
        .iter()
        .fold(CapabilitySet::new(), |set, tool| {
            set.with(Arc::new(FootballCapability::new(*tool, client.clone())))
        })
}

#[async_trait]
impl Capability for FootballCapability {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.tool.name().to_string(),
            description: self.tool.description().to_string(),
            parameters: self.tool.parameters(),
        }
    }

    fn shape(&self) -> ResultShape {
        self.tool.shape()
    }

    async fn invoke(&self, args: &Value) -> Result<Value> {
        match self.tool {
            FootballTool::FixtureBasicInfo => {
                let fixture_id = int_arg(args, "fixture_id")?;
                let raw = self.client.fixture_by_id(fixture_id).await?;
                Ok(raw
                    .as_ref()
                    .and_then(basic_info)
                    .unwrap_or_else(|| ResultShape::Record.empty()))
            }
            FootballTool::StandingHome | FootballTool::StandingAway => {
                let team_key = if self.tool == FootballTool::StandingHome {
                    "home_team_id"
                } else {
                    "away_team_id"
                };
                let league_id = int_arg(args, "league_id")?;
                let season = int_arg(args, "season")?;
                let team_id = int_arg(args, team_key)?;
                let raw = self.client.standings(league_id, season, team_id).await?;
                Ok(standing_for_team(&raw, team_id)
                    .unwrap_or_else(|| ResultShape::Record.empty()))
            }
            FootballTool::HeadToHead => {
                let home_id = int_arg(args, "home_id")?;
                let away_id = int_arg(args, "away_id")?;
                let last = optional_int_arg(args, "last")?
                    .map(|n| n.clamp(1, 50) as u32)
                    .unwrap_or(DEFAULT_H2H_WINDOW);
                let raw = self.client.head_to_head(home_id, away_id, last).await?;
                Ok(Value::Array(raw.iter().filter_map(head_to_head_entry).collect()))
            }
            FootballTool::HomeLast10 | FootballTool::AwayLast10 => {
                let key = if self.tool == FootballTool::HomeLast10 {
                    "home_id"
                } else {
                    "away_id"
                };
                let team_id = int_arg(args, key)?;
                let raw = self.client.team_last_fixtures(team_id, RECENT_FIXTURES).await?;
                Ok(Value::Array(raw.iter().filter_map(recent_fixture_entry).collect()))
            }
            FootballTool::Injuries => {
                let fixture_id = int_arg(args, "fixture_id")?;
                let raw = self.client.injuries(fixture_id).await?;
                Ok(Value::Array(raw.iter().filter_map(injury_entry).collect()))
            }
            FootballTool::FixtureOdds => {
                let fixture_id = int_arg(args, "fixture_id")?;
                let raw = self.client.odds(fixture_id).await?;
                Ok(match_winner_odds(&raw, fixture_id))
            }
        }
    }
}

/// Integer argument; numeric strings are accepted since models emit both
fn int_arg(args: &Value, key: &str) -> Result<i64> {
    optional_int_arg(args, key)?
        .ok_or_else(|| AnalystError::Capability(format!("missing argument '{key}'")))
}

fn optional_int_arg(args: &Value, key: &str) -> Result<Option<i64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| AnalystError::Capability(format!("argument '{key}' is not an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AnalystError::Capability(format!("argument '{key}' is not an integer"))),
        Some(other) => Err(AnalystError::Capability(format!(
            "argument '{key}' has unexpected value {other}"
        ))),
    }
}

/// Build a flat record from JSON pointers; `None` when any pointer is absent.
/// Present-but-null values are kept as null.
fn pick(raw: &Value, fields: &[(&str, &str)]) -> Option<Value> {
    let mut record = Map::with_capacity(fields.len());
    for (key, pointer) in fields {
        record.insert(key.to_string(), raw.pointer(pointer)?.clone());
    }
    Some(Value::Object(record))
}

fn basic_info(raw: &Value) -> Option<Value> {
    let mut record = pick(
        raw,
        &[
            ("fixture_id", "/fixture/id"),
            ("timezone", "/fixture/timezone"),
            ("fixture_date", "/fixture/date"),
            ("league_id", "/league/id"),
            ("league_name", "/league/name"),
            ("league_country", "/league/country"),
            ("league_season", "/league/season"),
            ("league_round", "/league/round"),
            ("home_id", "/teams/home/id"),
            ("home_name", "/teams/home/name"),
            ("away_id", "/teams/away/id"),
            ("away_name", "/teams/away/name"),
        ],
    )?;
    if let Value::Object(map) = &mut record {
        for (key, pointer) in [
            ("venue_name", "/fixture/venue/name"),
            ("venue_city", "/fixture/venue/city"),
        ] {
            map.insert(
                key.to_string(),
                raw.pointer(pointer).cloned().unwrap_or(Value::Null),
            );
        }
    }
    Some(record)
}

fn standing_for_team(responses: &[Value], team_id: i64) -> Option<Value> {
    for entry in responses {
        let Some(league) = entry.get("league") else {
            continue;
        };
        let Some(groups) = league.get("standings").and_then(Value::as_array) else {
            continue;
        };
        for row in groups.iter().filter_map(Value::as_array).flatten() {
            if row.pointer("/team/id").and_then(Value::as_i64) != Some(team_id) {
                continue;
            }
            let Some(mut record) = pick(
                row,
                &[
                    ("team_id", "/team/id"),
                    ("team_name", "/team/name"),
                    ("rank", "/rank"),
                    ("points", "/points"),
                    ("goalsDiff", "/goalsDiff"),
                    ("group", "/group"),
                    ("form", "/form"),
                    ("status", "/status"),
                    ("description", "/description"),
                ],
            ) else {
                continue;
            };
            if let Value::Object(map) = &mut record {
                for (key, pointer) in [
                    ("league_id", "/id"),
                    ("league_name", "/name"),
                    ("league_country", "/country"),
                    ("league_season", "/season"),
                ] {
                    map.insert(
                        key.to_string(),
                        league.pointer(pointer).cloned().unwrap_or(Value::Null),
                    );
                }
                for split in ["all", "home", "away"] {
                    for (stat, pointer) in [
                        ("played", "played"),
                        ("win", "win"),
                        ("draw", "draw"),
                        ("lose", "lose"),
                        ("goals_for", "goals/for"),
                        ("goals_against", "goals/against"),
                    ] {
                        map.insert(
                            format!("{split}_{stat}"),
                            row.pointer(&format!("/{split}/{pointer}"))
                                .cloned()
                                .unwrap_or(Value::Null),
                        );
                    }
                }
            }
            return Some(record);
        }
    }
    None
}

fn head_to_head_entry(raw: &Value) -> Option<Value> {
    pick(
        raw,
        &[
            ("home_team_id", "/teams/home/id"),
            ("away_team_id", "/teams/away/id"),
            ("fixture_date", "/fixture/date"),
            ("home_team_winner", "/teams/home/winner"),
            ("away_team_winner", "/teams/away/winner"),
            ("goals_home", "/goals/home"),
            ("goals_away", "/goals/away"),
        ],
    )
}

fn recent_fixture_entry(raw: &Value) -> Option<Value> {
    pick(
        raw,
        &[
            ("fixture_id", "/fixture/id"),
            ("fixture_date", "/fixture/date"),
            ("status", "/fixture/status/short"),
            ("home_team_id", "/teams/home/id"),
            ("home_team_name", "/teams/home/name"),
            ("away_team_id", "/teams/away/id"),
            ("away_team_name", "/teams/away/name"),
            ("home_team_winner", "/teams/home/winner"),
            ("away_team_winner", "/teams/away/winner"),
            ("goals_home", "/goals/home"),
            ("goals_away", "/goals/away"),
            ("league_id", "/league/id"),
            ("league_name", "/league/name"),
            ("season", "/league/season"),
        ],
    )
}

fn injury_entry(raw: &Value) -> Option<Value> {
    pick(
        raw,
        &[
            ("player_id", "/player/id"),
            ("player_name", "/player/name"),
            ("team_id", "/team/id"),
            ("team_name", "/team/name"),
            ("injury_type", "/player/type"),
            ("injury_reason", "/player/reason"),
            ("fixture_id", "/fixture/id"),
            ("fixture_date", "/fixture/date"),
            ("league_id", "/league/id"),
            ("league_name", "/league/name"),
            ("season", "/league/season"),
        ],
    )
}

fn outcome_key(raw: &Value) -> Option<&'static str> {
    let text = match raw {
        Value::String(s) => s.trim().to_lowercase(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match text.as_str() {
        "home" | "1" => Some("home"),
        "draw" | "x" => Some("draw"),
        "away" | "2" => Some("away"),
        _ => None,
    }
}

fn parse_odd(raw: &Value) -> Option<f64> {
    match raw {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// 1X2 odds per tracked bookmaker; bookmakers without a usable market map to null
fn match_winner_odds(responses: &[Value], fixture_id: i64) -> Value {
    let mut odds: Map<String, Value> = ODDS_BOOKMAKERS
        .iter()
        .map(|name| (name.to_string(), Value::Null))
        .collect();

    let Some(base) = responses.first() else {
        return json!({"fixture_id": fixture_id, "odds": odds});
    };
    let resolved_id = base
        .pointer("/fixture/id")
        .and_then(Value::as_i64)
        .unwrap_or(fixture_id);

    let bookmakers = base
        .get("bookmakers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for bookmaker in bookmakers {
        let Some(name) = bookmaker.get("name").and_then(Value::as_str) else {
            continue;
        };
        if !ODDS_BOOKMAKERS.contains(&name) {
            continue;
        }
        let market = bookmaker
            .get("bets")
            .and_then(Value::as_array)
            .and_then(|bets| {
                bets.iter().find(|bet| {
                    bet.get("name").and_then(Value::as_str) == Some("Match Winner")
                        || bet.get("id").and_then(Value::as_i64) == Some(1)
                })
            });
        let Some(market) = market else {
            continue;
        };

        let mut prices = Map::new();
        for item in market.get("values").and_then(Value::as_array).into_iter().flatten() {
            let key = item.get("value").and_then(outcome_key);
            let odd = item.get("odd").and_then(parse_odd);
            if let (Some(key), Some(odd)) = (key, odd) {
                prices.insert(key.to_string(), json!(odd));
            }
        }
        if !prices.is_empty() {
            odds.insert(name.to_string(), Value::Object(prices));
        }
    }

    json!({"fixture_id": resolved_id, "odds": odds})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arg_accepts_numeric_strings() {
        let args = json!({"fixture_id": "1347805", "season": 2024, "bad": "x", "float": 39.0});
        assert_eq!(int_arg(&args, "fixture_id").unwrap(), 1347805);
        assert_eq!(int_arg(&args, "season").unwrap(), 2024);
        assert_eq!(int_arg(&args, "float").unwrap(), 39);
        assert!(int_arg(&args, "bad").is_err());
        assert!(int_arg(&args, "missing").is_err());
        assert!(int_arg(&json!("not an object"), "fixture_id").is_err());
    }

    #[test]
    fn test_specs_cover_all_tools() {
        let names: Vec<_> = FootballTool::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), 8);
        let h2h = FootballTool::HeadToHead.parameters();
        assert_eq!(h2h["required"], json!(["home_id", "away_id"]));
        assert_eq!(h2h["properties"]["last"]["type"], json!("integer"));
    }

    #[test]
    fn test_basic_info() {
        let raw = json!({
            "fixture": {"id": 7, "timezone": "UTC", "date": "2025-03-08T15:00:00+00:00", "venue": null},
            "league": {"id": 39, "name": "Premier League", "country": "England", "season": 2024, "round": "R28"},
            "teams": {"home": {"id": 33, "name": "Home FC"}, "away": {"id": 42, "name": "Away FC"}}
        });
        let info = basic_info(&raw).unwrap();
        assert_eq!(info["fixture_id"], json!(7));
        assert_eq!(info["home_name"], json!("Home FC"));
        assert_eq!(info["venue_name"], Value::Null);
    }

    #[test]
    fn test_standing_for_team() {
        let raw = vec![json!({
            "league": {
                "id": 39, "name": "Premier League", "country": "England", "season": 2024,
                "standings": [[
                    {"rank": 1, "team": {"id": 40, "name": "Leader"}, "points": 70, "goalsDiff": 40,
                     "group": "PL", "form": "WWWWW", "status": "same", "description": "CL",
                     "all": {"played": 28, "win": 22, "draw": 4, "lose": 2, "goals": {"for": 65, "against": 25}},
                     "home": {"played": 14, "win": 12, "draw": 1, "lose": 1, "goals": {"for": 35, "against": 10}},
                     "away": {"played": 14, "win": 10, "draw": 3, "lose": 1, "goals": {"for": 30, "against": 15}}},
                    {"rank": 14, "team": {"id": 33, "name": "Target"}, "points": 33, "goalsDiff": -5,
                     "group": "PL", "form": "LDWLW", "status": "down", "description": null,
                     "all": {"played": 28, "win": 9, "draw": 6, "lose": 13, "goals": {"for": 34, "against": 39}},
                     "home": {"played": 14, "win": 5, "draw": 3, "lose": 6, "goals": {"for": 18, "against": 18}},
                     "away": {"played": 14, "win": 4, "draw": 3, "lose": 7, "goals": {"for": 16, "against": 21}}}
                ]]
            }
        })];
        let standing = standing_for_team(&raw, 33).unwrap();
        assert_eq!(standing["rank"], json!(14));
        assert_eq!(standing["league_name"], json!("Premier League"));
        assert_eq!(standing["home_goals_for"], json!(18));
        assert_eq!(standing["away_lose"], json!(7));
        assert_eq!(standing["description"], Value::Null);

        assert!(standing_for_team(&raw, 999).is_none());
    }

    #[test]
    fn test_standing_skips_malformed_entries() {
        let raw = vec![
            json!({"errors": {"requests": "limit"}}),
            json!({"league": {"id": 2, "name": "Cup"}}),
            json!({
                "league": {
                    "id": 39, "name": "Premier League", "country": "England", "season": 2024,
                    "standings": [[
                        {"rank": 6, "team": {"id": 33, "name": "Target"}, "points": 45,
                         "goalsDiff": 9, "group": "PL", "form": "WWDLW", "status": "up",
                         "description": null,
                         "all": {"played": 28, "win": 13, "draw": 6, "lose": 9,
                                 "goals": {"for": 40, "against": 31}}}
                    ]]
                }
            }),
        ];
        let standing = standing_for_team(&raw, 33).unwrap();
        assert_eq!(standing["rank"], json!(6));
        assert_eq!(standing["league_id"], json!(39));
        assert_eq!(standing["all_win"], json!(13));
    }

    #[test]
    fn test_list_entries_skip_incomplete_rows() {
        let complete = json!({
            "fixture": {"id": 1, "date": "2025-01-01T12:00:00+00:00", "status": {"short": "FT"}},
            "league": {"id": 39, "name": "PL", "season": 2024},
            "teams": {"home": {"id": 1, "name": "A", "winner": true}, "away": {"id": 2, "name": "B", "winner": false}},
            "goals": {"home": 2, "away": 0}
        });
        let broken = json!({"fixture": {"id": 2}});
        let entries: Vec<_> = [complete, broken].iter().filter_map(recent_fixture_entry).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["status"], json!("FT"));
        assert_eq!(entries[0]["home_team_winner"], json!(true));
    }

    #[test]
    fn test_match_winner_odds() {
        let raw = vec![json!({
            "fixture": {"id": 55},
            "bookmakers": [
                {"name": "Bet365", "bets": [
                    {"id": 5, "name": "Goals Over/Under", "values": []},
                    {"id": 1, "name": "Match Winner", "values": [
                        {"value": "Home", "odd": "2.10"},
                        {"value": "Draw", "odd": "3.40"},
                        {"value": "Away", "odd": "3.60"}
                    ]}
                ]},
                {"name": "Unibet", "bets": [{"id": 1, "name": "Match Winner", "values": [{"value": "Home", "odd": "2.0"}]}]},
                {"name": "Ladbrokes", "bets": [{"id": 1, "name": "Match Winner", "values": [
                    {"value": "1", "odd": "2.05"},
                    {"value": "X", "odd": "bad"}
                ]}]}
            ]
        })];
        let odds = match_winner_odds(&raw, 55);
        assert_eq!(odds["fixture_id"], json!(55));
        assert_eq!(odds["odds"]["Bet365"]["home"], json!(2.10));
        assert_eq!(odds["odds"]["Bet365"]["away"], json!(3.60));
        assert_eq!(odds["odds"]["Ladbrokes"], json!({"home": 2.05}));
        assert_eq!(odds["odds"]["William Hill"], Value::Null);
        assert!(odds["odds"].get("Unibet").is_none());
    }

    #[test]
    fn test_match_winner_odds_empty() {
        let odds = match_winner_odds(&[], 9);
        assert_eq!(odds["fixture_id"], json!(9));
        assert_eq!(odds["odds"]["Bet365"], Value::Null);
    }
}
