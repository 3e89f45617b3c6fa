use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team as it appears on a fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
}

/// A scheduled fixture with the context needed to analyze it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRef {
    pub fixture_id: i64,
    pub league_id: i64,
    pub league_name: Option<String>,
    pub season: i32,
    pub round: Option<String>,
    pub kickoff: DateTime<Utc>,
    /// Short status code from the data provider (NS, FT, PST, ...)
    pub status: Option<String>,
    pub home: TeamRef,
    pub away: TeamRef,
}

impl FixtureRef {
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home.name, self.away.name)
    }
}

impl std::fmt::Display for FixtureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} ({})",
            self.fixture_id,
            self.label(),
            self.kickoff.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

/// Half-open kickoff interval `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickoffWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl KickoffWindow {
    pub fn contains(&self, kickoff: DateTime<Utc>) -> bool {
        kickoff >= self.start && kickoff < self.end
    }
}

impl std::fmt::Display for KickoffWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}
