//! Candidate selection policies

use crate::domain::{FixtureRef, KickoffWindow};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Which fixtures a batch run evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CandidatePolicy {
    /// Every fixture kicking off tomorrow (UTC), re-evaluated unconditionally
    #[value(name = "upcoming")]
    #[serde(rename = "upcoming")]
    UpcomingWindow,
    /// Fixtures kicking off today or tomorrow (UTC) that have no evaluation yet
    CatchUp,
}

impl CandidatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidatePolicy::UpcomingWindow => "upcoming",
            CandidatePolicy::CatchUp => "catch-up",
        }
    }

    /// Kickoff window for a run started at `now`
    pub fn window(&self, now: DateTime<Utc>) -> KickoffWindow {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        match self {
            CandidatePolicy::UpcomingWindow => {
                let start = today + Duration::days(1);
                KickoffWindow {
                    start,
                    end: start + Duration::days(1),
                }
            }
            CandidatePolicy::CatchUp => KickoffWindow {
                start: today,
                end: today + Duration::days(2),
            },
        }
    }

    /// Whether fixtures with an existing evaluation are skipped
    pub fn skips_evaluated(&self) -> bool {
        matches!(self, CandidatePolicy::CatchUp)
    }
}

impl fmt::Display for CandidatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upcoming" | "upcoming-window" | "tomorrow" => Ok(CandidatePolicy::UpcomingWindow),
            "catch-up" | "catchup" | "catch_up" => Ok(CandidatePolicy::CatchUp),
            other => Err(format!("unknown candidate policy '{other}'")),
        }
    }
}

/// Drop candidates whose fixture id is already evaluated, keeping order
pub fn exclude_existing(candidates: Vec<FixtureRef>, existing: &HashSet<i64>) -> Vec<FixtureRef> {
    candidates
        .into_iter()
        .filter(|fixture| !existing.contains(&fixture.fixture_id))
        .collect()
}
