#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use fixture_analyst::{
    domain::{KickoffWindow, TeamRef},
    AnalystError, Decision, DecisionSource, EvaluationRecord, EvaluationStore, FixtureRef,
    PredictedOutcome, ReportGenerator, Result, StoreConnector,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Reference clock for the tests: 2025-03-07 10:00 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 10, 0, 0).unwrap()
}

pub fn fixture(id: i64, league_id: i64, kickoff: DateTime<Utc>) -> FixtureRef {
    FixtureRef {
        fixture_id: id,
        league_id,
        league_name: Some(format!("League {league_id}")),
        season: 2024,
        round: Some("Regular Season - 28".into()),
        kickoff,
        status: Some("NS".into()),
        home: TeamRef {
            id: id * 10,
            name: format!("Home {id}"),
        },
        away: TeamRef {
            id: id * 10 + 1,
            name: format!("Away {id}"),
        },
    }
}

/// A fixture in league 39 kicking off tomorrow afternoon relative to `now()`
pub fn tomorrow_fixture(id: i64) -> FixtureRef {
    fixture(id, 39, now() + ChronoDuration::hours(29))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Connectivity loss: the connection is unusable afterwards
    Transient,
    /// Constraint-style failure, never retried
    Permanent,
}

#[derive(Default)]
pub struct StoreState {
    pub fixtures: Vec<FixtureRef>,
    pub evaluations: BTreeMap<i64, EvaluationRecord>,
    pub synced: Vec<(i64, Value)>,
    pub connects: usize,
    pub closes: usize,
    pub schema_checks: usize,
    pub existence_queries: usize,
    pub upsert_attempts: Vec<i64>,
    pub fail_schema: bool,
    pub fail_connects: usize,
    upsert_failures: HashMap<i64, Vec<InjectedFailure>>,
    clock: i64,
}

impl StoreState {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        now() + ChronoDuration::seconds(self.clock)
    }
}

/// In-memory evaluation store shared by every connection it hands out
#[derive(Clone, Default)]
pub struct MemoryConnector {
    pub state: Arc<Mutex<StoreState>>,
}

impl MemoryConnector {
    pub fn with_fixtures(fixtures: Vec<FixtureRef>) -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().fixtures = fixtures;
        connector
    }

    /// Make the next upserts of `fixture_id` fail, in order
    pub fn fail_upserts(&self, fixture_id: i64, failures: &[InjectedFailure]) {
        self.state
            .lock()
            .unwrap()
            .upsert_failures
            .insert(fixture_id, failures.iter().rev().copied().collect());
    }

    pub fn seed_evaluation(&self, fixture_id: i64, decision: Decision) {
        let mut state = self.state.lock().unwrap();
        let at = state.tick();
        state.evaluations.insert(
            fixture_id,
            EvaluationRecord {
                fixture_id,
                report: format!("# Seeded report {fixture_id}"),
                decision,
                created_at: at,
                updated_at: at,
            },
        );
    }

    pub fn evaluation(&self, fixture_id: i64) -> Option<EvaluationRecord> {
        self.state.lock().unwrap().evaluations.get(&fixture_id).cloned()
    }

    pub fn stored_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().evaluations.keys().copied().collect()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn EvaluationStore>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(AnalystError::Timeout("connect".into()));
        }
        state.connects += 1;
        Ok(Box::new(MemoryStore {
            state: self.state.clone(),
            open: true,
        }))
    }
}

pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    open: bool,
}

impl MemoryStore {
    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(AnalystError::StoreClosed)
        }
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn ensure_schema(&mut self) -> Result<()> {
        self.check_open()?;
        let mut state = self.state.lock().unwrap();
        state.schema_checks += 1;
        if state.fail_schema {
            return Err(AnalystError::Validation("permission denied for schema".into()));
        }
        Ok(())
    }

    async fn fixtures_between(
        &mut self,
        league_ids: &[i64],
        window: &KickoffWindow,
    ) -> Result<Vec<FixtureRef>> {
        self.check_open()?;
        let state = self.state.lock().unwrap();
        let mut selected: Vec<FixtureRef> = state
            .fixtures
            .iter()
            .filter(|f| league_ids.contains(&f.league_id) && window.contains(f.kickoff))
            .cloned()
            .collect();
        selected.sort_by_key(|f| f.fixture_id);
        Ok(selected)
    }

    async fn existing_evaluations(&mut self, fixture_ids: &[i64]) -> Result<HashSet<i64>> {
        self.check_open()?;
        let mut state = self.state.lock().unwrap();
        state.existence_queries += 1;
        Ok(fixture_ids
            .iter()
            .copied()
            .filter(|id| state.evaluations.contains_key(id))
            .collect())
    }

    async fn upsert_evaluation(
        &mut self,
        fixture_id: i64,
        report: &str,
        decision: &Decision,
    ) -> Result<()> {
        self.check_open()?;
        let mut state = self.state.lock().unwrap();
        state.upsert_attempts.push(fixture_id);

        let injected = state
            .upsert_failures
            .get_mut(&fixture_id)
            .and_then(|failures| failures.pop());
        match injected {
            Some(InjectedFailure::Transient) => {
                self.open = false;
                return Err(AnalystError::StoreClosed);
            }
            Some(InjectedFailure::Permanent) => {
                return Err(AnalystError::Validation("check constraint violated".into()));
            }
            None => {}
        }

        let at = state.tick();
        let created_at = state
            .evaluations
            .get(&fixture_id)
            .map(|existing| existing.created_at)
            .unwrap_or(at);
        state.evaluations.insert(
            fixture_id,
            EvaluationRecord {
                fixture_id,
                report: report.to_string(),
                decision: decision.clone(),
                created_at,
                updated_at: at,
            },
        );
        Ok(())
    }

    async fn get_evaluation(&mut self, fixture_id: i64) -> Result<Option<EvaluationRecord>> {
        self.check_open()?;
        Ok(self.state.lock().unwrap().evaluations.get(&fixture_id).cloned())
    }

    async fn upsert_fixture(&mut self, fixture: &FixtureRef, raw: &Value) -> Result<()> {
        self.check_open()?;
        let mut state = self.state.lock().unwrap();
        state.fixtures.retain(|f| f.fixture_id != fixture.fixture_id);
        state.fixtures.push(fixture.clone());
        state.synced.push((fixture.fixture_id, raw.clone()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
        }
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Report(String),
    Fail,
    Panic,
}

/// Report generator answering from a per-fixture script; unknown ids get a generic report
#[derive(Default)]
pub struct ScriptedReports {
    script: HashMap<i64, Scripted>,
    pub calls: Mutex<Vec<i64>>,
}

impl ScriptedReports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fixture_id: i64, scripted: Scripted) -> Self {
        self.script.insert(fixture_id, scripted);
        self
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportGenerator for ScriptedReports {
    async fn generate_report(&self, fixture_id: i64) -> Result<String> {
        self.calls.lock().unwrap().push(fixture_id);
        match self.script.get(&fixture_id) {
            Some(Scripted::Report(text)) => Ok(text.clone()),
            Some(Scripted::Fail) => Err(AnalystError::Model("model unavailable".into())),
            Some(Scripted::Panic) => panic!("report generator exploded for {fixture_id}"),
            None => Ok(format!("# Fundamentals for {fixture_id}")),
        }
    }
}

/// Decision source returning a home-win bet and recording which reports it saw
#[derive(Default)]
pub struct RecordingDecisions {
    pub seen: Mutex<Vec<(i64, String)>>,
}

impl RecordingDecisions {
    pub fn decision() -> Decision {
        Decision {
            place_bet: true,
            predicted_outcome: PredictedOutcome::HomeWin,
            confidence: 0.7,
            evidence_tags: "home form/away injuries".into(),
        }
    }

    pub fn seen_ids(&self) -> Vec<i64> {
        self.seen.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl DecisionSource for RecordingDecisions {
    async fn extract(&self, fixture_id: i64, report: &str) -> Decision {
        self.seen
            .lock()
            .unwrap()
            .push((fixture_id, report.to_string()));
        Self::decision()
    }
}
