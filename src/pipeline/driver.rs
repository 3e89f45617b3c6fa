//! Batch evaluation driver
//!
//! One run: connect, ensure schema, select candidates, then for every
//! fixture generate a report, extract a decision and upsert the result.
//! A failing fixture is logged and skipped; the run carries on.

use super::candidates::{exclude_existing, CandidatePolicy};
use crate::config::PipelineConfig;
use crate::domain::{Decision, EvaluationOutcome, FixtureRef};
use crate::error::{AnalystError, Result};
use crate::extractor::DecisionSource;
use crate::orchestrator::ReportGenerator;
use crate::persistence::{EvaluationStore, RetryPolicy, StoreConnector};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub league_ids: Vec<i64>,
    /// Budget for report generation plus extraction of one fixture
    pub fixture_timeout: Duration,
    /// Budget for the whole run; no fixture is started past it
    pub run_timeout: Duration,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            league_ids: config.league_ids.clone(),
            fixture_timeout: config.fixture_timeout(),
            run_timeout: config.run_timeout(),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_league_ids(mut self, league_ids: Vec<i64>) -> Self {
        self.league_ids = league_ids;
        self
    }
}

pub struct BatchPipeline {
    connector: Arc<dyn StoreConnector>,
    reports: Arc<dyn ReportGenerator>,
    decisions: Arc<dyn DecisionSource>,
    settings: PipelineSettings,
}

impl BatchPipeline {
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        reports: Arc<dyn ReportGenerator>,
        decisions: Arc<dyn DecisionSource>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            connector,
            reports,
            decisions,
            settings,
        }
    }

    /// Same pipeline with a different competition set
    pub fn for_leagues(&self, league_ids: Vec<i64>) -> Self {
        Self {
            connector: self.connector.clone(),
            reports: self.reports.clone(),
            decisions: self.decisions.clone(),
            settings: self.settings.clone().with_league_ids(league_ids),
        }
    }

    pub async fn run(&self, policy: CandidatePolicy) -> Result<Vec<EvaluationOutcome>> {
        self.run_at(policy, Utc::now()).await
    }

    /// Run with an explicit clock; returns the outcomes of fixtures that completed
    pub async fn run_at(
        &self,
        policy: CandidatePolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<EvaluationOutcome>> {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", %run_id, policy = %policy);

        async move {
            let mut store = self.connector.connect().await?;
            let result = self.run_with_store(&mut store, policy, now).await;
            if let Err(e) = store.close().await {
                warn!("Failed to close evaluation store: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_with_store(
        &self,
        store: &mut Box<dyn EvaluationStore>,
        policy: CandidatePolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<EvaluationOutcome>> {
        let started = Instant::now();
        store.ensure_schema().await?;

        if self.settings.league_ids.is_empty() {
            warn!("No competitions configured, nothing to evaluate");
            return Ok(Vec::new());
        }

        let window = policy.window(now);
        let mut candidates = store
            .fixtures_between(&self.settings.league_ids, &window)
            .await?;
        let selected = candidates.len();

        if policy.skips_evaluated() && !candidates.is_empty() {
            let ids: Vec<i64> = candidates.iter().map(|f| f.fixture_id).collect();
            let existing = store.existing_evaluations(&ids).await?;
            candidates = exclude_existing(candidates, &existing);
        }

        info!(
            %window,
            leagues = ?self.settings.league_ids,
            selected,
            candidates = candidates.len(),
            "Batch run started"
        );

        let deadline = started + self.settings.run_timeout;
        let mut outcomes = Vec::with_capacity(candidates.len());
        let mut failed = 0usize;
        for (index, fixture) in candidates.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    left = candidates.len() - index,
                    run_timeout_secs = self.settings.run_timeout.as_secs(),
                    "Run deadline reached, leaving remaining fixtures for the next run"
                );
                break;
            }
            let budget = remaining.min(self.settings.fixture_timeout);
            let span = info_span!("fixture", fixture_id = fixture.fixture_id);
            match self
                .process_fixture(store, fixture, budget)
                .instrument(span)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    failed += 1;
                    error!(fixture_id = fixture.fixture_id, "Fixture skipped: {}", e);
                }
            }
        }

        info!(
            processed = outcomes.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch run finished"
        );
        Ok(outcomes)
    }

    async fn process_fixture(
        &self,
        store: &mut Box<dyn EvaluationStore>,
        fixture: &FixtureRef,
        budget: Duration,
    ) -> Result<EvaluationOutcome> {
        let fixture_id = fixture.fixture_id;
        debug!(fixture = %fixture, "Evaluating fixture");

        let (report, decision) = self.analyse(fixture_id, budget).await?;
        self.persist(store, fixture_id, &report, &decision).await?;

        Ok(EvaluationOutcome {
            fixture_id,
            decision,
        })
    }

    /// Report and decision on a separate task, bounded by `budget`.
    /// A panic in either surfaces here as an error.
    async fn analyse(&self, fixture_id: i64, budget: Duration) -> Result<(String, Decision)> {
        let mut task = tokio::spawn(
            analyse_fixture(self.reports.clone(), self.decisions.clone(), fixture_id)
                .in_current_span(),
        );

        match tokio::time::timeout(budget, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AnalystError::Internal(format!(
                "analysis task failed: {}",
                join_error
            ))),
            Err(_) => {
                task.abort();
                Err(AnalystError::Timeout(format!(
                    "fixture {} exceeded {:?}",
                    fixture_id, budget
                )))
            }
        }
    }

    /// Upsert with reconnect-and-retry on transient store failures
    async fn persist(
        &self,
        store: &mut Box<dyn EvaluationStore>,
        fixture_id: i64,
        report: &str,
        decision: &Decision,
    ) -> Result<()> {
        let policy = self.settings.retry;
        let mut attempt = 1;
        loop {
            match store.upsert_evaluation(fixture_id, report, decision).await {
                Ok(()) => {
                    info!(
                        fixture_id,
                        attempt,
                        place_bet = decision.place_bet,
                        predicted_outcome = decision.predicted_outcome.code(),
                        confidence = decision.confidence,
                        "Evaluation stored"
                    );
                    return Ok(());
                }
                Err(e) if policy.should_retry(attempt, &e) => {
                    warn!(fixture_id, attempt, "Transient store failure, reconnecting: {}", e);
                    if let Err(close_err) = store.close().await {
                        debug!("Ignoring close failure on discarded connection: {}", close_err);
                    }
                    tokio::time::sleep(policy.backoff).await;
                    *store = self.connector.connect().await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn analyse_fixture(
    reports: Arc<dyn ReportGenerator>,
    decisions: Arc<dyn DecisionSource>,
    fixture_id: i64,
) -> Result<(String, Decision)> {
    let report = reports.generate_report(fixture_id).await?;
    if report.trim().is_empty() {
        warn!(fixture_id, "Empty report, storing no-bet decision");
        return Ok((report, Decision::no_bet()));
    }
    let decision = decisions.extract(fixture_id, &report).await;
    Ok((report, decision))
}
