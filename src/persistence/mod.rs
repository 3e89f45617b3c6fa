//! Evaluation persistence
//!
//! - `EvaluationStore`: one live store connection (schema, candidates, upserts)
//! - `StoreConnector`: opens fresh connections; a connection that failed
//!   with a transient error is dropped and replaced, never reused
//! - `RetryPolicy`: which failures are retried, and how often

pub mod retry;

use crate::domain::{Decision, EvaluationRecord, FixtureRef, KickoffWindow};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

pub use retry::RetryPolicy;

/// A single store connection
#[async_trait]
pub trait EvaluationStore: Send {
    /// Create relations and add columns introduced after initial deployment
    async fn ensure_schema(&mut self) -> Result<()>;

    /// Fixtures of the given leagues kicking off inside the window, by fixture id
    async fn fixtures_between(
        &mut self,
        league_ids: &[i64],
        window: &KickoffWindow,
    ) -> Result<Vec<FixtureRef>>;

    /// The subset of `fixture_ids` that already has an evaluation (one query)
    async fn existing_evaluations(&mut self, fixture_ids: &[i64]) -> Result<HashSet<i64>>;

    /// Insert or overwrite the evaluation of one fixture atomically.
    /// `created_at` survives overwrites; `updated_at` is refreshed.
    async fn upsert_evaluation(
        &mut self,
        fixture_id: i64,
        report: &str,
        decision: &Decision,
    ) -> Result<()>;

    async fn get_evaluation(&mut self, fixture_id: i64) -> Result<Option<EvaluationRecord>>;

    /// Insert or refresh a synced fixture together with its raw provider payload
    async fn upsert_fixture(&mut self, fixture: &FixtureRef, raw: &Value) -> Result<()>;

    /// Release the connection; later calls fail with `StoreClosed`
    async fn close(&mut self) -> Result<()>;
}

/// Opens store connections
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn EvaluationStore>>;
}
