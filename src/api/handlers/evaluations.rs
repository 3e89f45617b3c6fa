use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::api::state::AppState;
use crate::domain::{EvaluationOutcome, EvaluationRecord};
use crate::pipeline::CandidatePolicy;

#[derive(Debug, Deserialize)]
pub struct RunEvaluationsQuery {
    pub policy: Option<CandidatePolicy>,
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn get_evaluation(
    State(state): State<AppState>,
    Path(fixture_id): Path<i64>,
) -> std::result::Result<Json<EvaluationRecord>, (StatusCode, String)> {
    let mut store = state.connector.connect().await.map_err(internal)?;
    let record = store.get_evaluation(fixture_id).await;
    if let Err(e) = store.close().await {
        warn!("Failed to close evaluation store: {}", e);
    }

    match record.map_err(internal)? {
        Some(record) => Ok(Json(record)),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("no evaluation for fixture {}", fixture_id),
        )),
    }
}

/// Run one batch synchronously and return the per-fixture decisions
pub async fn run_evaluations(
    State(state): State<AppState>,
    Query(query): Query<RunEvaluationsQuery>,
) -> std::result::Result<Json<Vec<EvaluationOutcome>>, (StatusCode, String)> {
    let policy = query.policy.unwrap_or(CandidatePolicy::UpcomingWindow);
    state.pipeline.run(policy).await.map(Json).map_err(|e| {
        error!(policy = %policy, "Batch run failed: {}", e);
        internal(e)
    })
}
