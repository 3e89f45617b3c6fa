use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FundamentalsQuery {
    pub fixture_id: i64,
}

/// Generate the fundamentals report for one fixture, without extraction or persistence
pub async fn get_fundamentals(
    State(state): State<AppState>,
    Query(query): Query<FundamentalsQuery>,
) -> std::result::Result<impl IntoResponse, (StatusCode, String)> {
    let report = state
        .reports
        .generate_report(query.fixture_id)
        .await
        .map_err(|e| {
            error!(fixture_id = query.fixture_id, "Report generation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    if report.trim().is_empty() {
        warn!(fixture_id = query.fixture_id, "Model returned an empty report");
        return Err((
            StatusCode::BAD_GATEWAY,
            "model returned an empty report".to_string(),
        ));
    }

    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        report,
    ))
}
