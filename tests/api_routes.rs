mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use common::*;
use fixture_analyst::{
    api::{create_router, AppState},
    BatchPipeline, PipelineSettings, RetryPolicy,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    connector: MemoryConnector,
    reports: Arc<ScriptedReports>,
}

impl TestApp {
    fn new(connector: MemoryConnector, reports: ScriptedReports) -> Self {
        let reports = Arc::new(reports);
        let pipeline = BatchPipeline::new(
            Arc::new(connector.clone()),
            reports.clone(),
            Arc::new(RecordingDecisions::default()),
            PipelineSettings {
                league_ids: vec![39],
                fixture_timeout: Duration::from_secs(5),
                run_timeout: Duration::from_secs(600),
                retry: RetryPolicy::no_retry(),
            },
        );
        let state = AppState::new(
            reports.clone(),
            Arc::new(connector.clone()),
            Arc::new(pipeline),
        );
        Self {
            router: create_router(state),
            connector,
            reports,
        }
    }
}

/// Midday tomorrow in wall-clock UTC, inside both candidate windows
fn kickoff_tomorrow() -> chrono::DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
        + ChronoDuration::days(1)
        + ChronoDuration::hours(12)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router request failed");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");

    (status, content_type, String::from_utf8_lossy(&bytes).to_string())
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new(MemoryConnector::default(), ScriptedReports::new());
    let (status, _, body) = send(&app.router, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn fundamentals_returns_markdown() {
    let app = TestApp::new(
        MemoryConnector::default(),
        ScriptedReports::new().with(
            215662,
            Scripted::Report("## Form\nHome side unbeaten in five.".into()),
        ),
    );

    let (status, content_type, body) =
        send(&app.router, Method::GET, "/fundamentals?fixture_id=215662").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/markdown"));
    assert_eq!(body, "## Form\nHome side unbeaten in five.");
    assert_eq!(app.reports.calls(), vec![215662]);
    // reports are not persisted
    assert!(app.connector.stored_ids().is_empty());
    assert_eq!(app.connector.connects(), 0);
}

#[tokio::test]
async fn fundamentals_error_statuses() {
    let app = TestApp::new(
        MemoryConnector::default(),
        ScriptedReports::new()
            .with(1, Scripted::Report(String::new()))
            .with(2, Scripted::Fail),
    );

    let (status, _, _) = send(&app.router, Method::GET, "/fundamentals?fixture_id=1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _, body) = send(&app.router, Method::GET, "/fundamentals?fixture_id=2").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("model unavailable"));

    let (status, _, _) = send(&app.router, Method::GET, "/fundamentals").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app.router, Method::GET, "/fundamentals?fixture_id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn evaluation_lookup_after_run() {
    let connector = MemoryConnector::with_fixtures(vec![
        fixture(301, 39, kickoff_tomorrow()),
        fixture(302, 39, kickoff_tomorrow()),
    ]);
    let app = TestApp::new(connector, ScriptedReports::new());

    let (status, _, _) = send(&app.router, Method::GET, "/evaluations/301").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&app.router, Method::POST, "/evaluations/run").await;
    assert_eq!(status, StatusCode::OK);
    let outcomes: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["fixture_id"], 301);
    assert_eq!(outcomes[0]["place_bet"], 1);
    assert_eq!(outcomes[0]["predicted_outcome"], 3);

    let (status, _, body) = send(&app.router, Method::GET, "/evaluations/301").await;
    assert_eq!(status, StatusCode::OK);
    let record: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(record["fixture_id"], 301);
    assert_eq!(record["report"], "# Fundamentals for 301");
    assert_eq!(record["evidence_tags"], "home form/away injuries");

    // every request closed the connection it opened
    assert_eq!(app.connector.closes(), app.connector.connects());
}

#[tokio::test]
async fn catch_up_run_skips_evaluated_fixtures() {
    let connector = MemoryConnector::with_fixtures(vec![
        fixture(401, 39, kickoff_tomorrow()),
        fixture(402, 39, kickoff_tomorrow()),
    ]);
    connector.seed_evaluation(401, fixture_analyst::Decision::no_bet());
    let app = TestApp::new(connector, ScriptedReports::new());

    let (status, _, body) =
        send(&app.router, Method::POST, "/evaluations/run?policy=catch-up").await;
    assert_eq!(status, StatusCode::OK);
    let outcomes: Vec<Value> = serde_json::from_str(&body).unwrap();
    let ids: Vec<i64> = outcomes
        .iter()
        .map(|o| o["fixture_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![402]);

    let (status, _, _) = send(&app.router, Method::POST, "/evaluations/run?policy=weekly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_reports_store_failure() {
    let connector = MemoryConnector::default();
    connector.state.lock().unwrap().fail_schema = true;
    let app = TestApp::new(connector, ScriptedReports::new());

    let (status, _, body) = send(&app.router, Method::POST, "/evaluations/run").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("permission denied"));
}
