use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Reports
        .route("/fundamentals", get(handlers::get_fundamentals))
        // Evaluations
        .route("/evaluations/run", post(handlers::run_evaluations))
        .route("/evaluations/:fixture_id", get(handlers::get_evaluation))
        .with_state(state)
        .layer(cors)
}
