pub mod adapters;
pub mod api;
pub mod capabilities;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod orchestrator;
pub mod persistence;
pub mod pipeline;
pub mod services;

pub use config::AppConfig;
pub use domain::{Decision, EvaluationOutcome, EvaluationRecord, FixtureRef, PredictedOutcome};
pub use error::{AnalystError, Result};
pub use extractor::{DecisionExtractor, DecisionSource};
pub use orchestrator::{Orchestrator, OrchestratorConfig, ReportGenerator};
pub use persistence::{EvaluationStore, RetryPolicy, StoreConnector};
pub use pipeline::{BatchPipeline, CandidatePolicy, PipelineSettings};
