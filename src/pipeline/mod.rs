//! Batch evaluation pipeline
//!
//! - `candidates`: which fixtures a run picks up
//! - `driver`: per-fixture report → decision → upsert with failure isolation
//! - `schedule`: periodic runs

pub mod candidates;
pub mod driver;
pub mod schedule;

pub use candidates::{exclude_existing, CandidatePolicy};
pub use driver::{BatchPipeline, PipelineSettings};
pub use schedule::run_every;
