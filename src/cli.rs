use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::{info, warn};

use crate::adapters::{fixture_ref_from_api, ApiFootballClient};
use crate::domain::{EvaluationOutcome, EvaluationRecord};
use crate::error::{AnalystError, Result};
use crate::orchestrator::ReportGenerator;
use crate::persistence::{EvaluationStore, StoreConnector};
use crate::pipeline::CandidatePolicy;

#[derive(Parser)]
#[command(name = "fixture-analyst")]
#[command(version)]
#[command(about = "Football fixture fundamentals reports and betting decisions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml, $ANALYST_ENV.toml)
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the fundamentals report for one fixture
    Report {
        /// Fixture ID
        fixture_id: i64,
    },
    /// Run one batch evaluation and print the decisions
    Evaluate {
        /// Candidate selection policy
        #[arg(long, value_enum, default_value_t = CandidatePolicy::UpcomingWindow)]
        policy: CandidatePolicy,
        /// Override the configured competitions (comma separated league ids)
        #[arg(long, value_delimiter = ',')]
        leagues: Option<Vec<i64>>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run the batch evaluation periodically until interrupted
    Schedule {
        #[arg(long, value_enum, default_value_t = CandidatePolicy::UpcomingWindow)]
        policy: CandidatePolicy,
        /// Seconds between runs (default: pipeline.schedule_interval_secs)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },
    /// Serve the HTTP API
    Serve {
        /// Listen port (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch all fixtures of a UTC date and store them as batch candidates
    SyncFixtures {
        /// Date as YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the stored evaluation of a fixture
    Show {
        /// Fixture ID
        fixture_id: i64,
        #[arg(long)]
        json: bool,
    },
}

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
pub struct OutcomeRow {
    pub fixture_id: i64,
    pub place_bet: u8,
    pub predicted_outcome: i16,
    #[tabled(rename = "outcome")]
    #[serde(skip)]
    pub outcome_name: &'static str,
    pub confidence: f64,
    pub evidence_tags: String,
}

impl From<&EvaluationOutcome> for OutcomeRow {
    fn from(outcome: &EvaluationOutcome) -> Self {
        let decision = &outcome.decision;
        Self {
            fixture_id: outcome.fixture_id,
            place_bet: u8::from(decision.place_bet),
            predicted_outcome: decision.predicted_outcome.code(),
            outcome_name: decision.predicted_outcome.as_str(),
            confidence: decision.confidence,
            evidence_tags: decision.evidence_tags.clone(),
        }
    }
}

pub fn print_outcomes(outcomes: &[EvaluationOutcome], mode: OutputMode) -> Result<()> {
    let rows: Vec<OutcomeRow> = outcomes.iter().map(OutcomeRow::from).collect();
    print_items(&rows, mode)
}

/// Generate and print one report
pub async fn print_report(reports: &dyn ReportGenerator, fixture_id: i64) -> Result<()> {
    let report = reports.generate_report(fixture_id).await?;
    if report.trim().is_empty() {
        return Err(AnalystError::Model(format!(
            "model returned an empty report for fixture {}",
            fixture_id
        )));
    }
    println!("{report}");
    Ok(())
}

pub fn print_evaluation(record: &EvaluationRecord, mode: OutputMode) -> Result<()> {
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputMode::Table => {
            let decision = &record.decision;
            println!("Fixture:     {}", record.fixture_id);
            println!("Place bet:   {}", if decision.place_bet { "yes" } else { "no" });
            println!(
                "Outcome:     {} ({})",
                decision.predicted_outcome,
                decision.predicted_outcome.code()
            );
            println!("Confidence:  {:.2}", decision.confidence);
            println!("Evidence:    {}", decision.evidence_tags);
            println!("Created:     {}", record.created_at);
            println!("Updated:     {}", record.updated_at);
            println!();
            println!("{}", record.report);
        }
    }
    Ok(())
}

pub async fn show_evaluation(
    connector: &dyn StoreConnector,
    fixture_id: i64,
    mode: OutputMode,
) -> Result<()> {
    let mut store = connector.connect().await?;
    let record = store.get_evaluation(fixture_id).await;
    store.close().await?;

    match record? {
        Some(record) => print_evaluation(&record, mode),
        None => Err(AnalystError::Validation(format!(
            "no evaluation stored for fixture {}",
            fixture_id
        ))),
    }
}

/// Fetch the fixtures of `date` and upsert them; returns how many were stored
pub async fn sync_fixtures(
    football: &ApiFootballClient,
    connector: &dyn StoreConnector,
    date: NaiveDate,
) -> Result<usize> {
    let raw_fixtures = football.fixtures_by_date(date).await?;

    let mut store = connector.connect().await?;
    let result = store_fixtures(store.as_mut(), &raw_fixtures).await;
    store.close().await?;

    let stored = result?;
    info!(%date, fetched = raw_fixtures.len(), stored, "Fixtures synced");
    Ok(stored)
}

async fn store_fixtures(
    store: &mut dyn EvaluationStore,
    raw_fixtures: &[serde_json::Value],
) -> Result<usize> {
    store.ensure_schema().await?;
    let mut stored = 0;
    for raw in raw_fixtures {
        match fixture_ref_from_api(raw) {
            Some(fixture) => {
                store.upsert_fixture(&fixture, raw).await?;
                stored += 1;
            }
            None => warn!(
                fixture_id = ?raw.pointer("/fixture/id"),
                "Skipping fixture with incomplete data"
            ),
        }
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_interval_must_be_positive() {
        let parsed = Cli::try_parse_from(["fixture-analyst", "schedule", "--interval-secs", "0"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from(["fixture-analyst", "schedule", "--interval-secs", "90"])
            .unwrap();
        match cli.command {
            Commands::Schedule { interval_secs, .. } => assert_eq!(interval_secs, Some(90)),
            _ => panic!("expected schedule command"),
        }
    }
}
