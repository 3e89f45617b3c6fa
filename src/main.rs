use chrono::Utc;
use clap::Parser;
use fixture_analyst::adapters::PostgresConnector;
use fixture_analyst::api::{create_router, AppState};
use fixture_analyst::cli::{self, Cli, Commands, OutputMode};
use fixture_analyst::config::AppConfig;
use fixture_analyst::error::{AnalystError, Result};
use fixture_analyst::pipeline::run_every;
use fixture_analyst::services::AnalystServices;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials usually live in .env
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("config: {e}");
        }
        return Err(AnalystError::Validation(errors.join("; ")));
    }

    match cli.command {
        Commands::Report { fixture_id } => {
            init_logging_simple();
            let services = AnalystServices::from_config(config)?;
            cli::print_report(services.reports.as_ref(), fixture_id).await?;
        }
        Commands::Evaluate {
            policy,
            leagues,
            json,
        } => {
            init_logging(&config.logging);
            let services = AnalystServices::from_config(config)?;
            let mut pipeline = services.pipeline();
            if let Some(leagues) = leagues {
                pipeline = pipeline.for_leagues(leagues);
            }
            let outcomes = pipeline.run(policy).await?;
            cli::print_outcomes(&outcomes, OutputMode::from_json_flag(json))?;
        }
        Commands::Schedule {
            policy,
            interval_secs,
        } => {
            init_logging(&config.logging);
            let period = Duration::from_secs(
                interval_secs.unwrap_or(config.pipeline.schedule_interval_secs),
            );
            let services = AnalystServices::from_config(config)?;
            run_every(&services.pipeline(), policy, period, shutdown_signal()).await?;
        }
        Commands::Serve { port } => {
            init_logging(&config.logging);
            let port = port.unwrap_or(config.server.port);
            let services = AnalystServices::from_config(config)?;
            let app = create_router(AppState::from_services(&services));

            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            info!("Starting API server on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::SyncFixtures { date } => {
            init_logging_simple();
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let services = AnalystServices::from_config(config)?;
            let stored =
                cli::sync_fixtures(&services.football, services.connector.as_ref(), date).await?;
            println!("Stored {stored} fixtures for {date}");
        }
        Commands::Show { fixture_id, json } => {
            init_logging_simple();
            let connector = PostgresConnector::new(&config.database)?;
            cli::show_evaluation(&connector, fixture_id, OutputMode::from_json_flag(json)).await?;
        }
    }

    Ok(())
}
