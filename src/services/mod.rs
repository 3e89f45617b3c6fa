//! Process-wide collaborators, built once from configuration
//!
//! The model client, capability set, orchestrator, extractor and store
//! connector are constructed here and handed to the CLI commands and the
//! HTTP server explicitly.

use crate::adapters::{ApiFootballClient, PostgresConnector};
use crate::capabilities::{football_capabilities, CapabilitySet};
use crate::config::AppConfig;
use crate::error::Result;
use crate::extractor::{DecisionExtractor, DecisionSource};
use crate::llm::{ChatModel, OpenAiChatClient};
use crate::orchestrator::{Orchestrator, OrchestratorConfig, ReportGenerator};
use crate::persistence::StoreConnector;
use crate::pipeline::{BatchPipeline, PipelineSettings};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AnalystServices {
    pub config: Arc<AppConfig>,
    pub football: Arc<ApiFootballClient>,
    pub reports: Arc<dyn ReportGenerator>,
    pub decisions: Arc<dyn DecisionSource>,
    pub connector: Arc<dyn StoreConnector>,
}

impl AnalystServices {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let client = OpenAiChatClient::new(&config.llm)?;
        info!(model = client.model(), "Language model client ready");
        let model: Arc<dyn ChatModel> = Arc::new(client);

        let football = Arc::new(ApiFootballClient::new(&config.football)?);
        let capabilities: Arc<CapabilitySet> = Arc::new(football_capabilities(football.clone()));

        let orchestrator = Orchestrator::new(
            model.clone(),
            capabilities.clone(),
            OrchestratorConfig::from_config(&config.llm, &config.pipeline),
        );
        let extractor = DecisionExtractor::new(model).with_temperature(config.llm.temperature);
        let connector = PostgresConnector::new(&config.database)?;

        info!(
            capabilities = capabilities.len(),
            leagues = ?config.pipeline.league_ids,
            "Services initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            football,
            reports: Arc::new(orchestrator),
            decisions: Arc::new(extractor),
            connector: Arc::new(connector),
        })
    }

    pub fn pipeline(&self) -> BatchPipeline {
        BatchPipeline::new(
            self.connector.clone(),
            self.reports.clone(),
            self.decisions.clone(),
            PipelineSettings::from_config(&self.config.pipeline),
        )
    }
}
