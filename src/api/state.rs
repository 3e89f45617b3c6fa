use crate::orchestrator::ReportGenerator;
use crate::persistence::StoreConnector;
use crate::pipeline::BatchPipeline;
use crate::services::AnalystServices;
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// On-demand report generation
    pub reports: Arc<dyn ReportGenerator>,

    /// Opens a store connection per request that needs one
    pub connector: Arc<dyn StoreConnector>,

    pub pipeline: Arc<BatchPipeline>,
}

impl AppState {
    pub fn new(
        reports: Arc<dyn ReportGenerator>,
        connector: Arc<dyn StoreConnector>,
        pipeline: Arc<BatchPipeline>,
    ) -> Self {
        Self {
            reports,
            connector,
            pipeline,
        }
    }

    pub fn from_services(services: &AnalystServices) -> Self {
        Self::new(
            services.reports.clone(),
            services.connector.clone(),
            Arc::new(services.pipeline()),
        )
    }
}
