//! Service wiring: picks the store backend and builds the report service on it.

use std::sync::Arc;

use eventhub_infra::{
    AppConfig, CommunityStore, InMemoryStore, PostgresStore, ReportService, StoreBackend,
    StoreResult,
};

/// Shared store handle; both the reports and the write path go through it.
pub type SharedStore = Arc<dyn CommunityStore>;

pub struct AppServices {
    pub store: SharedStore,
    pub reports: ReportService<SharedStore>,
    /// Cap applied to the `limit` query parameter.
    pub report_max_limit: u64,
}

impl AppServices {
    pub fn new(store: SharedStore, report_max_limit: u64) -> Self {
        Self {
            reports: ReportService::new(store.clone()),
            store,
            report_max_limit,
        }
    }

    /// Fresh in-memory store (dev/tests).
    pub fn in_memory(report_max_limit: u64) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), report_max_limit)
    }
}

pub async fn build_services(config: &AppConfig) -> StoreResult<AppServices> {
    match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory store");
            Ok(AppServices::in_memory(config.report_max_limit))
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresStore::connect(database_url, *max_connections).await?;
            store.ensure_schema().await?;
            tracing::info!(max_connections, "using postgres store");
            Ok(AppServices::new(Arc::new(store), config.report_max_limit))
        }
    }
}
