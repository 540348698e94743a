//! Infrastructure layer: stores, report composition, configuration.

pub mod config;
pub mod reports;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use reports::{
    EventReportRow, EventsReport, ExperienceReportRow, ExperiencesReport, ReportService,
    SummaryReport,
};
pub use store::{
    CatalogStore, CommunityStore, InMemoryStore, PostgresStore, ReportStore, StoreError,
    StoreResult,
};
