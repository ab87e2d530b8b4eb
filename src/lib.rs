pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod labels;
pub mod lifecycle;
pub mod model;
pub mod recency;
pub mod search;
pub mod storage;

pub use catalog::{FetchOutcome, Listing, ReportCatalog};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{CatalogError, CatalogResult};
pub use model::{ItemReport, ReportDraft, ReportId, ReportKind, ReportStatus};
