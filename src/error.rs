use thiserror::Error;

use crate::lifecycle::TransitionError;
use crate::model::{ReportId, ReportStatus};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("could not refresh reports: {0}")]
    FetchFailed(#[source] anyhow::Error),

    #[error("invalid or missing field: {field}")]
    ValidationFailed { field: &'static str },

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("report {id} was already {actual}")]
    Conflict { id: ReportId, actual: ReportStatus },

    #[error("report {0} not found")]
    NotFound(ReportId),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
