use chrono::{DateTime, Utc};

use crate::models::{ApplicationId, ApplicationStatus};

/// A write was refused because the record would poison derived statistics.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("unknown status '{0}' (expected applied, screening, interview, offer, rejected or withdrawn)")]
    UnknownStatus(String),
    #[error("invalid timestamp '{0}': expected RFC 3339 or YYYY-MM-DD")]
    Timestamp(String),
    #[error("appliedDate {0} lies in the future")]
    AppliedInFuture(DateTime<Utc>),
    #[error("{0} precedes appliedDate")]
    BeforeApplied(&'static str),
    #[error("status '{0}' requires a responseDate")]
    MissingResponseDate(ApplicationStatus),
    #[error("appliedDate of {0} cannot change once recorded")]
    AppliedDateChanged(ApplicationId),
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Failures reported by an `ApplicationStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is malformed: {0}")]
    Malformed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Unavailable(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    StoreUnavailable(StoreError),
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Malformed(detail) => Self::Validation(ValidationError::Malformed(detail)),
            other => Self::StoreUnavailable(other),
        }
    }
}
