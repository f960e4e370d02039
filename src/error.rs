use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesPerformanceError {
    #[error("Invalid search range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Missing search parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid value '{value}' for parameter {name}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Aggregate query provider failed: {0}")]
    ProviderFailure(String),

    #[error("Catalog lookup failed: {0}")]
    CatalogFailure(String),

    #[error("Skeleton key {key} matched {matches} provider rows; expected at most one")]
    MultipleMatchInvariantViolation { key: String, matches: usize },

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SalesPerformanceError>;
