//! # Pipeline Error Types
//!
//! Structured error handling for the batch pipeline using thiserror
//! for typed errors instead of `Box<dyn Error>` patterns.
//!
//! Every steady-state error here is absorbed at a documented layer: source
//! and fetch failures yield an empty work set, parse failures yield zero
//! items, producer and sink failures are caught per item, and claim failures
//! leave the unit eligible for re-selection. Only configuration errors at
//! startup are fatal.

use thiserror::Error;

/// Pipeline error taxonomy
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Work source unavailable: {backend}: {message}")]
    SourceUnavailable { backend: String, message: String },

    #[error("Payload fetch failed for unit '{unit_id}': {message}")]
    Fetch { unit_id: String, message: String },

    #[error("Payload parse failed for unit '{unit_id}': {message}")]
    Parse { unit_id: String, message: String },

    #[error("Image production failed for item #{index} ({prompt}): {message}")]
    Producer {
        index: usize,
        prompt: String,
        message: String,
    },

    #[error("Artifact store write failed for '{filename}': {message}")]
    SinkWrite { filename: String, message: String },

    #[error("Claim mark failed for unit '{unit_id}': {message}")]
    Claim { unit_id: String, message: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Database error: {operation}: {message}")]
    Database { operation: String, message: String },
}

impl PipelineError {
    /// Create a source unavailable error
    pub fn source_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a payload fetch error
    pub fn fetch(unit_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            unit_id: unit_id.into(),
            message: message.into(),
        }
    }

    /// Create a payload parse error
    pub fn parse(unit_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            unit_id: unit_id.into(),
            message: message.into(),
        }
    }

    /// Create a producer error carrying the failing prompt context
    pub fn producer(index: usize, prompt: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Producer {
            index,
            prompt: prompt.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a claim error
    pub fn claim(unit_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Claim {
            unit_id: unit_id.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Conversion from sqlx::Error to PipelineError
impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PipelineError::database("query", "No rows found"),
            sqlx::Error::Database(db_err) => {
                PipelineError::database("database", db_err.to_string())
            }
            sqlx::Error::PoolTimedOut => {
                PipelineError::database("database_pool", "Connection pool timed out")
            }
            sqlx::Error::PoolClosed => {
                PipelineError::database("database_pool", "Connection pool is closed")
            }
            sqlx::Error::Configuration(config_err) => {
                PipelineError::configuration("database", config_err.to_string())
            }
            _ => PipelineError::database("connection", err.to_string()),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
