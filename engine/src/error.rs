//! Error handling for the AgriDrone decision pipeline
//!
//! Bad individual records never surface here; they are quarantined by the
//! component that reads them. Only misconfiguration, rejected operator
//! actions and unreadable replay input become errors.

use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    // Configuration errors (fatal at startup)
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    // Operator action errors
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // Replay input errors
    #[error("Scenario error: {0}")]
    Scenario(String),
}

impl PipelineError {
    /// True for errors that must stop the pipeline before it computes anything
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidConfig { .. } | PipelineError::Configuration(_)
        )
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
