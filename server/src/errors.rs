//! Error types for the lifeline server

use thiserror::Error;

/// Main error type for the lifeline server and client
#[derive(Error, Debug)]
pub enum LifelineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Orchestrator query failed: {0}")]
    OrchestratorQuery(String),

    #[error("Deployment conflict: {0}")]
    DeploymentConflict(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Timed out and the user declined to continue: {0}")]
    UserDeclinedContinuation(String),

    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for LifelineError {
    fn from(err: anyhow::Error) -> Self {
        LifelineError::Internal(err.to_string())
    }
}
