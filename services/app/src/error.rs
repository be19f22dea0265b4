//! services/app/src/error.rs
//!
//! Defines the primary error type for the client application.

use crate::client::validation::ValidationErrors;
use crate::config::ConfigError;
use learnlingo_core::ports::PortError;

/// The primary error type for the `app` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Form input rejected before anything was sent anywhere.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// The action needs a signed-in user.
    #[error("You need to log in to do that")]
    Unauthenticated,

    /// Represents a standard Input/Output error (e.g., reading a seed file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl AppError {
    /// The single human-readable line shown next to a form or banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Port(PortError::RemoteUnavailable(_)) => {
                "Could not reach the server. Please try again.".to_string()
            }
            AppError::Port(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}
