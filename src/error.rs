//! Error types for quackview
//!
//! Engine failures keep their own type ([`EngineError`]) and are wrapped here
//! together with the front-end's configuration, persistence and terminal
//! errors.

use quackview_engine::EngineError;
use thiserror::Error;

/// Result type alias for quackview operations
pub type Result<T> = std::result::Result<T, QuackviewError>;

/// Main error type for the quackview front-end
#[derive(Error, Debug)]
pub enum QuackviewError {
    /// Error from the embedded engine (SQL, load, catalog)
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Invalid configuration value or unreadable config file
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Terminal setup or drawing failed
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A query is already running
    #[error("A query is already running")]
    Busy,
}

impl QuackviewError {
    /// Message for the Messages panel or a popup, without the engine's
    /// variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            QuackviewError::Engine(e) => e.detail(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_engine_errors_are_transparent() {
        let err: QuackviewError = EngineError::Sql("Catalog Error: no table".into()).into();
        assert_eq!(err.to_string(), "SQL error: Catalog Error: no table");
        assert_eq!(err.user_message(), "Catalog Error: no table");
    }

    #[test]
    fn test_load_error_message() {
        let err: QuackviewError = EngineError::load(Path::new("a.csv"), "bad header").into();
        assert_eq!(err.user_message(), "bad header");
        assert_eq!(QuackviewError::Busy.user_message(), "A query is already running");
    }
}
