//! Error types for E2E testing

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Browser session failed to start: {0}")]
    Launch(String),

    #[error("No element matches: {0}")]
    NotFound(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Timeout waiting for: {what} ({waited:?}, {attempts} attempts)")]
    Timeout {
        what: String,
        waited: Duration,
        attempts: usize,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("WebDriver error: {0}")]
    Driver(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl E2eError {
    /// Whether a poller should treat this error as "not ready yet".
    ///
    /// Only a lookup that matched nothing qualifies; a stale handle never
    /// becomes valid again.
    pub fn is_transient(&self) -> bool {
        matches!(self, E2eError::NotFound(_))
    }
}

impl From<fantoccini::error::NewSessionError> for E2eError {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        E2eError::Launch(err.to_string())
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
