//! Error types for the navigation engine

use thiserror::Error;

/// Main error type for navigation operations
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Element '{0}' not found in document")]
    ElementMissing(String),

    #[error("DOM operation failed: {0}")]
    Dom(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown submenu group '{0}'")]
    UnknownGroup(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for navigation operations
pub type NavResult<T> = Result<T, NavError>;
