//! Defines the application's primary error type `AppError` and a convenience `Result` alias.
//!
//! Uses the `thiserror` crate for ergonomic error definition and provides `From`
//! implementations to convert common external errors into `AppError` variants.
//! Errors that do not implement `Clone` are wrapped in `Arc` so that `AppError` stays
//! cloneable; multi-city reports keep one error per failed city.

use plotters::drawing::DrawingAreaErrorKind;
use std::sync::Arc;
use thiserror::Error;

/// The primary error enumeration for all application-specific errors.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// The API key is missing or was rejected by the provider.
    #[error("Authentication Error: {0}")]
    Auth(String),

    /// The provider does not know the requested city, or has no current reading for it.
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Timeout, connection failure, rate limiting or a provider-side outage.
    #[error("Network Error: {0}")]
    Transient(String),

    /// Bad prediction horizon or malformed CLI input.
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    /// A chart was given insufficient or invalid data, or drawing failed.
    #[error("Render Error: {0}")]
    Render(String),

    /// Any other error reported by the AQI provider.
    #[error("Provider Error: {0}")]
    Provider(String),

    /// Invalid configuration value.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error originating from the HTTP client (`reqwest`) outside of a request.
    #[error("API Error: {0}")]
    Api(Arc<reqwest::Error>),

    /// Error during JSON parsing (`serde_json`). Wrapped in Arc as serde_json::Error is not Clone.
    #[error("JSON Parsing Error: {0}")]
    JsonParse(Arc<serde_json::Error>),

    /// Error related to standard I/O operations.
    #[error("I/O Error: {0}")]
    Io(Arc<std::io::Error>),

    /// Error originating from user interaction prompts (`dialoguer`).
    #[error("Dialoguer Error: {0}")]
    Dialoguer(Arc<dialoguer::Error>),

    /// Error related to progress bar style templating (`indicatif`).
    #[error("Progress Style Template Error: {0}")]
    Template(Arc<indicatif::style::TemplateError>),
}

impl AppError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

/// A specialized `Result` type using the application's `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// --- From implementations ---
// These allow easy conversion from external error types into AppError
// using the `?` operator. Arc is used for non-Clone error types.

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Api(Arc::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(Arc::new(err))
    }
}

impl From<dialoguer::Error> for AppError {
    fn from(err: dialoguer::Error) -> Self {
        AppError::Dialoguer(Arc::new(err))
    }
}

impl From<indicatif::style::TemplateError> for AppError {
    fn from(err: indicatif::style::TemplateError) -> Self {
        AppError::Template(Arc::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonParse(Arc::new(err))
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for AppError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        AppError::Render(err.to_string())
    }
}
