use serde::Serialize;
use thiserror::Error;

/// Error types surfaced by the reminder core and its storage.
#[derive(Debug, Clone, Serialize, Error)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Errors related to local file storage
    #[error("Storage error: {0}")]
    Storage(String),
    /// Rejected reminder input
    #[error("Validation error: {0}")]
    Validation(String),
    /// Malformed persisted or imported data
    #[error("Parse error: {0}")]
    Parse(String),
    /// Unknown reminder id
    #[error("Not found: {0}")]
    NotFound(String),
    /// Alarm sound/notification could not be produced
    #[error("Signal error: {0}")]
    Signal(String),
}

// Conversion to String for host command replies
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Parse(error.to_string())
    }
}

// Convenience constructors
impl AppError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn parse<S: Into<String>>(msg: S) -> Self {
        AppError::Parse(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn signal<S: Into<String>>(msg: S) -> Self {
        AppError::Signal(msg.into())
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;
