//! Error types module
//!
//! This module provides the core error types used throughout the Lumina
//! application. All errors are unified under the `AppError` enum which can
//! represent validation, authorization, dependency, and multi-step partial
//! failures.
//!
//! Multi-step operations (cascade deletion, batch deletion) never surface a
//! bare `AppError` to callers; they return structured result values that
//! accumulate per-step error strings instead.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like rate limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    Authorization(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Index store error: {0}")]
    Index(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Partial failure: {failed} of {total} steps failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
/// Keeps the per-variant accessors below free of duplication.
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::Validation(_) => ("VALIDATION_ERROR", false, LogLevel::Debug),
        AppError::Authorization(_) => ("AUTHORIZATION_ERROR", false, LogLevel::Warn),
        AppError::RateLimited { .. } => ("RATE_LIMITED", true, LogLevel::Warn),
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        AppError::Index(_) => ("INDEX_ERROR", true, LogLevel::Error),
        AppError::Cache(_) => ("CACHE_ERROR", true, LogLevel::Warn),
        AppError::PartialFailure { .. } => ("PARTIAL_FAILURE", true, LogLevel::Warn),
        AppError::Internal(_) => ("INTERNAL_ERROR", false, LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", false, LogLevel::Error),
    }
}

impl AppError {
    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    pub fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    /// Whether this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }

    /// Retry-after hint in seconds, present only for rate-limit errors.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
