//! Unified error handling for Weft Core.
//!
//! [`WeftError`] wraps domain and application errors for the wiring API.
//! Proxied calls return [`InvocationError`] directly; it converts into
//! [`WeftError`] for callers that mix both.

use thiserror::Error;

use crate::application::{ApplicationError, InvocationError};
use crate::domain::DomainError;

/// Root error type for Weft Core operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeftError {
    /// Malformed pointcuts, signatures or type descriptors.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Proxy construction, casting and registry failures.
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// A proxied call failed.
    #[error("Invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl WeftError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Invocation(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Run `weft config list` to see the effective settings".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in Weft".into(),
                "Re-run with -vvv and include the log when reporting it".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Conflict => ErrorCategory::Conflict,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
            },
            Self::Application(e) => e.category(),
            Self::Invocation(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Invocation(InvocationError::TargetInvocation { .. })
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Configuration,
    Runtime,
    Internal,
}

/// Convenient result type alias.
pub type WeftResult<T> = Result<T, WeftError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> WeftResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> WeftResult<T> {
        self.map_err(|e| WeftError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
