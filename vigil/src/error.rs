//! Error types for registration, rule execution and task plumbing.

use std::any::Any;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VigilError>;

/// Errors surfaced by the validation engine and its registries.
#[derive(Debug, Clone, Error)]
pub enum VigilError {
    /// A registration call was made with an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An async rule returned an error, aborting the pass for this field.
    #[error("async rule for field '{field}' failed: {source}")]
    RuleFailed {
        /// Field whose pass was aborted.
        field: String,
        /// Error reported by the rule.
        #[source]
        source: RuleError,
    },

    /// A background validation task panicked, either in an async rule or in
    /// an error-change subscriber run inline when the result was committed.
    #[error("background validation of field '{field}' panicked: {message}")]
    ValidationPanicked {
        /// Field whose pass was aborted.
        field: String,
        /// Panic message extracted from the payload.
        message: String,
    },

    /// A tokio runtime was required but none is running on this thread.
    #[error("no tokio runtime available to {0}")]
    NoRuntime(&'static str),
}

impl VigilError {
    pub(crate) fn rule_failed(field: &str, source: RuleError) -> Self {
        Self::RuleFailed {
            field: field.to_string(),
            source,
        }
    }
}

/// Error returned by an async validation rule.
///
/// Returning an error is a fault, not a validation message: it aborts the
/// whole pass for the field. Report invalid input by returning messages.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuleError {
    /// Error message
    pub message: String,
}

impl RuleError {
    /// Create a new rule error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RuleError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for RuleError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RuleError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Extract a human-readable message from a panic payload.
///
/// Panics can contain either `&str` or `String` payloads. This function
/// attempts to extract either, falling back to a generic message.
pub fn extract_panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
