// Gateway error taxonomy
//
// Caller-visible failures are typed here; startup and plumbing code uses
// anyhow with context instead.

use thiserror::Error;

/// Malformed tool parameters (surfaced as 400)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be {expected}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
}

impl ValidationError {
    /// Name of the offending field, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::Missing { field } | ValidationError::Invalid { field, .. } => {
                Some(field)
            }
        }
    }
}

/// Subprocess did not produce a successful run
///
/// Reported to callers inside a 200 `success:false` body, never as 5xx.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    /// Non-zero exit or killed by a signal; carries the diagnostic text
    #[error("{0}")]
    Failed(String),

    #[error("Command timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Command cancelled: gateway is shutting down")]
    Cancelled,
}

impl ExecutionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }
}

/// Errors that short-circuit a request before or outside tool execution
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Upload(String),

    /// Anything unexpected; details stay in the server log
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
