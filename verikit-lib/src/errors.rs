//! Error types for Verikit operations.
//!
//! These cover infrastructure and input-shape failures only. Policy
//! rejections (wrong amount, wrong address, bad signature) are not errors:
//! they are verdicts recorded against the challenge and surfaced to callers
//! as normal results.

/// Error codes for mapping to HTTP responses and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum VerikitErrorCode {
    /// Feature not compiled in
    Unimplemented = 1000,
    /// Transport/network layer error
    Transport = 2000,
    /// Connection failed
    ConnectionFailed = 2001,
    /// Connection timeout
    ConnectionTimeout = 2002,
    /// Resource not found
    NotFound = 4000,
    /// Invalid request/data
    InvalidData = 5000,
    /// Serialization error
    Serialization = 5002,
    /// Rate limited by upstream
    RateLimited = 8000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for Verikit operations.
#[derive(thiserror::Error, Debug)]
pub enum VerikitError {
    /// Feature not compiled in.
    #[error("{0} is not implemented in this build")]
    Unimplemented(&'static str),

    /// Transport/network layer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Connection to an upstream service failed.
    #[error("connection to {target} failed: {reason}")]
    ConnectionFailed {
        /// Target endpoint or service
        target: String,
        /// Underlying error message
        reason: String,
    },

    /// Connection timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Resource not found (transaction, challenge, etc.).
    #[error("{resource_type} not found: {identifier}")]
    NotFound {
        /// Type of resource (e.g., "transaction", "challenge")
        resource_type: String,
        /// Resource identifier
        identifier: String,
    },

    /// Invalid data provided.
    #[error("invalid {field}: {reason}")]
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Rate limited by an upstream API, should retry after delay.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds
        retry_after_ms: u64,
    },

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VerikitError {
    /// Get the error code for HTTP mapping.
    pub fn code(&self) -> VerikitErrorCode {
        match self {
            Self::Unimplemented(_) => VerikitErrorCode::Unimplemented,
            Self::Transport(_) => VerikitErrorCode::Transport,
            Self::ConnectionFailed { .. } => VerikitErrorCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => VerikitErrorCode::ConnectionTimeout,
            Self::NotFound { .. } => VerikitErrorCode::NotFound,
            Self::InvalidData { .. } => VerikitErrorCode::InvalidData,
            Self::Serialization(_) => VerikitErrorCode::Serialization,
            Self::RateLimited { .. } => VerikitErrorCode::RateLimited,
            Self::Internal(_) => VerikitErrorCode::Internal,
        }
    }

    /// Returns true if this error is potentially recoverable by retrying.
    ///
    /// A retryable error means the proof was never examined; challenges stay
    /// pending and callers should resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::RateLimited { .. }
        )
    }

    /// Create a not found error.
    pub fn not_found(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for VerikitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
