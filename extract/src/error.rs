//! Errors returned by schema extraction strategies.

use thiserror::Error;

/// Failure of a [`SchemaExtractor`](crate::strategy::SchemaExtractor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The transport could not complete the exchange.
    #[error("transport error: {message}")]
    Transport { message: String, transient: bool },
    /// The exchange did not finish in time.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    /// The service answered, but not with a usable schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Nothing to extract from.
    #[error("DDL input is empty")]
    EmptyInput,
    /// The strategy is switched off in configuration.
    #[error("{0} extraction is disabled in configuration")]
    Disabled(&'static str),
    /// Every strategy of a fallback chain failed.
    #[error("all extraction strategies failed: {}", .0.join("; "))]
    AllStrategiesFailed(Vec<String>),
}

impl ExtractError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            transient: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            transient: false,
        }
    }

    /// Returns `true` when retrying the same request may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// use ddl_schema_extract::ExtractError;
    ///
    /// assert!(ExtractError::Timeout { seconds: 60 }.is_transient());
    /// assert!(ExtractError::transient("connection refused").is_transient());
    /// assert!(!ExtractError::fatal("HTTP 404").is_transient());
    /// assert!(!ExtractError::EmptyInput.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Transport { transient, .. } => *transient,
            ExtractError::Timeout { .. } => true,
            ExtractError::InvalidResponse(_)
            | ExtractError::EmptyInput
            | ExtractError::Disabled(_)
            | ExtractError::AllStrategiesFailed(_) => false,
        }
    }
}
