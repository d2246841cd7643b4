//! Error types for approval routing.

use thiserror::Error;

/// Errors that can abort an approval generation pass.
///
/// Every variant except [`ApprovalRoutingError::Audit`] is fatal: the
/// generator returns it to the caller and no approval units are produced.
/// Audit failures are logged and swallowed by the auto-approval engine.
#[derive(Debug, Error)]
pub enum ApprovalRoutingError {
    /// A required input is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A change record is structurally invalid.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// No approver could be determined and no fallback approver is configured.
    #[error("Unable to resolve an approver for {0}")]
    UnresolvedApprover(String),

    /// The configured approval assignment rule failed.
    #[error("Approval assignment rule '{rule}' failed: {message}")]
    OverrideRule {
        /// Name of the rule that failed.
        rule: String,
        /// Failure reported by the rule runner.
        message: String,
    },

    /// The identity directory could not answer a lookup.
    #[error("Directory lookup failed: {0}")]
    Directory(String),

    /// An audit event could not be recorded.
    #[error("Audit failure: {0}")]
    Audit(String),
}

impl ApprovalRoutingError {
    /// Whether this error aborts a generation pass.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Audit(_))
    }
}

impl From<serde_json::Error> for ApprovalRoutingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<csv::Error> for ApprovalRoutingError {
    fn from(err: csv::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Convenience Result type for approval routing.
pub type Result<T> = std::result::Result<T, ApprovalRoutingError>;
