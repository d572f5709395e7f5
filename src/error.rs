//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Rolesweep.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `RoleNotFound`: Target role absent from the catalog at analysis time
//! - `InvalidIdentifier`: Role or reassignment-target name rejected by the identifier grammar
//! - `StatementExecution`: A statement failed against the database (driver message kept verbatim)
//! - `BatchAborted`: Batch stopped early because `continue_on_error` was off and a role failed
//! - `ConnectionFailed`: Database connection errors
//! - `ConfigError`: Profile registry or configuration file errors
//! - `InvalidBatch`: Configuration-level misuse rejected before any role is touched

use thiserror::Error;

/// Main error type for Rolesweep operations
#[derive(Error, Debug)]
pub enum RolesweepError {
    /// Role absent from the catalog; recovered as a failed outcome by the orchestrator
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Role or reassignment-target name rejected by the identifier grammar
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Statement failed against the database; the driver message is preserved verbatim
    #[error("Statement execution failed: {0}")]
    StatementExecution(String),

    /// Batch stopped before processing all roles
    #[error("Batch aborted after {completed} of {total} roles: {cause}")]
    BatchAborted { completed: usize, total: usize, cause: String },

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Configuration error (file not found, invalid JSON, missing env var, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Batch request rejected before any role was touched
    #[error("Invalid batch request: {0}")]
    InvalidBatch(String),
}

impl RolesweepError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling by the GUI.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RoleNotFound(_) => "ROLE_NOT_FOUND",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::StatementExecution(_) => "STATEMENT_FAILED",
            Self::BatchAborted { .. } => "BATCH_ABORTED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidBatch(_) => "INVALID_BATCH",
        }
    }

    /// Get human-readable error message (safe for JSON output, no credentials)
    #[must_use]
    pub fn message(&self) -> String {
        // Use Display implementation from thiserror
        self.to_string()
    }

    /// Whether this error is recorded as a per-role outcome rather than
    /// propagated out of the batch call.
    #[must_use]
    pub const fn is_per_role(&self) -> bool {
        matches!(
            self,
            Self::RoleNotFound(_) | Self::InvalidIdentifier(_) | Self::StatementExecution(_)
        )
    }

    /// Create a role-not-found error
    pub fn role_not_found(role: impl Into<String>) -> Self {
        Self::RoleNotFound(role.into())
    }

    /// Create an invalid-identifier error
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }

    /// Create a statement-execution error
    pub fn statement_execution(message: impl Into<String>) -> Self {
        Self::StatementExecution(message.into())
    }

    /// Create a batch-aborted error
    pub fn batch_aborted(completed: usize, total: usize, cause: impl Into<String>) -> Self {
        Self::BatchAborted { completed, total, cause: cause.into() }
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an invalid-batch error
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::InvalidBatch(message.into())
    }
}

/// Result type alias for Rolesweep operations
pub type Result<T> = std::result::Result<T, RolesweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RolesweepError::role_not_found("alice").error_code(), "ROLE_NOT_FOUND");
        assert_eq!(RolesweepError::invalid_identifier("x;y").error_code(), "INVALID_IDENTIFIER");
        assert_eq!(RolesweepError::statement_execution("boom").error_code(), "STATEMENT_FAILED");
        assert_eq!(RolesweepError::batch_aborted(1, 3, "boom").error_code(), "BATCH_ABORTED");
        assert_eq!(RolesweepError::connection_failed("test").error_code(), "CONNECTION_FAILED");
        assert_eq!(RolesweepError::config_error("test").error_code(), "CONFIG_ERROR");
        assert_eq!(RolesweepError::invalid_batch("empty").error_code(), "INVALID_BATCH");
    }

    #[test]
    fn test_error_messages() {
        let err = RolesweepError::role_not_found("ana.silva");
        assert!(err.message().contains("ana.silva"));

        let err = RolesweepError::batch_aborted(2, 5, "DROP ROLE failed");
        assert!(err.message().contains("2 of 5"));
        assert!(err.message().contains("DROP ROLE failed"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            RolesweepError::role_not_found("x"),
            RolesweepError::RoleNotFound(_)
        ));
        assert!(matches!(
            RolesweepError::invalid_identifier("x"),
            RolesweepError::InvalidIdentifier(_)
        ));
        assert!(matches!(
            RolesweepError::statement_execution("x"),
            RolesweepError::StatementExecution(_)
        ));
        assert!(matches!(
            RolesweepError::batch_aborted(0, 1, "x"),
            RolesweepError::BatchAborted { .. }
        ));
        assert!(matches!(
            RolesweepError::connection_failed("x"),
            RolesweepError::ConnectionFailed(_)
        ));
        assert!(matches!(RolesweepError::config_error("x"), RolesweepError::ConfigError(_)));
        assert!(matches!(RolesweepError::invalid_batch("x"), RolesweepError::InvalidBatch(_)));
    }

    #[test]
    fn test_per_role_classification() {
        assert!(RolesweepError::role_not_found("x").is_per_role());
        assert!(RolesweepError::invalid_identifier("x").is_per_role());
        assert!(RolesweepError::statement_execution("x").is_per_role());
        assert!(!RolesweepError::invalid_batch("x").is_per_role());
        assert!(!RolesweepError::connection_failed("x").is_per_role());
        assert!(!RolesweepError::batch_aborted(0, 1, "x").is_per_role());
    }
}
