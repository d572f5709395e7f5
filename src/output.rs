//! JSON Output Envelope Types
//!
//! This module defines the structured JSON output format for all Rolesweep
//! commands. Every command prints either a `SuccessEnvelope` or an
//! `ErrorEnvelope` on stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "command": "...", "database": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...", "database": "...", "error": {"code": "...", "message": "..."}}`
//!
//! Output is stable and suitable for programmatic parsing by the GUI and
//! by scripts.

use serde::{Deserialize, Serialize};

use crate::error::RolesweepError;

/// Success envelope for command results
///
/// Generic over the data type to support different command return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed (analyze, preview, run, connect)
    pub command: String,

    /// Database the command ran against (empty string if none was reached)
    pub database: String,

    /// Command-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(
        command: impl Into<String>,
        database: impl Into<String>,
        data: T,
        meta: Metadata,
    ) -> Self {
        Self { ok: true, command: command.into(), database: database.into(), data, meta }
    }
}

/// Error envelope for command failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Command that was attempted (analyze, preview, run, connect)
    pub command: String,

    /// Database the command targeted (empty string if none was reached)
    pub database: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(
        command: impl Into<String>,
        database: impl Into<String>,
        error: ErrorInfo,
    ) -> Self {
        Self { ok: false, command: command.into(), database: database.into(), error }
    }

    /// Create error envelope from a [`RolesweepError`]
    pub fn from_error(
        command: impl Into<String>,
        database: impl Into<String>,
        err: &RolesweepError,
    ) -> Self {
        Self::new(
            command,
            database,
            ErrorInfo { code: err.error_code().to_string(), message: err.message() },
        )
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "ROLE_NOT_FOUND", "BATCH_ABORTED")
    pub code: String,

    /// Human-readable error message (no credentials)
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error info
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of roles processed (batch commands only, None otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles_processed: Option<usize>,
}

impl Metadata {
    /// Create new metadata with just execution time
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, roles_processed: None }
    }

    /// Create new metadata with execution time and processed-role count
    #[must_use]
    pub const fn with_roles(execution_ms: u64, roles_processed: usize) -> Self {
        Self { execution_ms, roles_processed: Some(roles_processed) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_serialization() {
        let envelope = SuccessEnvelope::new(
            "run",
            "inventory",
            serde_json::json!({"succeeded_count": 3}),
            Metadata::with_roles(42, 3),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(json.contains(r#""command":"run"#));
        assert!(json.contains(r#""database":"inventory"#));
        assert!(json.contains(r#""execution_ms":42"#));
        assert!(json.contains(r#""roles_processed":3"#));
    }

    #[test]
    fn test_error_envelope_serialization() {
        let envelope = ErrorEnvelope::new(
            "connect",
            "inventory",
            ErrorInfo::new("CONNECTION_FAILED", "Could not connect to database"),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""ok":false"#));
        assert!(json.contains(r#""command":"connect"#));
        assert!(json.contains(r#""code":"CONNECTION_FAILED"#));
        assert!(json.contains(r#""message":"Could not connect to database"#));
    }

    #[test]
    fn test_error_envelope_from_rolesweep_error() {
        let err = RolesweepError::role_not_found("ana.silva");
        let envelope = ErrorEnvelope::from_error("analyze", "inventory", &err);

        assert!(!envelope.ok);
        assert_eq!(envelope.command, "analyze");
        assert_eq!(envelope.database, "inventory");
        assert_eq!(envelope.error.code, "ROLE_NOT_FOUND");
        assert!(envelope.error.message.contains("ana.silva"));
    }

    #[test]
    fn test_metadata_without_roles() {
        let meta = Metadata::new(100);
        let json = serde_json::to_string(&meta).unwrap();

        assert!(json.contains(r#""execution_ms":100"#));
        // roles_processed should be omitted when None
        assert!(!json.contains("roles_processed"));
    }

    #[test]
    fn test_metadata_with_roles() {
        let meta = Metadata::with_roles(100, 5);
        let json = serde_json::to_string(&meta).unwrap();

        assert!(json.contains(r#""execution_ms":100"#));
        assert!(json.contains(r#""roles_processed":5"#));
    }

    #[test]
    fn test_success_envelope_ok_always_true() {
        let envelope =
            SuccessEnvelope::new("preview", "inventory", serde_json::json!({}), Metadata::new(10));
        assert!(envelope.ok);
    }

    #[test]
    fn test_error_envelope_ok_always_false() {
        let envelope = ErrorEnvelope::new(
            "run",
            "inventory",
            ErrorInfo::new("BATCH_ABORTED", "Batch aborted after 1 of 3 roles: DROP ROLE failed"),
        );
        assert!(!envelope.ok);
    }
}
