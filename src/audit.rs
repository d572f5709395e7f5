//! Audit Trail
//!
//! Records every deletion attempt, including dry runs and failures, so an
//! administrator can reconstruct what a batch did.
//!
//! # Sections
//! - [`AuditEntry`]: one recorded action
//! - [`AuditSink`]: recording seam, injected into the engine
//! - [`MemoryAuditLog`]: bounded in-memory sink, the default

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::DeletionStrategy;

/// Entries kept by [`MemoryAuditLog`] before the oldest is discarded
const DEFAULT_CAPACITY: usize = 1024;

/// One audited action within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the action was recorded
    pub timestamp: DateTime<Utc>,

    /// Batch the action belongs to
    pub batch_id: Uuid,

    /// Action name, e.g. `delete_role` or `batch_completed`
    pub operation: String,

    /// Role acted on; `None` for batch-level entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,

    /// Strategy applied to the role, when one was selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeletionStrategy>,

    /// Whether the action succeeded
    pub succeeded: bool,

    /// Whether the batch ran in dry-run mode
    pub dry_run: bool,

    /// Statements executed (or planned, under dry run)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub statements: Vec<String>,

    /// Failure message, when the action failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    /// Entry for one role's outcome
    pub fn for_role(
        batch_id: Uuid,
        role_name: impl Into<String>,
        strategy: Option<DeletionStrategy>,
        succeeded: bool,
        dry_run: bool,
        statements: Vec<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_id,
            operation: "delete_role".to_string(),
            role_name: Some(role_name.into()),
            strategy,
            succeeded,
            dry_run,
            statements,
            error,
        }
    }

    /// Entry summarizing a finished batch
    pub fn for_batch(batch_id: Uuid, succeeded: bool, dry_run: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_id,
            operation: "batch_completed".to_string(),
            role_name: None,
            strategy: None,
            succeeded,
            dry_run,
            statements: Vec::new(),
            error: None,
        }
    }
}

/// Recording seam for audit entries
///
/// Implementations must not panic; the engine calls [`record`] on every
/// outcome, including failures it is about to report.
///
/// [`record`]: AuditSink::record
pub trait AuditSink: Send + Sync {
    /// Record one entry
    fn record(&self, entry: AuditEntry);
}

/// Bounded in-memory audit sink
///
/// Keeps the most recent entries up to a fixed capacity. Suitable for a
/// single administrative session; a persistent sink would implement
/// [`AuditSink`] over a file or table instead.
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
    capacity: usize,
}

impl MemoryAuditLog {
    /// Sink retaining up to `capacity` entries; a capacity of zero retains
    /// nothing
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Mutex::new(Vec::new()), capacity }
    }

    /// Snapshot of the recorded entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        tracing::debug!(
            operation = %entry.operation,
            role = entry.role_name.as_deref().unwrap_or("-"),
            succeeded = entry.succeeded,
            dry_run = entry.dry_run,
            "audit"
        );

        if self.capacity == 0 {
            return;
        }

        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if guard.len() == self.capacity {
            guard.remove(0);
        }
        guard.push(entry);
    }
}
