//! Deletion Strategy Selection
//!
//! Maps an ownership analysis to the remediation strategy for one role.
//! The decision table is ordered and the first match wins:
//!
//! 1. Role has open sessions → [`DeletionStrategy::SkipBlocked`]
//! 2. Role owns objects → [`DeletionStrategy::ReassignAndDrop`]
//! 3. Otherwise → [`DeletionStrategy::DropPermissionsOnly`]
//!
//! A connected role cannot be safely dropped (in-flight transactions may
//! re-create dependencies), so the session check takes priority over
//! ownership. Ownership must be resolved before privilege cleanup to avoid
//! orphaned objects.

use serde::{Deserialize, Serialize};

use crate::analysis::RoleAnalysis;

/// Remediation strategy for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStrategy {
    /// Transfer owned objects to the reassignment target, then drop
    ReassignAndDrop,
    /// Role owns nothing; drop its remaining privileges, then the role
    DropPermissionsOnly,
    /// Role has open sessions; leave it untouched and defer to the operator
    SkipBlocked,
}

impl DeletionStrategy {
    /// Get the strategy name as a string (matches the serialized form)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReassignAndDrop => "reassign_and_drop",
            Self::DropPermissionsOnly => "drop_permissions_only",
            Self::SkipBlocked => "skip_blocked",
        }
    }
}

impl std::fmt::Display for DeletionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Select the remediation strategy for an analyzed role
///
/// Total function: every analysis maps to exactly one strategy.
#[must_use]
pub const fn select_strategy(analysis: &RoleAnalysis) -> DeletionStrategy {
    if analysis.has_active_connections {
        DeletionStrategy::SkipBlocked
    } else if analysis.owns_objects {
        DeletionStrategy::ReassignAndDrop
    } else {
        DeletionStrategy::DropPermissionsOnly
    }
}
