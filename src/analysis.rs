//! Role Ownership Analysis
//!
//! Inspects one role and classifies it for the strategy selector: does it
//! own relations, sequences, or views, and does it currently have open
//! sessions? Analysis is read-only; all catalog access goes through the
//! [`RoleStore`] boundary.
//!
//! A role with open sessions is always reported
//! `has_active_connections = true` regardless of ownership; downstream,
//! that predicate takes priority.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RolesweepError};
use crate::store::RoleStore;

/// Classification of one role at analysis time
///
/// Created fresh per analysis call and never mutated; not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAnalysis {
    /// Role name, case-sensitive as stored by the database
    pub role_name: String,

    /// Whether the role owns any relation, sequence, or view
    pub owns_objects: bool,

    /// Whether the role currently has open sessions/backends
    pub has_active_connections: bool,

    /// Number of owned relations, sequences, and views
    pub object_count: i64,

    /// Number of open sessions/backends for the role
    pub session_count: i64,
}

/// Analyze one role
///
/// # Returns
/// * `Ok(RoleAnalysis)` describing ownership and session state
/// * `Err(RolesweepError::RoleNotFound)` if the role is absent from the catalog
pub async fn analyze_role<S: RoleStore>(store: &S, role_name: &str) -> Result<RoleAnalysis> {
    if !store.role_exists(role_name).await? {
        return Err(RolesweepError::role_not_found(role_name));
    }

    let object_count = store.owned_object_count(role_name).await?;
    let session_count = store.session_count(role_name).await?;

    Ok(RoleAnalysis {
        role_name: role_name.to_string(),
        owns_objects: object_count > 0,
        has_active_connections: session_count > 0,
        object_count,
        session_count,
    })
}
