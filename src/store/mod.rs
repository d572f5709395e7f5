//! Database Boundary
//!
//! This module defines the [`RoleStore`] trait (the narrow seam between the
//! deletion engine and the database) and the connection configuration it is
//! opened with. The production implementation lives in [`postgres`]; batch
//! semantics are tested against in-memory stores implementing the same trait.
//!
//! # Design
//! - Catalog reads are semantic (`role_exists`, `owned_object_count`,
//!   `session_count`), not raw SQL, so the engine never assembles queries.
//! - Transaction control is explicit (`begin`/`commit`/`rollback`): the
//!   orchestrator owns the boundary placement, one connection, no nesting.
//! - All methods take `&self`; implementations use interior mutability or a
//!   pipelined client.

pub mod postgres;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Connection parameters for the administrative session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Hostname
    pub host: String,

    /// Port number
    pub port: u16,

    /// Username (must hold privileges for `REASSIGN OWNED`/`DROP OWNED`/`DROP ROLE`)
    pub user: String,

    /// Password; omit for trust/peer authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name
    pub dbname: String,
}

impl ConnectionConfig {
    /// Create a connection configuration
    #[must_use]
    pub const fn new(
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        dbname: String,
    ) -> Self {
        Self { host, port, user, password, dbname }
    }
}

/// Administrative database session used by the deletion engine
///
/// One instance wraps one connection. The engine issues all per-role work
/// sequentially through it; implementations must not open extra sessions.
pub trait RoleStore {
    /// Whether a role exists in the catalog
    fn role_exists(&self, role: &str) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Number of relations, sequences, and views owned by the role
    fn owned_object_count(
        &self,
        role: &str,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Number of open sessions/backends belonging to the role
    fn session_count(&self, role: &str)
        -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Open a transaction on the session
    fn begin(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Commit the current transaction
    fn commit(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Roll back the current transaction
    fn rollback(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Execute one DDL statement
    ///
    /// Failures carry the driver message verbatim so outcomes stay
    /// diagnosable by the operator.
    fn execute(&self, statement: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
