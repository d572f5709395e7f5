//! `PostgreSQL` Role Store
//!
//! Production [`RoleStore`] implementation on `tokio-postgres`.
//!
//! # Implementation Notes
//! - One `Client` per store instance; the connection driver runs in a
//!   spawned task. Connection errors are not logged to prevent credential
//!   leakage.
//! - Catalog reads are parameterized queries against `pg_catalog`.
//! - Transaction control and DDL go through `batch_execute` (simple query
//!   protocol): `REASSIGN OWNED`/`DROP OWNED`/`DROP ROLE` take no
//!   parameters, and the orchestrator places the `BEGIN`/`COMMIT`/`ROLLBACK`
//!   boundaries itself.

use serde::{Deserialize, Serialize};
use tokio_postgres::{Client, Config, NoTls};

use crate::error::{Result, RolesweepError};
use crate::store::{ConnectionConfig, RoleStore};

/// Role existence probe
const ROLE_EXISTS_SQL: &str = "SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1";

/// Owned relations, sequences, and views ('r', 'S', 'v')
const OWNED_OBJECTS_SQL: &str = "\
    SELECT count(*) \
    FROM pg_catalog.pg_class c \
    JOIN pg_catalog.pg_roles r ON r.oid = c.relowner \
    WHERE r.rolname = $1 AND c.relkind IN ('r', 'S', 'v')";

/// Open sessions for the role; idle backends count as open sessions
const SESSION_COUNT_SQL: &str =
    "SELECT count(*) FROM pg_catalog.pg_stat_activity WHERE usename = $1";

/// Server identity reported by `connect test`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Full `version()` string
    pub server_version: String,

    /// Database the session is connected to
    pub database: String,

    /// Session user
    pub user: String,
}

/// Administrative session against one `PostgreSQL` database
pub struct PgRoleStore {
    client: Client,
}

impl PgRoleStore {
    /// Open the administrative session
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let pg_config = build_pg_config(config);

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            RolesweepError::connection_failed(format!("Failed to connect to PostgreSQL: {e}"))
        })?;

        // Drive the connection until the client is dropped
        tokio::spawn(async move {
            let _ = connection.await;
        });

        Ok(Self { client })
    }

    /// Report server version, database, and session user
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let row = self
            .client
            .query_one("SELECT version(), current_database(), current_user", &[])
            .await
            .map_err(|e| {
                RolesweepError::connection_failed(format!("Failed to query server info: {e}"))
            })?;

        Ok(ServerInfo { server_version: row.get(0), database: row.get(1), user: row.get(2) })
    }
}

impl RoleStore for PgRoleStore {
    async fn role_exists(&self, role: &str) -> Result<bool> {
        let row = self.client.query_opt(ROLE_EXISTS_SQL, &[&role]).await.map_err(|e| {
            RolesweepError::statement_execution(format!(
                "Failed to check existence of role '{role}': {e}"
            ))
        })?;

        Ok(row.is_some())
    }

    async fn owned_object_count(&self, role: &str) -> Result<i64> {
        let row = self.client.query_one(OWNED_OBJECTS_SQL, &[&role]).await.map_err(|e| {
            RolesweepError::statement_execution(format!(
                "Failed to count objects owned by role '{role}': {e}"
            ))
        })?;

        Ok(row.get(0))
    }

    async fn session_count(&self, role: &str) -> Result<i64> {
        let row = self.client.query_one(SESSION_COUNT_SQL, &[&role]).await.map_err(|e| {
            RolesweepError::statement_execution(format!(
                "Failed to count sessions for role '{role}': {e}"
            ))
        })?;

        Ok(row.get(0))
    }

    async fn begin(&self) -> Result<()> {
        self.client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| RolesweepError::statement_execution(e.to_string()))
    }

    async fn commit(&self) -> Result<()> {
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| RolesweepError::statement_execution(e.to_string()))
    }

    async fn rollback(&self) -> Result<()> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| RolesweepError::statement_execution(e.to_string()))
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        // Driver message kept verbatim for operator diagnosis
        self.client
            .batch_execute(statement)
            .await
            .map_err(|e| RolesweepError::statement_execution(e.to_string()))
    }
}

/// Build a `tokio_postgres::Config` from [`ConnectionConfig`]
fn build_pg_config(config: &ConnectionConfig) -> Config {
    let mut pg_config = Config::new();
    pg_config
        .host(&config.host)
        .port(config.port)
        .user(&config.user)
        .dbname(&config.dbname)
        .application_name("rolesweep");

    if let Some(password) = &config.password {
        pg_config.password(password);
    }

    pg_config
}
