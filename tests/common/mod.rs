//! Shared test fixtures
//!
//! [`FakeStore`] is an in-memory [`RoleStore`] with a statement journal and
//! scripted failures, so batch behavior can be asserted without PostgreSQL.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use rolesweep::error::{Result, RolesweepError};
use rolesweep::store::RoleStore;

#[derive(Clone, Copy)]
struct FakeRole {
    objects: i64,
    sessions: i64,
}

#[derive(Default)]
struct FakeState {
    roles: HashMap<String, FakeRole>,
    /// Successful statements in send order, including BEGIN/COMMIT/ROLLBACK
    journal: Vec<String>,
    /// (statement substring, error message) pairs that make a send fail
    fail_on: Vec<(String, String)>,
}

/// In-memory role store for behavioral tests
///
/// Executing `DROP ROLE` removes the role from the catalog and `DROP OWNED`
/// / `REASSIGN OWNED` zero the owner's object count, so re-analysis after a
/// run observes the simulated effects. Rollback is journaled but not
/// replayed against the catalog; tests asserting rollback behavior check
/// the journal and the reported outcomes.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role with the given owned-object and open-session counts
    pub fn with_role(self, name: &str, objects: i64, sessions: i64) -> Self {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(name.to_string(), FakeRole { objects, sessions });
        self
    }

    /// Make any statement containing `needle` fail with `message`
    pub fn fail_on(self, needle: &str, message: &str) -> Self {
        self.state.lock().unwrap().fail_on.push((needle.to_string(), message.to_string()));
        self
    }

    /// Successful statements in send order
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().unwrap().journal.clone()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.state.lock().unwrap().roles.contains_key(name)
    }

    fn send(&self, statement: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        for (needle, message) in &state.fail_on {
            if statement.contains(needle.as_str()) {
                return Err(RolesweepError::statement_execution(message.clone()));
            }
        }

        state.journal.push(statement.to_string());

        if let Some(role) = statement.strip_prefix("DROP ROLE ") {
            let role = unquote(role);
            state.roles.remove(&role);
        } else if let Some(role) = statement.strip_prefix("DROP OWNED BY ") {
            let role = unquote(role);
            if let Some(entry) = state.roles.get_mut(&role) {
                entry.objects = 0;
            }
        } else if let Some(rest) = statement.strip_prefix("REASSIGN OWNED BY ") {
            if let Some((role, _target)) = rest.split_once(" TO ") {
                let role = unquote(role);
                if let Some(entry) = state.roles.get_mut(&role) {
                    entry.objects = 0;
                }
            }
        }

        Ok(())
    }
}

fn unquote(identifier: &str) -> String {
    identifier.trim_matches('"').replace("\"\"", "\"")
}

impl RoleStore for FakeStore {
    fn role_exists(&self, role: &str) -> impl Future<Output = Result<bool>> + Send {
        let result = Ok(self.state.lock().unwrap().roles.contains_key(role));
        async move { result }
    }

    fn owned_object_count(&self, role: &str) -> impl Future<Output = Result<i64>> + Send {
        let result =
            Ok(self.state.lock().unwrap().roles.get(role).map_or(0, |entry| entry.objects));
        async move { result }
    }

    fn session_count(&self, role: &str) -> impl Future<Output = Result<i64>> + Send {
        let result =
            Ok(self.state.lock().unwrap().roles.get(role).map_or(0, |entry| entry.sessions));
        async move { result }
    }

    fn begin(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.send("BEGIN");
        async move { result }
    }

    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.send("COMMIT");
        async move { result }
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.send("ROLLBACK");
        async move { result }
    }

    fn execute(&self, statement: &str) -> impl Future<Output = Result<()>> + Send {
        let result = self.send(statement);
        async move { result }
    }
}
