//! Statement Building and Identifier Quoting
//!
//! This module turns a role name and its selected strategy into the ordered
//! SQL statement sequence that remediates and drops the role.
//!
//! # Identifier Safety
//! Role names and reassignment targets are interpolated into DDL, which
//! cannot be parameterized, so every identifier goes through one dedicated
//! routine: [`validate_identifier`] enforces an explicit grammar and
//! [`quote_identifier`] emits the double-quoted form. Direct string
//! concatenation of raw names is never used.
//!
//! # Identifier Grammar
//! - non-empty, at most 63 bytes (the server truncates longer names)
//! - dot-separated segments of ASCII alphanumerics and underscore
//! - no empty segments (no leading/trailing/consecutive dots)
//!
//! A dotted name like `ana.silva` is one role identifier; the dot is an
//! ordinary character preserved by quoting, not a qualifier.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RolesweepError};
use crate::strategy::DeletionStrategy;

/// Server-side identifier length limit (NAMEDATALEN - 1)
const MAX_IDENTIFIER_BYTES: usize = 63;

/// Ordered SQL statement sequence for one role
///
/// Immutable once built; `SkipBlocked` plans carry no statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPlan {
    /// Strategy the statements implement
    pub strategy: DeletionStrategy,

    /// Statements in execution order
    pub statements: Vec<String>,
}

impl StatementPlan {
    /// Whether the plan touches the database at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Validate a role name against the identifier grammar
///
/// # Returns
/// * `Ok(())` if the name is safe to quote and interpolate
/// * `Err(RolesweepError::InvalidIdentifier)` describing the first violation
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RolesweepError::invalid_identifier("identifier is empty"));
    }

    if name.len() > MAX_IDENTIFIER_BYTES {
        return Err(RolesweepError::invalid_identifier(format!(
            "identifier {name:?} exceeds {MAX_IDENTIFIER_BYTES} bytes"
        )));
    }

    for segment in name.split('.') {
        if segment.is_empty() {
            return Err(RolesweepError::invalid_identifier(format!(
                "identifier {name:?} has an empty dot-separated segment"
            )));
        }

        for ch in segment.chars() {
            if !ch.is_ascii_alphanumeric() && ch != '_' {
                return Err(RolesweepError::invalid_identifier(format!(
                    "identifier {name:?} contains disallowed character {ch:?}"
                )));
            }
        }
    }

    Ok(())
}

/// Quote a validated name as a SQL identifier
///
/// Wraps the name in double quotes and doubles any embedded quote, so the
/// result is byte-exact and case-sensitive. Callers must run
/// [`validate_identifier`] first; quoting alone is not a safety check.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Build the statement plan for one role
///
/// Mapping:
/// - `ReassignAndDrop` → `REASSIGN OWNED BY`, `DROP OWNED BY`, `DROP ROLE`
/// - `DropPermissionsOnly` → `DROP OWNED BY`, `DROP ROLE`
/// - `SkipBlocked` → empty plan; the role is not touched
///
/// The reassignment target is validated only when the plan actually
/// reassigns: a bad target must not fail roles that never use it.
pub fn build_plan(
    role_name: &str,
    strategy: DeletionStrategy,
    reassign_to: &str,
) -> Result<StatementPlan> {
    validate_identifier(role_name)?;

    let role = quote_identifier(role_name);

    let statements = match strategy {
        DeletionStrategy::ReassignAndDrop => {
            validate_identifier(reassign_to)?;
            let target = quote_identifier(reassign_to);
            vec![
                format!("REASSIGN OWNED BY {role} TO {target}"),
                format!("DROP OWNED BY {role}"),
                format!("DROP ROLE {role}"),
            ]
        }
        DeletionStrategy::DropPermissionsOnly => {
            vec![format!("DROP OWNED BY {role}"), format!("DROP ROLE {role}")]
        }
        DeletionStrategy::SkipBlocked => Vec::new(),
    };

    Ok(StatementPlan { strategy, statements })
}
