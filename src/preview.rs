//! Deletion Preview
//!
//! Read-only view of what a batch would do: per-role strategy, the exact
//! statements, and aggregate recommendations. The GUI renders this in its
//! confirmation dialog before the operator commits to a run.
//!
//! Previews never execute statements and never fail for an individual
//! role; a role that cannot be analyzed is marked as such and the rest of
//! the report is still produced. Running the same preview twice against an
//! unchanged database yields the same report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::RoleAnalysis;
use crate::orchestrator::{BatchConfig, DeletionEngine, Disposition, PlannedRole, TargetGate};
use crate::store::RoleStore;
use crate::strategy::DeletionStrategy;

/// Planned handling of one role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePlan {
    /// Role as requested
    pub role_name: String,

    /// Selected strategy; `None` when the role could not be analyzed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeletionStrategy>,

    /// Ownership and session analysis, when it succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RoleAnalysis>,

    /// Statements a run would execute for this role
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub statements: Vec<String>,

    /// Why the role cannot be deleted as requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RolePlan {
    fn from_planned(role_name: &str, planned: PlannedRole) -> Self {
        match planned.disposition {
            Disposition::Execute { strategy, statements } => Self {
                role_name: role_name.to_string(),
                strategy: Some(strategy),
                analysis: planned.analysis,
                statements,
                error: None,
            },
            Disposition::Refuse { strategy, reason } => Self {
                role_name: role_name.to_string(),
                strategy,
                analysis: planned.analysis,
                statements: Vec::new(),
                error: Some(reason),
            },
        }
    }
}

/// What a deletion batch would do, without doing it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewReport {
    /// Target that would receive reassigned objects
    pub reassign_to: String,

    /// One entry per requested role, in request order
    pub entries: Vec<RolePlan>,

    /// How many roles each strategy was selected for
    pub strategy_tally: BTreeMap<DeletionStrategy, usize>,

    /// Roles whose analysis failed
    pub unanalyzable_count: usize,

    /// Operator guidance derived from the entries
    pub recommendations: Vec<String>,
}

impl PreviewReport {
    fn assemble(reassign_to: String, entries: Vec<RolePlan>) -> Self {
        let mut strategy_tally = BTreeMap::new();
        let mut unanalyzable_count = 0;
        for entry in &entries {
            if let Some(strategy) = entry.strategy {
                *strategy_tally.entry(strategy).or_insert(0) += 1;
            }
            if entry.analysis.is_none() {
                unanalyzable_count += 1;
            }
        }

        let recommendations =
            build_recommendations(&entries, &strategy_tally, unanalyzable_count, &reassign_to);

        Self { reassign_to, entries, strategy_tally, unanalyzable_count, recommendations }
    }

    /// Render all planned statements as one executable SQL script
    ///
    /// Roles without statements (blocked or unanalyzable) are omitted.
    #[must_use]
    pub fn sql_script(&self) -> String {
        let mut script = String::new();
        for entry in &self.entries {
            if entry.statements.is_empty() {
                continue;
            }
            script.push_str(&format!("-- {}\n", entry.role_name));
            for statement in &entry.statements {
                script.push_str(statement);
                script.push_str(";\n");
            }
        }
        script
    }
}

fn build_recommendations(
    entries: &[RolePlan],
    tally: &BTreeMap<DeletionStrategy, usize>,
    unanalyzable_count: usize,
    reassign_to: &str,
) -> Vec<String> {
    if entries.is_empty() {
        return Vec::new();
    }

    let mut recommendations = Vec::new();

    if let Some(&blocked) = tally.get(&DeletionStrategy::SkipBlocked) {
        recommendations.push(format!(
            "{blocked} role(s) have open sessions; disconnect them and preview again"
        ));
    }

    if let Some(&owners) = tally.get(&DeletionStrategy::ReassignAndDrop) {
        recommendations.push(format!(
            "{owners} role(s) own objects that will be reassigned to {reassign_to:?}"
        ));
    }

    if unanalyzable_count > 0 {
        recommendations.push(format!(
            "{unanalyzable_count} role(s) could not be analyzed; resolve the reported errors first"
        ));
    }

    if recommendations.is_empty() {
        recommendations.push("all roles can be deleted without reassignment".to_string());
    }

    recommendations
}

impl<S: RoleStore> DeletionEngine<S> {
    /// Plan the batch without executing anything
    ///
    /// Applies the same analysis, strategy selection, and reassignment
    /// target checks as [`run`](Self::run), then stops. An empty request
    /// yields an empty report.
    pub async fn preview(&self, roles: &[String], config: &BatchConfig) -> PreviewReport {
        let mut entries = Vec::with_capacity(roles.len());
        let mut gate = TargetGate::Unchecked;

        for role_name in roles {
            let planned =
                self.plan_role(role_name, roles, &config.reassign_to_user, &mut gate).await;
            entries.push(RolePlan::from_planned(role_name, planned));
        }

        PreviewReport::assemble(config.reassign_to_user.clone(), entries)
    }
}
