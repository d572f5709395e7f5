//! Batch Deletion Orchestrator
//!
//! Drives role deletion end to end: analyze each role, select a strategy,
//! build the statement plan, execute it transactionally, and report one
//! outcome per requested role.
//!
//! # Sections
//! - [`BatchConfig`]: operator knobs for a batch
//! - [`RoleOutcome`] / [`BatchResult`]: per-role and batch-level reports
//! - [`StopSignal`]: cooperative cancellation between roles
//! - [`DeletionEngine`]: the orchestrator itself
//!
//! # Transaction Modes
//! With `transaction_per_role` on (the default) every role gets its own
//! transaction and failures are isolated. With it off, all roles share one
//! transaction: any failure rolls back every change and marks the batch
//! aborted. Dry runs never open a transaction in either mode.
//!
//! # Side Effects
//! Cache invalidation, the `RoleDeleted` event, and the deletion counters
//! fire only after a deletion has committed. Audit entries are recorded for
//! every outcome, dry runs included.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{analyze_role, RoleAnalysis};
use crate::audit::{AuditEntry, AuditSink, MemoryAuditLog};
use crate::cache::TagCache;
use crate::error::{Result, RolesweepError};
use crate::events::{EngineEvent, EventBus};
use crate::metrics::{EngineMetrics, BATCH_DURATION, ROLES_DELETED, ROLE_DELETE_FAILURES};
use crate::statement::{build_plan, validate_identifier};
use crate::store::RoleStore;
use crate::strategy::{select_strategy, DeletionStrategy};

/// Cache tags invalidated after a committed deletion
const INVALIDATED_TAGS: [&str; 2] = ["users", "roles"];

/// Outcome error for roles whose statements were undone by a shared
/// transaction rollback
const ROLLED_BACK_MESSAGE: &str = "rolled back with the batch transaction";

/// Operator knobs for one deletion batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Role receiving ownership of reassigned objects
    pub reassign_to_user: String,

    /// Plan and report without executing anything
    pub dry_run: bool,

    /// Keep processing remaining roles after a failure
    pub continue_on_error: bool,

    /// One transaction per role (on) or one shared transaction for the
    /// whole batch (off)
    pub transaction_per_role: bool,

    /// Log each role's outcome, not just the batch summary
    pub log_details: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            reassign_to_user: "postgres".to_string(),
            dry_run: false,
            continue_on_error: true,
            transaction_per_role: true,
            log_details: true,
        }
    }
}

/// Result of processing one requested role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleOutcome {
    /// Role as requested (order and duplicates preserved in the batch)
    pub role_name: String,

    /// Strategy selected for the role; `None` when analysis failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_applied: Option<DeletionStrategy>,

    /// Whether the role's deletion took effect (or would, under dry run)
    pub succeeded: bool,

    /// Failure message; present exactly when `succeeded` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Statements sent for this role; planned statements under dry run
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub statements_executed: Vec<String>,
}

impl RoleOutcome {
    fn success(role_name: &str, strategy: DeletionStrategy, statements: Vec<String>) -> Self {
        Self {
            role_name: role_name.to_string(),
            strategy_applied: Some(strategy),
            succeeded: true,
            error: None,
            statements_executed: statements,
        }
    }

    fn failure(role_name: &str, strategy: Option<DeletionStrategy>, error: String) -> Self {
        Self {
            role_name: role_name.to_string(),
            strategy_applied: strategy,
            succeeded: false,
            error: Some(error),
            statements_executed: Vec::new(),
        }
    }
}

/// Report for one finished batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Identifier tying outcomes, audit entries, and logs together
    pub batch_id: Uuid,

    /// Number of roles in the request, including any the batch never
    /// reached after an abort
    pub requested: usize,

    /// Number of roles processed, always equal to `outcomes.len()`
    pub total: usize,

    /// Outcomes with `succeeded` set
    pub succeeded_count: usize,

    /// Outcomes with `succeeded` unset
    pub failed_count: usize,

    /// One outcome per processed role, in request order
    pub outcomes: Vec<RoleOutcome>,

    /// How many roles each strategy was selected for
    pub strategy_tally: BTreeMap<DeletionStrategy, usize>,

    /// Whether the batch stopped before processing every requested role
    /// or rolled back a shared transaction
    pub aborted: bool,

    /// Wall-clock duration of the batch
    pub duration_ms: u64,
}

impl BatchResult {
    /// Error out when the batch was aborted
    ///
    /// Callers that treat an aborted batch as a hard failure (the GUI's
    /// single-transaction mode does) call this instead of inspecting
    /// [`aborted`](Self::aborted) by hand.
    pub fn ensure_completed(&self) -> Result<()> {
        if !self.aborted {
            return Ok(());
        }

        let cause = self
            .outcomes
            .iter()
            .rev()
            .find_map(|outcome| outcome.error.clone())
            .unwrap_or_else(|| "stop requested".to_string());

        Err(RolesweepError::batch_aborted(self.total, self.requested, cause))
    }
}

/// Cooperative cancellation flag checked between roles
///
/// Cloning shares the flag, so the GUI keeps one clone wired to its cancel
/// button and hands the other to the engine.
#[derive(Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Fresh, unset signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the engine to stop before the next role
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-role planning result shared by `run` and `preview`
pub(crate) struct PlannedRole {
    pub(crate) analysis: Option<RoleAnalysis>,
    pub(crate) disposition: Disposition,
}

/// What planning decided for a role
pub(crate) enum Disposition {
    /// Statements are ready to execute
    Execute { strategy: DeletionStrategy, statements: Vec<String> },
    /// The role cannot be deleted as requested
    Refuse { strategy: Option<DeletionStrategy>, reason: String },
}

/// Memoized validity of the reassignment target, one probe per batch
pub(crate) enum TargetGate {
    Unchecked,
    Open,
    Refused(String),
}

type ProgressFn = dyn Fn(&RoleOutcome) + Send + Sync;

/// Orchestrates analysis, strategy selection, statement execution, and
/// reporting for role deletion batches
///
/// Collaborators default to in-memory implementations and are replaced
/// through the `with_*` builders, so the GUI injects its shared cache,
/// metrics registry, and event bus while tests observe them directly.
pub struct DeletionEngine<S: RoleStore> {
    store: S,
    audit: Arc<dyn AuditSink>,
    cache: Arc<TagCache>,
    metrics: Arc<EngineMetrics>,
    events: Arc<EventBus>,
    stop: StopSignal,
    progress: Option<Arc<ProgressFn>>,
}

impl<S: RoleStore> DeletionEngine<S> {
    /// Engine over `store` with default in-memory collaborators
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: Arc::new(MemoryAuditLog::default()),
            cache: Arc::new(TagCache::new()),
            metrics: Arc::new(EngineMetrics::new()),
            events: Arc::new(EventBus::new()),
            stop: StopSignal::new(),
            progress: None,
        }
    }

    /// Replace the audit sink
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Share a cache whose `users`/`roles` tags are invalidated on commit
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TagCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Share a metrics registry
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Share an event bus receiving `RoleDeleted` events
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Wire a cancellation flag checked between roles
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Invoke `progress` after each role reaches its final outcome
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(&RoleOutcome) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Analyze one role's ownership and session state
    pub async fn analyze(&self, role_name: &str) -> Result<RoleAnalysis> {
        analyze_role(&self.store, role_name).await
    }

    /// Delete the requested roles according to `config`
    ///
    /// Returns one outcome per processed role, in request order with
    /// duplicates preserved. Per-role problems (missing role, blocked
    /// sessions, failed statements) become failed outcomes; only an empty
    /// request errors out directly.
    pub async fn run(&self, roles: &[String], config: &BatchConfig) -> Result<BatchResult> {
        if roles.is_empty() {
            return Err(RolesweepError::invalid_batch("at least one role name is required"));
        }

        let batch_id = Uuid::new_v4();
        let started_at = Instant::now();
        let _timer = self.metrics.time(BATCH_DURATION);

        tracing::info!(
            %batch_id,
            roles = roles.len(),
            dry_run = config.dry_run,
            transaction_per_role = config.transaction_per_role,
            "starting deletion batch"
        );

        let shared_txn = !config.transaction_per_role && !config.dry_run;
        let (outcomes, aborted) = if shared_txn {
            self.run_shared(roles, config, batch_id).await
        } else {
            self.run_per_role(roles, config, batch_id).await
        };

        let mut strategy_tally = BTreeMap::new();
        let mut succeeded_count = 0;
        for outcome in &outcomes {
            if outcome.succeeded {
                succeeded_count += 1;
            }
            if let Some(strategy) = outcome.strategy_applied {
                *strategy_tally.entry(strategy).or_insert(0) += 1;
            }
        }
        let failed_count = outcomes.len() - succeeded_count;

        self.audit.record(AuditEntry::for_batch(
            batch_id,
            failed_count == 0 && !aborted,
            config.dry_run,
        ));

        tracing::info!(
            %batch_id,
            succeeded = succeeded_count,
            failed = failed_count,
            aborted,
            "deletion batch finished"
        );

        Ok(BatchResult {
            batch_id,
            requested: roles.len(),
            total: outcomes.len(),
            succeeded_count,
            failed_count,
            outcomes,
            strategy_tally,
            aborted,
            duration_ms: u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Analyze a role, select its strategy, gate the reassignment target,
    /// and build its statements, without executing anything
    pub(crate) async fn plan_role(
        &self,
        role_name: &str,
        batch: &[String],
        reassign_to: &str,
        gate: &mut TargetGate,
    ) -> PlannedRole {
        let analysis = match analyze_role(&self.store, role_name).await {
            Ok(analysis) => analysis,
            Err(e) => {
                return PlannedRole {
                    analysis: None,
                    disposition: Disposition::Refuse { strategy: None, reason: e.message() },
                }
            }
        };

        let strategy = select_strategy(&analysis);

        if strategy == DeletionStrategy::SkipBlocked {
            let reason =
                format!("{} open session(s) block deletion", analysis.session_count);
            return PlannedRole {
                analysis: Some(analysis),
                disposition: Disposition::Refuse { strategy: Some(strategy), reason },
            };
        }

        if strategy == DeletionStrategy::ReassignAndDrop {
            if let Some(reason) = self.reassign_target_refusal(reassign_to, batch, gate).await {
                return PlannedRole {
                    analysis: Some(analysis),
                    disposition: Disposition::Refuse { strategy: Some(strategy), reason },
                };
            }
        }

        match build_plan(role_name, strategy, reassign_to) {
            Ok(plan) => PlannedRole {
                analysis: Some(analysis),
                disposition: Disposition::Execute { strategy, statements: plan.statements },
            },
            Err(e) => PlannedRole {
                analysis: Some(analysis),
                disposition: Disposition::Refuse { strategy: Some(strategy), reason: e.message() },
            },
        }
    }

    /// Validate the reassignment target once per batch and replay the
    /// verdict for every owning role
    async fn reassign_target_refusal(
        &self,
        target: &str,
        batch: &[String],
        gate: &mut TargetGate,
    ) -> Option<String> {
        if matches!(gate, TargetGate::Unchecked) {
            *gate = match self.check_reassign_target(target, batch).await {
                None => TargetGate::Open,
                Some(reason) => TargetGate::Refused(reason),
            };
        }

        match gate {
            TargetGate::Refused(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    async fn check_reassign_target(&self, target: &str, batch: &[String]) -> Option<String> {
        if let Err(e) = validate_identifier(target) {
            return Some(e.message());
        }

        if batch.iter().any(|role| role == target) {
            let e = RolesweepError::invalid_identifier(format!(
                "reassign target {target:?} is among the roles being deleted"
            ));
            return Some(e.message());
        }

        match self.store.role_exists(target).await {
            Ok(true) => None,
            Ok(false) => {
                let e = RolesweepError::invalid_identifier(format!(
                    "reassign target {target:?} does not exist"
                ));
                Some(e.message())
            }
            Err(e) => Some(e.message()),
        }
    }

    /// Isolated mode: one transaction per role; also handles dry runs,
    /// which execute nothing in either mode
    async fn run_per_role(
        &self,
        roles: &[String],
        config: &BatchConfig,
        batch_id: Uuid,
    ) -> (Vec<RoleOutcome>, bool) {
        let mut outcomes = Vec::with_capacity(roles.len());
        let mut aborted = false;
        let mut gate = TargetGate::Unchecked;

        for role_name in roles {
            if self.stop.is_requested() {
                tracing::warn!(%batch_id, "stop requested; remaining roles not processed");
                aborted = true;
                break;
            }

            let planned =
                self.plan_role(role_name, roles, &config.reassign_to_user, &mut gate).await;

            let outcome = match planned.disposition {
                Disposition::Refuse { strategy, reason } => {
                    RoleOutcome::failure(role_name, strategy, reason)
                }
                Disposition::Execute { strategy, statements } => {
                    if config.dry_run {
                        RoleOutcome::success(role_name, strategy, statements)
                    } else {
                        self.execute_own_transaction(role_name, strategy, statements).await
                    }
                }
            };

            self.record_outcome(&outcome, config, batch_id);
            let failed = !outcome.succeeded;
            outcomes.push(outcome);

            if failed && !config.continue_on_error {
                aborted = true;
                break;
            }
        }

        (outcomes, aborted)
    }

    /// Execute one role's statements inside its own transaction
    async fn execute_own_transaction(
        &self,
        role_name: &str,
        strategy: DeletionStrategy,
        statements: Vec<String>,
    ) -> RoleOutcome {
        if let Err(e) = self.store.begin().await {
            return RoleOutcome::failure(role_name, Some(strategy), e.message());
        }

        let mut sent = Vec::with_capacity(statements.len());
        for statement in &statements {
            tracing::debug!(role = role_name, %statement, "executing");
            if let Err(e) = self.store.execute(statement).await {
                if let Err(rollback_err) = self.store.rollback().await {
                    tracing::warn!(error = %rollback_err.message(), "rollback failed");
                }
                return RoleOutcome {
                    role_name: role_name.to_string(),
                    strategy_applied: Some(strategy),
                    succeeded: false,
                    error: Some(e.message()),
                    statements_executed: sent,
                };
            }
            sent.push(statement.clone());
        }

        if let Err(e) = self.store.commit().await {
            return RoleOutcome {
                role_name: role_name.to_string(),
                strategy_applied: Some(strategy),
                succeeded: false,
                error: Some(e.message()),
                statements_executed: sent,
            };
        }

        RoleOutcome::success(role_name, strategy, sent)
    }

    /// Shared mode: every role's statements in one transaction; any
    /// failure (including a refusal) rolls everything back
    async fn run_shared(
        &self,
        roles: &[String],
        config: &BatchConfig,
        batch_id: Uuid,
    ) -> (Vec<RoleOutcome>, bool) {
        let mut pending: Vec<RoleOutcome> = Vec::with_capacity(roles.len());
        let mut gate = TargetGate::Unchecked;
        let mut txn_open = false;
        let mut failure: Option<RoleOutcome> = None;
        let mut stopped = false;

        for role_name in roles {
            if self.stop.is_requested() {
                tracing::warn!(%batch_id, "stop requested; rolling back batch transaction");
                stopped = true;
                break;
            }

            let planned =
                self.plan_role(role_name, roles, &config.reassign_to_user, &mut gate).await;

            match planned.disposition {
                Disposition::Refuse { strategy, reason } => {
                    failure = Some(RoleOutcome::failure(role_name, strategy, reason));
                    break;
                }
                Disposition::Execute { strategy, statements } => {
                    if !txn_open {
                        if let Err(e) = self.store.begin().await {
                            failure =
                                Some(RoleOutcome::failure(role_name, Some(strategy), e.message()));
                            break;
                        }
                        txn_open = true;
                    }

                    let mut sent = Vec::with_capacity(statements.len());
                    let mut exec_err = None;
                    for statement in &statements {
                        tracing::debug!(role = role_name, %statement, "executing");
                        match self.store.execute(statement).await {
                            Ok(()) => sent.push(statement.clone()),
                            Err(e) => {
                                exec_err = Some(e);
                                break;
                            }
                        }
                    }

                    match exec_err {
                        None => pending.push(RoleOutcome::success(role_name, strategy, sent)),
                        Some(e) => {
                            failure = Some(RoleOutcome {
                                role_name: role_name.to_string(),
                                strategy_applied: Some(strategy),
                                succeeded: false,
                                error: Some(e.message()),
                                statements_executed: sent,
                            });
                            break;
                        }
                    }
                }
            }
        }

        let aborted = if let Some(failed_outcome) = failure {
            self.rollback_shared(txn_open).await;
            for outcome in &mut pending {
                outcome.succeeded = false;
                outcome.error = Some(ROLLED_BACK_MESSAGE.to_string());
            }
            pending.push(failed_outcome);
            true
        } else if stopped {
            self.rollback_shared(txn_open).await;
            for outcome in &mut pending {
                outcome.succeeded = false;
                outcome.error = Some(ROLLED_BACK_MESSAGE.to_string());
            }
            true
        } else if txn_open {
            match self.store.commit().await {
                Ok(()) => false,
                Err(e) => {
                    let message = e.message();
                    for outcome in &mut pending {
                        outcome.succeeded = false;
                        outcome.error = Some(message.clone());
                    }
                    true
                }
            }
        } else {
            false
        };

        // Outcomes are final only now; audit, metrics, events, and the
        // progress callback all see post-resolution state
        for outcome in &pending {
            self.record_outcome(outcome, config, batch_id);
        }

        (pending, aborted)
    }

    async fn rollback_shared(&self, txn_open: bool) {
        if !txn_open {
            return;
        }
        if let Err(e) = self.store.rollback().await {
            tracing::warn!(error = %e.message(), "rollback failed");
        }
    }

    /// Audit, log, count, and publish one final outcome
    ///
    /// This is the single place deletion counters are incremented and the
    /// single place committed deletions invalidate caches and publish
    /// events. Dry runs reach the audit trail but touch nothing else.
    fn record_outcome(&self, outcome: &RoleOutcome, config: &BatchConfig, batch_id: Uuid) {
        self.audit.record(AuditEntry::for_role(
            batch_id,
            outcome.role_name.clone(),
            outcome.strategy_applied,
            outcome.succeeded,
            config.dry_run,
            outcome.statements_executed.clone(),
            outcome.error.clone(),
        ));

        if config.log_details {
            if outcome.succeeded {
                tracing::info!(
                    role = %outcome.role_name,
                    strategy = ?outcome.strategy_applied,
                    dry_run = config.dry_run,
                    "role processed"
                );
            } else {
                tracing::warn!(
                    role = %outcome.role_name,
                    strategy = ?outcome.strategy_applied,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "role failed"
                );
            }
        }

        if !config.dry_run {
            if outcome.succeeded {
                for tag in INVALIDATED_TAGS {
                    self.cache.invalidate_tag(tag);
                }
                if let Some(strategy) = outcome.strategy_applied {
                    self.events.publish(&EngineEvent::RoleDeleted {
                        role_name: outcome.role_name.clone(),
                        strategy,
                    });
                }
                self.metrics.increment(ROLES_DELETED, 1);
            } else {
                self.metrics.increment(ROLE_DELETE_FAILURES, 1);
            }
        }

        if let Some(progress) = &self.progress {
            progress(outcome);
        }
    }
}
