//! Rolesweep - Ownership-Aware PostgreSQL Role Deletion
//!
//! Rolesweep deletes PostgreSQL roles the way an experienced DBA would:
//! it analyzes what each role owns and whether it has open sessions, picks
//! a deletion strategy per role, and executes the right statements in the
//! right order instead of letting `DROP ROLE` fail on dependencies.
//!
//! # Core Principles
//! - Analyze before acting (ownership and sessions drive the strategy)
//! - One outcome per requested role, in request order
//! - Dry runs and previews never change database state
//! - Side effects (cache invalidation, events, counters) only after commit
//! - Structured JSON output for the GUI and for scripts
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`output`] - JSON output envelope types
//! - [`analysis`] - Role ownership and session analysis
//! - [`strategy`] - Deletion strategy selection
//! - [`statement`] - Identifier validation and statement building
//! - [`orchestrator`] - Batch execution engine
//! - [`preview`] - Read-only batch previews
//! - [`store`] - Database access boundary and PostgreSQL implementation
//! - [`audit`] / [`cache`] / [`metrics`] / [`events`] - Engine collaborators
//! - [`config`] - Connection profile management
//!
//! # Public API
//! The GUI embeds this crate through [`DeletionEngine`]; the CLI in
//! `main.rs` is a thin wrapper over the same types.

pub mod analysis;
pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod preview;
pub mod statement;
pub mod store;
pub mod strategy;

// Re-export commonly used types for convenience
pub use analysis::{analyze_role, RoleAnalysis};
pub use error::{Result, RolesweepError};
pub use orchestrator::{BatchConfig, BatchResult, DeletionEngine, RoleOutcome, StopSignal};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use preview::{PreviewReport, RolePlan};
pub use statement::{build_plan, quote_identifier, validate_identifier, StatementPlan};
pub use store::postgres::PgRoleStore;
pub use store::{ConnectionConfig, RoleStore};
pub use strategy::{select_strategy, DeletionStrategy};
