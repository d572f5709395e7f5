//! Engine Metrics
//!
//! Counters and timings for deletion activity. Counter names are fixed at
//! the call sites; each event increments exactly one counter so dashboards
//! never double-count.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Successful role deletions
pub const ROLES_DELETED: &str = "roles_deleted";
/// Failed role deletions, including blocked roles
pub const ROLE_DELETE_FAILURES: &str = "role_delete_failures";
/// Batch wall-clock timing
pub const BATCH_DURATION: &str = "batch_duration";

#[derive(Default)]
struct MetricsState {
    counters: HashMap<String, u64>,
    timings: HashMap<String, Vec<Duration>>,
}

/// Shared counter and timing registry
#[derive(Default)]
pub struct EngineMetrics {
    state: Mutex<MetricsState>,
}

impl EngineMetrics {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to counter `name`
    pub fn increment(&self, name: &str, amount: u64) {
        let mut state = self.lock();
        *state.counters.entry(name.to_string()).or_insert(0) += amount;
    }

    /// Current value of counter `name`
    pub fn counter(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Record one observed duration under `name`
    pub fn record_timing(&self, name: &str, elapsed: Duration) {
        let mut state = self.lock();
        state.timings.entry(name.to_string()).or_default().push(elapsed);
    }

    /// Observed durations for `name`, in recording order
    pub fn timings(&self, name: &str) -> Vec<Duration> {
        self.lock().timings.get(name).cloned().unwrap_or_default()
    }

    /// Start a timer that records under `name` when dropped
    #[must_use]
    pub fn time(self: &Arc<Self>, name: &str) -> TimerGuard {
        TimerGuard {
            metrics: Arc::clone(self),
            name: name.to_string(),
            started_at: Instant::now(),
        }
    }

    /// Copy of all counters
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.lock().counters.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Records elapsed time under its metric name on drop
pub struct TimerGuard {
    metrics: Arc<EngineMetrics>,
    name: String,
    started_at: Instant,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.metrics.record_timing(&self.name, self.started_at.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_read() {
        let metrics = EngineMetrics::new();
        metrics.increment(ROLES_DELETED, 1);
        metrics.increment(ROLES_DELETED, 2);

        assert_eq!(metrics.counter(ROLES_DELETED), 3);
        assert_eq!(metrics.counter(ROLE_DELETE_FAILURES), 0);
    }

    #[test]
    fn test_timer_guard_records_on_drop() {
        let metrics = Arc::new(EngineMetrics::new());

        {
            let _guard = metrics.time(BATCH_DURATION);
        }

        assert_eq!(metrics.timings(BATCH_DURATION).len(), 1);
    }

    #[test]
    fn test_snapshot_copies_counters() {
        let metrics = EngineMetrics::new();
        metrics.increment(ROLES_DELETED, 5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.get(ROLES_DELETED), Some(&5));

        metrics.increment(ROLES_DELETED, 1);
        // Snapshot is detached from later increments
        assert_eq!(snapshot.get(ROLES_DELETED), Some(&5));
    }
}
