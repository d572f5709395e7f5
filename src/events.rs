//! Engine Events
//!
//! Synchronous publish/subscribe channel between the deletion engine and
//! the GUI. Subscribers run inline on the publishing task; handlers must
//! stay cheap and must not call back into the engine.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::strategy::DeletionStrategy;

/// Events published by the deletion engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A role was deleted and the deletion committed
    RoleDeleted {
        /// Name of the deleted role
        role_name: String,
        /// Strategy that deleted it
        strategy: DeletionStrategy,
    },
}

type Handler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Synchronous in-process event bus
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<Vec<Handler>>,
}

impl EventBus {
    /// Bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for all future events
    pub fn subscribe(&self, handler: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        let mut handlers = self.lock();
        handlers.push(Arc::new(handler));
    }

    /// Deliver `event` to every subscriber, in subscription order
    ///
    /// Handlers run outside the registry lock, so a handler may subscribe
    /// or publish again. A panicking handler is logged; the remaining
    /// handlers still run.
    pub fn publish(&self, event: &EngineEvent) {
        let snapshot: Vec<Handler> = self.lock().iter().map(Arc::clone).collect();
        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::warn!("event handler panicked");
            }
        }
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Handler>> {
        match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }

        bus.publish(&EngineEvent::RoleDeleted {
            role_name: "alice".to_string(),
            strategy: DeletionStrategy::DropPermissionsOnly,
        });

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(&EngineEvent::RoleDeleted {
            role_name: "bob".to_string(),
            strategy: DeletionStrategy::ReassignAndDrop,
        });
    }

    #[test]
    fn test_event_carries_role_and_strategy() {
        let bus = EventBus::new();
        let captured = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&captured);
        bus.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        bus.publish(&EngineEvent::RoleDeleted {
            role_name: "carol".to_string(),
            strategy: DeletionStrategy::ReassignAndDrop,
        });

        let captured = captured.lock().unwrap();
        assert_eq!(
            captured[0],
            EngineEvent::RoleDeleted {
                role_name: "carol".to_string(),
                strategy: DeletionStrategy::ReassignAndDrop,
            }
        );
    }

    #[test]
    fn test_handler_may_subscribe_during_publish() {
        let bus = Arc::new(EventBus::new());
        let registrar = Arc::clone(&bus);

        bus.subscribe(move |_| {
            registrar.subscribe(|_| {});
        });

        bus.publish(&EngineEvent::RoleDeleted {
            role_name: "dave".to_string(),
            strategy: DeletionStrategy::DropPermissionsOnly,
        });

        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_panicking_handler_does_not_block_others() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        bus.subscribe(|_| panic!("handler failure"));
        let counter = Arc::clone(&seen);
        bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&EngineEvent::RoleDeleted {
            role_name: "erin".to_string(),
            strategy: DeletionStrategy::ReassignAndDrop,
        });

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
