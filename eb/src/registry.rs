//! Subscription registry - bookkeeping for registered event handlers
//!
//! The registry owns every live subscription: a unique, monotonically
//! assigned id, the event name it was registered under, and the handler
//! itself. Entries are kept in registration order, which is exactly the
//! order dispatch visits them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::debug;

/// Handler invoked with the payload of a dispatched event.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Unique id for one subscription, monotonically assigned per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered (event name, handler) pair.
struct Subscription {
    id: SubscriptionId,
    event_name: String,
    handler: Handler,
}

/// Ordered collection of live subscriptions.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Subscription>,
    next_id: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `event_name`, returning its fresh id.
    pub fn register(&mut self, event_name: &str, handler: Handler) -> SubscriptionId {
        self.register_with(event_name, |_| handler)
    }

    /// Register a handler built from its own id.
    ///
    /// Used by `once` wrappers, which need their id at construction time
    /// so they can remove themselves on first invocation.
    pub fn register_with(
        &mut self,
        event_name: &str,
        make: impl FnOnce(SubscriptionId) -> Handler,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        debug!(event = event_name, id = %id, "Registry::register: new subscription");
        self.entries.push(Subscription {
            id,
            event_name: event_name.to_string(),
            handler: make(id),
        });
        id
    }

    /// Remove the subscription with `id`.
    ///
    /// Returns false when it was already gone. Removal never affects any
    /// other entry.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            debug!(id = %id, "Registry::remove: subscription removed");
        }
        removed
    }

    /// Whether the subscription with `id` is still live.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Handlers registered under `event_name`, in registration order,
    /// reflecting every removal made before this call.
    pub fn snapshot_for(&self, event_name: &str) -> Vec<(SubscriptionId, Handler)> {
        self.entries
            .iter()
            .filter(|entry| entry.event_name == event_name)
            .map(|entry| (entry.id, Arc::clone(&entry.handler)))
            .collect()
    }

    /// Number of live subscriptions across all event names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lock the registry, recovering the guard if a panicking handler
/// poisoned it. A faulting dispatch pass must not lock out later ones.
pub(crate) fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Zero-argument revoker returned from `on`/`once`.
///
/// Calling [`Unsubscriber::unsubscribe`] removes exactly the subscription
/// it was returned for; calling it again is a no-op. Discarding it
/// without calling leaves the subscription registered for the life of
/// the bridge. There is deliberately no `Drop`-based auto-removal.
pub struct Unsubscriber {
    registry: Weak<Mutex<Registry>>,
    id: SubscriptionId,
}

impl Unsubscriber {
    pub(crate) fn new(registry: Weak<Mutex<Registry>>, id: SubscriptionId) -> Self {
        Self { registry, id }
    }

    /// Remove the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(self.id);
        }
    }

    /// Id of the subscription this revokes.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn noop() -> Handler {
        Arc::new(|_: &Value| {})
    }

    #[test]
    fn test_ids_are_unique_and_monotonic() {
        let mut registry = Registry::new();
        let a = registry.register("evt", noop());
        let b = registry.register("evt", noop());
        let c = registry.register("other", noop());
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut registry = Registry::new();
        let a = registry.register("evt", noop());
        assert!(registry.remove(a));
        let b = registry.register("evt", noop());
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let mut registry = Registry::new();
        let a = registry.register("evt", noop());
        let b = registry.register("evt", noop());
        let c = registry.register("evt", noop());
        let ids: Vec<_> = registry.snapshot_for("evt").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_snapshot_filters_by_event_name() {
        let mut registry = Registry::new();
        let a = registry.register("evt", noop());
        registry.register("other", noop());
        let ids: Vec<_> = registry.snapshot_for("evt").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a]);
        assert!(registry.snapshot_for("missing").is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = Registry::new();
        let id = registry.register("evt", noop());
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_does_not_affect_other_entries() {
        let mut registry = Registry::new();
        let a = registry.register("evt", noop());
        let b = registry.register("evt", noop());
        let c = registry.register("evt", noop());
        assert!(registry.remove(b));
        assert!(registry.contains(a));
        assert!(!registry.contains(b));
        assert!(registry.contains(c));
        let ids: Vec<_> = registry.snapshot_for("evt").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_unsubscriber_is_idempotent() {
        let registry = Arc::new(Mutex::new(Registry::new()));
        let id = lock(&registry).register("evt", noop());
        let unsub = Unsubscriber::new(Arc::downgrade(&registry), id);
        unsub.unsubscribe();
        assert!(!lock(&registry).contains(id));
        // Second call is a no-op, not an error
        unsub.unsubscribe();
        assert!(lock(&registry).is_empty());
    }

    #[test]
    fn test_unsubscriber_noop_after_registry_dropped() {
        let registry = Arc::new(Mutex::new(Registry::new()));
        let id = lock(&registry).register("evt", noop());
        let unsub = Unsubscriber::new(Arc::downgrade(&registry), id);
        drop(registry);
        // Should not panic
        unsub.unsubscribe();
        assert_eq!(unsub.id(), id);
    }

    #[test]
    fn test_register_with_passes_final_id() {
        let mut registry = Registry::new();
        let mut seen = None;
        let id = registry.register_with("evt", |id| {
            seen = Some(id);
            Arc::new(|_: &Value| {})
        });
        assert_eq!(seen, Some(id));
        assert!(registry.contains(id));
    }

    proptest! {
        #[test]
        fn prop_ids_unique_and_order_preserved(ops in prop::collection::vec(any::<bool>(), 1..64)) {
            let mut registry = Registry::new();
            let mut live: Vec<SubscriptionId> = Vec::new();
            let mut seen = HashSet::new();
            for register in ops {
                if register || live.is_empty() {
                    let id = registry.register("evt", Arc::new(|_: &Value| {}));
                    prop_assert!(seen.insert(id));
                    live.push(id);
                } else {
                    let id = live.remove(live.len() / 2);
                    prop_assert!(registry.remove(id));
                }
            }
            let snapshot: Vec<_> = registry.snapshot_for("evt").into_iter().map(|(id, _)| id).collect();
            prop_assert_eq!(snapshot, live);
        }
    }
}
