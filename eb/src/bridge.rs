//! Process bridge state and lifecycle
//!
//! [`Bridge`] holds one process's bridge state: the subscription
//! registry, the side-aware transport, and the once-only inbound
//! listener installation. It is a cheap cloneable handle; every clone
//! (and every facade built from one) observes the same subscription set.
//!
//! The inbound listener is installed lazily, on the first
//! `on`/`once`/`emit` call or facade construction, and exactly once for
//! the bridge's lifetime: re-installation would duplicate the dispatch
//! of every inbound message. There is no teardown - the hosting sandboxes
//! are short-lived processes themselves.

use std::sync::{Arc, Mutex, Once};

use serde_json::Value;
use tracing::debug;

use crate::dispatch::{self, DispatchOutcome};
use crate::registry::{self, Registry, Unsubscriber};
use crate::transport::{ContextSide, Envelope, HostChannel, Transport};

struct BridgeInner {
    registry: Arc<Mutex<Registry>>,
    transport: Transport,
    listener_installed: Once,
}

/// Cloneable handle to one process's bridge state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    /// Create a bridge for `side` over the given host channel.
    ///
    /// The inbound listener is not installed until the first
    /// `on`/`once`/`emit` call or facade construction.
    pub fn new(side: ContextSide, channel: Arc<dyn HostChannel>) -> Self {
        debug!(?side, "Bridge::new: creating bridge");
        Self {
            inner: Arc::new(BridgeInner {
                registry: Arc::new(Mutex::new(Registry::new())),
                transport: Transport::new(side, channel),
                listener_installed: Once::new(),
            }),
        }
    }

    /// Which sandbox this bridge was constructed for.
    pub fn side(&self) -> ContextSide {
        self.inner.transport.side()
    }

    /// Install the inbound listener on first call; every later call is a
    /// no-op. Uninitialized -> Initialized, one-way, no reset.
    pub(crate) fn ensure_initialized(&self) {
        self.inner.listener_installed.call_once(|| {
            debug!(side = ?self.side(), "Bridge::ensure_initialized: installing inbound listener");
            let bridge = self.clone();
            self.inner.transport.install(Arc::new(move |body| {
                let _ = bridge.deliver(body);
            }));
        });
    }

    /// Subscribe `handler` to `event_name`.
    ///
    /// Returns the revoker; discarding it without calling leaves the
    /// subscription registered for the life of the bridge.
    pub fn on(&self, event_name: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> Unsubscriber {
        self.ensure_initialized();
        let id = registry::lock(&self.inner.registry).register(event_name, Arc::new(handler));
        Unsubscriber::new(Arc::downgrade(&self.inner.registry), id)
    }

    /// Subscribe `handler` for a single delivery.
    ///
    /// The first emission that reaches it removes the subscription before
    /// invoking the handler, so a second emission can never reach it.
    pub fn once(&self, event_name: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> Unsubscriber {
        self.ensure_initialized();
        let weak = Arc::downgrade(&self.inner.registry);
        let id = registry::lock(&self.inner.registry).register_with(event_name, |id| {
            let weak = weak.clone();
            Arc::new(move |payload: &Value| {
                if let Some(registry) = weak.upgrade() {
                    registry::lock(&registry).remove(id);
                }
                handler(payload);
            })
        });
        Unsubscriber::new(Arc::downgrade(&self.inner.registry), id)
    }

    /// Emit `event_name` with `payload`.
    ///
    /// Fire-and-forget: the envelope is handed to the host channel with
    /// no acknowledgment or delivery guarantee, then dispatched
    /// synchronously to local subscribers.
    pub fn emit(&self, event_name: &str, payload: Value) {
        self.ensure_initialized();
        debug!(event = event_name, "Bridge::emit");
        let envelope = Envelope::new(event_name, payload);
        self.inner.transport.send(&envelope);
        let _ = dispatch::dispatch(&self.inner.registry, &envelope.name, &envelope.payload);
    }

    /// Deliver a raw inbound body from the host channel.
    ///
    /// Returns `None` for bodies that are not envelopes for this side;
    /// those are discarded without dispatching. Handler panics propagate
    /// out of this call - each inbound message gets its own top-level
    /// invocation, and a faulting pass does not affect later deliveries.
    pub fn deliver(&self, body: Value) -> Option<DispatchOutcome> {
        let envelope = self.inner.transport.decode(&body)?;
        debug!(event = %envelope.name, "Bridge::deliver");
        Some(dispatch::dispatch(&self.inner.registry, &envelope.name, &envelope.payload))
    }

    /// Number of live subscriptions across all event names.
    pub fn subscription_count(&self) -> usize {
        registry::lock(&self.inner.registry).len()
    }
}
