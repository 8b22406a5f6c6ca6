//! In-memory host channel pair
//!
//! Emulates the host runtime sitting between the two sandboxes: bare
//! envelopes posted by the privileged side are wrapped under
//! `pluginMessage` before reaching the UI window, window messages are
//! unwrapped before reaching the privileged side, and anything posted
//! while the receiving side has no listener installed is dropped - the
//! same lossy, fire-and-forget behavior the real channels have.
//!
//! Useful for integration tests and for plugin authors unit-testing
//! their own event flows without a real sandboxed environment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::transport::{ContextSide, HostChannel, InboundListener, PLUGIN_MESSAGE_KEY};

#[derive(Default)]
struct Endpoint {
    listener: Mutex<Option<InboundListener>>,
    installs: AtomicUsize,
}

impl Endpoint {
    fn listener(&self) -> Option<InboundListener> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// One side of the in-memory channel pair created by [`host_pair`].
pub struct LoopbackChannel {
    side: ContextSide,
    local: Arc<Endpoint>,
    peer: Arc<Endpoint>,
}

impl LoopbackChannel {
    /// Which side this channel belongs to.
    pub fn side(&self) -> ContextSide {
        self.side
    }

    /// How many times a listener has been installed on this side.
    pub fn listener_installs(&self) -> usize {
        self.local.installs.load(Ordering::SeqCst)
    }

    /// Whether a listener is currently installed on this side.
    pub fn has_listener(&self) -> bool {
        self.local.listener().is_some()
    }
}

impl HostChannel for LoopbackChannel {
    fn post(&self, body: Value) {
        let forwarded = match self.side {
            // The host wraps bare envelopes before they reach the UI window
            ContextSide::Privileged => {
                let mut wrapper = serde_json::Map::with_capacity(1);
                wrapper.insert(PLUGIN_MESSAGE_KEY.to_string(), body);
                Value::Object(wrapper)
            }
            // The host forwards only the reserved field to the privileged side
            ContextSide::UiHosted => match body.get(PLUGIN_MESSAGE_KEY) {
                Some(inner) => inner.clone(),
                None => return,
            },
        };
        // No listener installed means the emission is silently lost
        if let Some(listener) = self.peer.listener() {
            listener(forwarded);
        }
    }

    fn set_listener(&self, listener: InboundListener) {
        self.local.installs.fetch_add(1, Ordering::SeqCst);
        *self.local.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }
}

/// Create a wired `(privileged, ui)` channel pair.
pub fn host_pair() -> (Arc<LoopbackChannel>, Arc<LoopbackChannel>) {
    let plugin_end = Arc::new(Endpoint::default());
    let ui_end = Arc::new(Endpoint::default());
    let privileged = Arc::new(LoopbackChannel {
        side: ContextSide::Privileged,
        local: Arc::clone(&plugin_end),
        peer: Arc::clone(&ui_end),
    });
    let ui = Arc::new(LoopbackChannel {
        side: ContextSide::UiHosted,
        local: ui_end,
        peer: plugin_end,
    });
    (privileged, ui)
}
