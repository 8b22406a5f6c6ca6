//! Synchronous event dispatch
//!
//! Dispatch snapshots the matching subscriptions, then re-checks each one
//! immediately before invoking it: a handler removed earlier in the same
//! pass is skipped, an already-visited handler cannot fire twice, and a
//! handler registered mid-pass waits for the next pass. Handlers run
//! outside the registry lock, so unsubscribing from inside a handler
//! cannot deadlock. Handler panics are not caught here; they abort the
//! rest of the pass and propagate to the delivery boundary.

use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::{self, Registry};

/// What a dispatch pass did.
///
/// The no-subscriber case is a diagnostic, not an error: dispatch still
/// succeeds with zero effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// At least one handler ran.
    Delivered {
        /// Number of handlers invoked.
        handlers: usize,
    },
    /// Nothing was registered for the event name.
    NoSubscribers,
}

impl DispatchOutcome {
    /// Number of handlers invoked in the pass.
    pub fn handlers_invoked(&self) -> usize {
        match self {
            Self::Delivered { handlers } => *handlers,
            Self::NoSubscribers => 0,
        }
    }
}

/// Invoke every handler registered for `event_name`, in registration
/// order, with `payload`.
pub fn dispatch(registry: &Mutex<Registry>, event_name: &str, payload: &Value) -> DispatchOutcome {
    let snapshot = registry::lock(registry).snapshot_for(event_name);
    let mut invoked = 0;
    for (id, handler) in snapshot {
        // Skip entries unsubscribed earlier in this same pass
        if !registry::lock(registry).contains(id) {
            continue;
        }
        handler(payload);
        invoked += 1;
    }
    if invoked == 0 {
        warn!(event = event_name, "dispatch: no handlers registered for event");
        return DispatchOutcome::NoSubscribers;
    }
    debug!(event = event_name, handlers = invoked, "dispatch: delivered");
    DispatchOutcome::Delivered { handlers: invoked }
}
