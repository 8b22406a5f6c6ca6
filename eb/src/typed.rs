//! Typed facade over the untyped bridge
//!
//! Callers declare a closed map of event name -> payload type with the
//! [`events!`](crate::events) macro and get compile-time-checked
//! `on`/`once`/`emit` handles for each declared event. The facade adds
//! no runtime state beyond a bridge clone: it is safe to construct any
//! number of times, and every construction shares the one underlying
//! registry while triggering the bridge's idempotent lazy
//! initialization.
//!
//! The untyped [`Bridge`] API stays available as a deliberately
//! permissive escape hatch; both layers are the same mechanism.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::registry::Unsubscriber;

/// Compile-time association of a wire event name with its payload type.
pub trait EventDescriptor: 'static {
    /// Event name as transmitted in the envelope.
    const NAME: &'static str;

    /// Payload shape declared for this event.
    type Payload: Serialize + DeserializeOwned + Send + Sync + 'static;
}

/// Declare event descriptors for the typed facade.
///
/// ```rust,ignore
/// events! {
///     /// Current selection, as node ids.
///     SelectionChanged: Vec<String> = "selection-changed";
///     CloseRequested: () = "close-requested";
/// }
/// ```
#[macro_export]
macro_rules! events {
    ( $( $(#[$meta:meta])* $vis:vis $name:ident : $payload:ty = $wire:expr ; )+ ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            $vis struct $name;

            impl $crate::EventDescriptor for $name {
                const NAME: &'static str = $wire;
                type Payload = $payload;
            }
        )+
    };
}

/// Typed event-system facade bound to one bridge.
#[derive(Clone)]
pub struct EventSystem {
    bridge: Bridge,
}

impl EventSystem {
    /// Build a facade over `bridge`, triggering its idempotent lazy
    /// initialization.
    pub fn new(bridge: &Bridge) -> Self {
        bridge.ensure_initialized();
        Self {
            bridge: bridge.clone(),
        }
    }

    /// `{on, once, emit}` handle for one declared event.
    pub fn event<E: EventDescriptor>(&self) -> TypedEvent<E> {
        TypedEvent {
            bridge: self.bridge.clone(),
            _event: PhantomData,
        }
    }
}

/// The `on`/`once`/`emit` surface narrowed to a single declared event.
pub struct TypedEvent<E> {
    bridge: Bridge,
    _event: PhantomData<E>,
}

impl<E> Clone for TypedEvent<E> {
    fn clone(&self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            _event: PhantomData,
        }
    }
}

impl<E: EventDescriptor> TypedEvent<E> {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        E::NAME
    }

    /// Subscribe a typed handler.
    pub fn on(&self, handler: impl Fn(E::Payload) + Send + Sync + 'static) -> Unsubscriber {
        self.bridge.on(E::NAME, Self::decoding(handler))
    }

    /// Subscribe a typed handler for a single delivery.
    pub fn once(&self, handler: impl Fn(E::Payload) + Send + Sync + 'static) -> Unsubscriber {
        self.bridge.once(E::NAME, Self::decoding(handler))
    }

    /// Emit a typed payload; serialization is the only fallible step.
    pub fn emit(&self, payload: &E::Payload) -> Result<(), BridgeError> {
        let value = serde_json::to_value(payload).map_err(|source| BridgeError::PayloadEncode {
            event: E::NAME.to_string(),
            source,
        })?;
        self.bridge.emit(E::NAME, value);
        Ok(())
    }

    fn decoding(handler: impl Fn(E::Payload) + Send + Sync + 'static) -> impl Fn(&Value) + Send + Sync + 'static {
        move |payload: &Value| match serde_json::from_value::<E::Payload>(payload.clone()) {
            Ok(decoded) => handler(decoded),
            Err(error) => {
                debug!(event = E::NAME, %error, "TypedEvent: payload does not match declared shape, skipping");
            }
        }
    }
}
