//! EventBridge - typed publish/subscribe between plugin sandboxes
//!
//! A Figma-style plugin runs as two isolated, single-threaded sandboxes:
//! the privileged "main" context with access to host document APIs, and
//! the iframe-hosted "UI" context, which can only talk to it over
//! asynchronous, serialized, one-way postMessage channels. EventBridge
//! gives both sides the same small `on`/`once`/`emit` API and handles
//! the framing, subscription bookkeeping, and listener lifecycle
//! underneath.
//!
//! # Architecture
//!
//! ```text
//! caller ──> EventSystem / Bridge ──> dispatch ──> local handlers
//!                      │
//!                      └──> Transport ──> HostChannel ──> (other context)
//!                                                              │
//! local handlers <── dispatch <── Transport::decode <── deliver ┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use eventbridge::{Bridge, ContextSide, EventSystem, events, host_pair};
//!
//! events! {
//!     /// Current selection, as node ids.
//!     SelectionChanged: Vec<String> = "selection-changed";
//! }
//!
//! let (channel, _ui_channel) = host_pair();
//! let bridge = Bridge::new(ContextSide::Privileged, channel);
//!
//! let system = EventSystem::new(&bridge);
//! let selection = system.event::<SelectionChanged>();
//! let unsub = selection.on(|ids| println!("selected: {ids:?}"));
//! selection.emit(&vec!["1".into(), "2".into()])?;
//! unsub.unsubscribe();
//! ```
//!
//! Delivery is fire-and-forget: no acknowledgments, no buffering, no
//! redelivery, no ordering across different event names. Inbound
//! messages that are not envelopes are ignored.
//!
//! # Modules
//!
//! - [`registry`] - subscription bookkeeping and unsubscribers
//! - [`dispatch`] - synchronous in-order handler invocation
//! - [`transport`] - wire framing and the [`HostChannel`] seam
//! - [`bridge`] - process bridge state and listener lifecycle
//! - [`typed`] - the compile-time-checked facade
//! - [`loopback`] - in-memory host channel pair for tests

pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod loopback;
pub mod registry;
pub mod transport;
pub mod typed;

pub use bridge::Bridge;
pub use dispatch::DispatchOutcome;
pub use error::BridgeError;
pub use loopback::{LoopbackChannel, host_pair};
pub use registry::{Handler, Registry, SubscriptionId, Unsubscriber};
pub use transport::{
    ANY_TARGET_ORIGIN, ContextSide, Envelope, HostChannel, InboundListener, PLUGIN_MESSAGE_KEY,
};
pub use typed::{EventDescriptor, EventSystem, TypedEvent};
