//! Bridge error types

use thiserror::Error;

/// Errors surfaced to callers of the bridge.
///
/// The bridge swallows what it is contractually allowed to swallow
/// (malformed inbound messages, emissions nobody listens to); the only
/// fallible caller-facing operation is serializing a typed payload.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A typed payload could not be serialized for the wire.
    #[error("failed to encode payload for event '{event}': {source}")]
    PayloadEncode {
        /// Event the payload was emitted under.
        event: String,
        source: serde_json::Error,
    },
}
