//! Cross-context transport framing
//!
//! Maps the abstract emit/dispatch operations onto the host's one-way
//! message channels. The privileged side posts bare `[name, payload]`
//! envelopes straight into the UI iframe's inbound channel; the UI side
//! wraps them one level deeper under the reserved `pluginMessage` key and
//! posts to the parent window with an unrestricted target origin. The
//! host performs the complementary wrap/unwrap before notifying the
//! other side, so each side only ever decodes its own framing.
//!
//! Inbound bodies that are not envelopes (unrelated host traffic, wrong
//! shapes) are discarded silently - the channel is shared and "not for
//! us" is indistinguishable from "corrupt".

use std::sync::Arc;

use serde_json::Value;

/// Reserved wrapper field used for plugin-message framing on the UI side.
pub const PLUGIN_MESSAGE_KEY: &str = "pluginMessage";

/// Target origin UI-side host channels post with (any origin).
pub const ANY_TARGET_ORIGIN: &str = "*";

/// Which of the two plugin sandboxes a bridge runs in.
///
/// Chosen once by the embedding application at bridge construction; the
/// core never sniffs its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSide {
    /// The trusted plugin sandbox with access to host document APIs.
    Privileged,
    /// The sandboxed iframe hosting the plugin's visible interface.
    UiHosted,
}

/// One emission on the wire: an ordered `(event name, payload)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Event name the emission was published under.
    pub name: String,
    /// Arbitrary serializable payload.
    pub payload: Value,
}

impl Envelope {
    /// Build an envelope for `name` carrying `payload`.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Bare wire form: `[name, payload]`.
    pub fn to_wire(&self) -> Value {
        Value::Array(vec![Value::String(self.name.clone()), self.payload.clone()])
    }

    /// Decode the bare wire form.
    ///
    /// Anything that is not a 2-element array with a string head is not
    /// an envelope.
    pub fn from_wire(body: &Value) -> Option<Self> {
        let (name, payload) = serde_json::from_value::<(String, Value)>(body.clone()).ok()?;
        Some(Self { name, payload })
    }

    /// Window wire form: `{"pluginMessage": [name, payload]}`.
    pub fn to_window_wire(&self) -> Value {
        let mut wrapper = serde_json::Map::with_capacity(1);
        wrapper.insert(PLUGIN_MESSAGE_KEY.to_string(), self.to_wire());
        Value::Object(wrapper)
    }

    /// Unwrap a window message.
    ///
    /// Messages without the reserved field are unrelated host traffic,
    /// not envelopes.
    pub fn from_window_wire(body: &Value) -> Option<Self> {
        Self::from_wire(body.get(PLUGIN_MESSAGE_KEY)?)
    }
}

/// Listener installed into a host channel's inbound callback slot.
pub type InboundListener = Arc<dyn Fn(Value) + Send + Sync>;

/// Host-provided messaging primitives for one side of the bridge.
///
/// On the privileged side this stands in for the host's "post message to
/// my UI" primitive and its arriving-message callback slot; on the UI
/// side, for the generic window-messaging primitive (where
/// implementations are expected to post with [`ANY_TARGET_ORIGIN`]).
/// Both directions are opaque, one-way, and lossy: `post` gives no
/// acknowledgment and no delivery guarantee.
pub trait HostChannel: Send + Sync {
    /// Hand an outbound body to the channel, fire-and-forget.
    fn post(&self, body: Value);

    /// Install the single inbound message callback.
    fn set_listener(&self, listener: InboundListener);
}

/// Side-aware adapter between envelopes and a host channel.
pub(crate) struct Transport {
    side: ContextSide,
    channel: Arc<dyn HostChannel>,
}

impl Transport {
    pub(crate) fn new(side: ContextSide, channel: Arc<dyn HostChannel>) -> Self {
        Self { side, channel }
    }

    pub(crate) fn side(&self) -> ContextSide {
        self.side
    }

    /// Serialize an outbound emission onto the channel.
    pub(crate) fn send(&self, envelope: &Envelope) {
        let body = match self.side {
            ContextSide::Privileged => envelope.to_wire(),
            ContextSide::UiHosted => envelope.to_window_wire(),
        };
        self.channel.post(body);
    }

    /// Decode an inbound body for this side.
    ///
    /// `None` means the message is not an envelope and must be ignored.
    pub(crate) fn decode(&self, body: &Value) -> Option<Envelope> {
        match self.side {
            ContextSide::Privileged => Envelope::from_wire(body),
            ContextSide::UiHosted => Envelope::from_window_wire(body),
        }
    }

    /// Wire the inbound callback slot to `listener`.
    pub(crate) fn install(&self, listener: InboundListener) {
        self.channel.set_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn example() -> Envelope {
        Envelope::new("example-event", json!({"ids": ["1", "2"]}))
    }

    #[test]
    fn test_bare_wire_shape() {
        let wire = serde_json::to_string(&example().to_wire()).unwrap();
        assert_eq!(wire, r#"["example-event",{"ids":["1","2"]}]"#);
    }

    #[test]
    fn test_window_wire_shape() {
        let wire = serde_json::to_string(&example().to_window_wire()).unwrap();
        assert_eq!(wire, r#"{"pluginMessage":["example-event",{"ids":["1","2"]}]}"#);
    }

    #[test]
    fn test_bare_wire_round_trip() {
        let envelope = example();
        assert_eq!(Envelope::from_wire(&envelope.to_wire()), Some(envelope));
    }

    #[test]
    fn test_window_wire_round_trip() {
        let envelope = example();
        assert_eq!(Envelope::from_window_wire(&envelope.to_window_wire()), Some(envelope));
    }

    #[test]
    fn test_null_payload_is_valid() {
        let envelope = Envelope::new("evt", Value::Null);
        assert_eq!(Envelope::from_wire(&json!(["evt", null])), Some(envelope));
    }

    #[test]
    fn test_from_wire_rejects_malformed_bodies() {
        let malformed = [
            json!("example-event"),
            json!([]),
            json!(["only-name"]),
            json!(["name", 1, 2]),
            json!([42, "payload"]),
            json!({"name": "evt", "payload": 1}),
            json!(null),
        ];
        for body in &malformed {
            assert_eq!(Envelope::from_wire(body), None, "accepted: {body}");
        }
    }

    #[test]
    fn test_from_window_wire_rejects_malformed_bodies() {
        let malformed = [
            json!(["evt", 1]),
            json!({"otherField": ["evt", 1]}),
            json!({"pluginMessage": "evt"}),
            json!({"pluginMessage": ["evt"]}),
            json!({"pluginMessage": [1, "evt"]}),
            json!(null),
        ];
        for body in &malformed {
            assert_eq!(Envelope::from_window_wire(body), None, "accepted: {body}");
        }
    }

    #[test]
    fn test_any_target_origin_is_wildcard() {
        assert_eq!(ANY_TARGET_ORIGIN, "*");
    }

    #[derive(Default)]
    struct RecordingChannel {
        posted: Mutex<Vec<Value>>,
    }

    impl HostChannel for RecordingChannel {
        fn post(&self, body: Value) {
            self.posted.lock().unwrap().push(body);
        }

        fn set_listener(&self, _listener: InboundListener) {}
    }

    #[test]
    fn test_privileged_side_sends_bare_envelope() {
        let channel = Arc::new(RecordingChannel::default());
        let transport = Transport::new(ContextSide::Privileged, channel.clone());

        transport.send(&example());

        let posted = channel.posted.lock().unwrap();
        assert_eq!(*posted, vec![json!(["example-event", {"ids": ["1", "2"]}])]);
    }

    #[test]
    fn test_ui_side_sends_wrapped_envelope() {
        let channel = Arc::new(RecordingChannel::default());
        let transport = Transport::new(ContextSide::UiHosted, channel.clone());

        transport.send(&example());

        let posted = channel.posted.lock().unwrap();
        assert_eq!(
            *posted,
            vec![json!({"pluginMessage": ["example-event", {"ids": ["1", "2"]}]})]
        );
    }

    #[test]
    fn test_each_side_decodes_its_own_framing() {
        let channel = Arc::new(RecordingChannel::default());
        let privileged = Transport::new(ContextSide::Privileged, channel.clone());
        let ui = Transport::new(ContextSide::UiHosted, channel);
        let envelope = example();

        assert_eq!(privileged.decode(&envelope.to_wire()), Some(envelope.clone()));
        assert_eq!(privileged.decode(&envelope.to_window_wire()), None);
        assert_eq!(ui.decode(&envelope.to_window_wire()), Some(envelope.clone()));
        assert_eq!(ui.decode(&envelope.to_wire()), None);
    }
}
