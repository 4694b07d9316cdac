//! WebSocket envelopes: inbound request, ack, and broadcast.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

/// The only action tag the server understands.
pub const SEND_MESSAGE: &str = "send_message";

/// Additional inbound fields, forwarded to peers untouched and in order.
pub type ExtraFields = Map<String, Value>;

/// Client → server envelope.
///
/// `action`, `api_key` and `message` are interpreted; every other key is
/// collected into [`extra`](Self::extra).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundEnvelope {
    /// Action tag, e.g. `"send_message"`.
    #[serde(default)]
    pub action: Option<String>,
    /// Credential key authenticating this message.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Message text, required for `send_message`.
    #[serde(default)]
    pub message: Option<String>,
    /// Everything else in the object.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl InboundEnvelope {
    /// Parses one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Protocol`] if the frame is not a JSON object
    /// or a known field has the wrong type.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        serde_json::from_str(text).map_err(|e| SessionError::Protocol(e.to_string()))
    }

    /// Returns the message text if present and non-empty.
    #[must_use]
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

/// Server → sender acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// 200, 400 or 401.
    pub status: u16,
    /// Human-readable outcome.
    pub message: String,
}

impl Ack {
    /// Ack for a message that was handed to the broadcaster.
    #[must_use]
    pub fn sent() -> Self {
        Self {
            status: 200,
            message: "Message sent successfully.".to_string(),
        }
    }
}

impl From<&SessionError> for Ack {
    fn from(e: &SessionError) -> Self {
        Self {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

/// Server → peers envelope.
///
/// Serializes as one flat object: `sender`, `message`, then the forwarded
/// fields at top level. Forwarded fields are applied last and replace a
/// key of the same name, so a forwarded `sender` object reaches peers as
/// sent.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct BroadcastEnvelope(Map<String, Value>);

impl BroadcastEnvelope {
    /// Builds the envelope for one outbound message.
    #[must_use]
    pub fn new(username: &str, message: &str, extra: &ExtraFields) -> Self {
        let mut map = Map::with_capacity(extra.len() + 2);
        let mut sender = Map::with_capacity(1);
        sender.insert("username".to_string(), Value::String(username.to_string()));
        map.insert("sender".to_string(), Value::Object(sender));
        map.insert("message".to_string(), Value::String(message.to_string()));
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
        Self(map)
    }

    /// Returns the envelope as a JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_envelope_with_extras() {
        let text = r#"{"action":"send_message","api_key":"k","message":"hi","color":"red","n":3}"#;
        let Ok(env) = InboundEnvelope::parse(text) else {
            panic!("should parse");
        };
        assert_eq!(env.action.as_deref(), Some(SEND_MESSAGE));
        assert_eq!(env.api_key.as_deref(), Some("k"));
        assert_eq!(env.message_text(), Some("hi"));
        let keys: Vec<&str> = env.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, ["color", "n"]);
    }

    #[test]
    fn parse_tolerates_missing_fields() {
        let Ok(env) = InboundEnvelope::parse("{}") else {
            panic!("empty object is well-formed");
        };
        assert!(env.action.is_none());
        assert!(env.api_key.is_none());
        assert!(env.message_text().is_none());
    }

    #[test]
    fn empty_message_counts_as_absent() {
        let Ok(env) = InboundEnvelope::parse(r#"{"message":""}"#) else {
            panic!("should parse");
        };
        assert!(env.message_text().is_none());
    }

    #[test]
    fn malformed_payloads_are_protocol_errors() {
        for text in ["not json", "[1,2]", "\"str\"", r#"{"api_key":5}"#, r#"{"message":{}}"#] {
            let result = InboundEnvelope::parse(text);
            assert!(
                matches!(result, Err(SessionError::Protocol(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn broadcast_merges_extras_at_top_level() {
        let mut extra = ExtraFields::new();
        extra.insert("color".into(), Value::from("red"));
        extra.insert("meta".into(), serde_json::json!({"a": [1, null, true]}));

        let env = BroadcastEnvelope::new("alice", "hi", &extra);
        let Ok(value) = serde_json::to_value(&env) else {
            panic!("serialization failed");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "sender": {"username": "alice"},
                "message": "hi",
                "color": "red",
                "meta": {"a": [1, null, true]},
            })
        );
    }

    #[test]
    fn forwarded_sender_field_replaces_descriptor() {
        let mut extra = ExtraFields::new();
        extra.insert(
            "sender".into(),
            serde_json::json!({"username": "bot", "avatar": "x.png"}),
        );
        extra.insert("mood".into(), Value::from("sly"));
        let env = BroadcastEnvelope::new("alice", "hi", &extra);
        assert_eq!(
            env.as_map().get("sender"),
            Some(&serde_json::json!({"username": "bot", "avatar": "x.png"}))
        );
        let keys: Vec<&str> = env.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, ["sender", "message", "mood"]);
    }

    #[test]
    fn ack_from_session_error() {
        let ack = Ack::from(&SessionError::MissingMessage);
        assert_eq!(ack.status, 400);
        assert_eq!(ack.message, "Message field is required.");
        assert_eq!(Ack::sent().status, 200);
    }
}
