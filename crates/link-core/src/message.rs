use serde::Serialize;
use serde_json::{json, Value};

/// A `{type, payload?}` message posted into the embedded surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl OutboundMessage {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload),
        }
    }

    pub fn bare(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    /// Failure reply: same type as the success reply, payload `{error}`.
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, json!({ "error": message.into() }))
    }

    pub fn is_error(&self) -> bool {
        self.payload
            .as_ref()
            .is_some_and(|p| p.get("error").is_some())
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({ "type": self.kind });
        if let Some(payload) = &self.payload {
            value["payload"] = payload.clone();
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_message_has_no_payload() {
        assert_eq!(
            OutboundMessage::bare("SDKdisconnectSuccess").to_value(),
            json!({"type": "SDKdisconnectSuccess"})
        );
    }

    #[test]
    fn error_reply_shape() {
        let msg = OutboundMessage::error("SDKsignRequestCompleted", "User rejected message signing");
        assert!(msg.is_error());
        assert_eq!(
            msg.to_value(),
            json!({"type": "SDKsignRequestCompleted", "payload": {"error": "User rejected message signing"}})
        );
    }

    #[test]
    fn serialize_matches_to_value() {
        let msg = OutboundMessage::new("SDKnativeTransferCompleted", json!("0xhash"));
        assert!(!msg.is_error());
        assert_eq!(serde_json::to_value(&msg).unwrap(), msg.to_value());
    }
}
