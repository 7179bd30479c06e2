//! UI ↔ host envelopes
//!
//! Three shapes travel over the panel transport:
//!
//! ```json
//! { "type": "Page.navigate", "params": { "url": "..." }, "callbackId": 7 }   // request
//! { "callbackId": 7, "result": { ... } }                                    // reply
//! { "method": "Page.frameNavigated", "result": { ... } }                    // event
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};

/// Correlation id pairing a request with its reply. Starts at 1.
pub type CallbackId = u64;

/// Request sent by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "type")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "callbackId", default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<CallbackId>,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            callback_id: None,
        }
    }

    pub fn with_callback(mut self, callback_id: CallbackId) -> Self {
        self.callback_id = Some(callback_id);
        self
    }

    /// Params as an object, `Null` when absent
    pub fn params_or_null(&self) -> &Value {
        self.params.as_ref().unwrap_or(&Value::Null)
    }

    pub fn parse(raw: Value) -> Result<Self> {
        Ok(serde_json::from_value(raw)?)
    }
}

/// Reply to a request carrying a callback id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(rename = "callbackId")]
    pub callback_id: CallbackId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplyEnvelope {
    pub fn ok(callback_id: CallbackId, result: Value) -> Self {
        Self {
            callback_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(callback_id: CallbackId, error: impl Into<String>) -> Self {
        Self {
            callback_id,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Unsolicited event pushed to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub method: String,
    #[serde(default)]
    pub result: Value,
}

impl EventEnvelope {
    pub fn new(method: impl Into<String>, result: Value) -> Self {
        Self {
            method: method.into(),
            result,
        }
    }
}

/// Anything the host sends to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostMessage {
    Reply(ReplyEnvelope),
    Event(EventEnvelope),
}

impl HostMessage {
    /// Decode a raw message. A message is a reply when it carries a non-zero
    /// `callbackId`, otherwise it must name a `method`.
    pub fn parse(raw: Value) -> Result<Self> {
        let has_callback = raw
            .get("callbackId")
            .and_then(Value::as_u64)
            .is_some_and(|id| id != 0);

        if has_callback {
            return Ok(HostMessage::Reply(serde_json::from_value(raw)?));
        }
        if raw.get("method").and_then(Value::as_str).is_some() {
            return Ok(HostMessage::Event(serde_json::from_value(raw)?));
        }
        Err(ProtocolError::Unroutable)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<ReplyEnvelope> for HostMessage {
    fn from(reply: ReplyEnvelope) -> Self {
        HostMessage::Reply(reply)
    }
}

impl From<EventEnvelope> for HostMessage {
    fn from(event: EventEnvelope) -> Self {
        HostMessage::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_names() {
        let req = RequestEnvelope::new("Page.navigate", Some(json!({ "url": "http://a" })))
            .with_callback(3);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["type"], "Page.navigate");
        assert_eq!(value["callbackId"], 3);

        let bare = serde_json::to_value(RequestEnvelope::new("Page.enable", None)).unwrap();
        assert!(bare.get("callbackId").is_none());
        assert!(bare.get("params").is_none());
    }

    #[test]
    fn test_parse_reply_and_event() {
        let reply = HostMessage::parse(json!({ "callbackId": 4, "error": "boom" })).unwrap();
        assert_eq!(reply, HostMessage::Reply(ReplyEnvelope::err(4, "boom")));

        let event = HostMessage::parse(json!({
            "method": "Page.loadEventFired",
            "result": { "timestamp": 1.0 }
        }))
        .unwrap();
        match event {
            HostMessage::Event(e) => assert_eq!(e.method, "Page.loadEventFired"),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unroutable() {
        assert!(matches!(
            HostMessage::parse(json!({ "result": 1 })),
            Err(ProtocolError::Unroutable)
        ));
    }
}
