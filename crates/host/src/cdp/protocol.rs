//! CDP Protocol Types
//!
//! Raw framing for the browser-level WebSocket. Commands are correlated by `id`;
//! events carry no id and, for flattened sessions, a `sessionId`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing per connection
pub type RequestId = u64;

/// Target ID from Chrome
pub type TargetId = String;

/// Session ID for attached targets
pub type SessionId = String;

/// CDP Request sent to browser
#[derive(Debug, Clone, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// CDP Response from browser
#[derive(Debug, Clone, Deserialize)]
pub struct CDPResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<CDPErrorBody>,
}

/// Error object inside a response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CDPErrorBody {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct CDPEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

impl CDPEvent {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params: Some(params),
            session_id: None,
        }
    }

    /// Params, `Null` when the browser sent none
    pub fn params_or_null(&self) -> Value {
        self.params.clone().unwrap_or(Value::Null)
    }
}

/// Unified CDP Message (response or event)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
}

/// Result of Target.createTarget
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTargetResult {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

/// Result of Target.attachToTarget
#[derive(Debug, Clone, Deserialize)]
pub struct AttachToTargetResult {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

/// One entry of Page.getNavigationHistory
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationEntry {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Result of Page.getNavigationHistory
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationHistoryResult {
    #[serde(rename = "currentIndex")]
    pub current_index: usize,
    pub entries: Vec<NavigationEntry>,
}

impl NavigationHistoryResult {
    /// Entry `offset` steps away from the current one, if it exists
    pub fn relative(&self, offset: isize) -> Option<&NavigationEntry> {
        let index = self.current_index.checked_add_signed(offset)?;
        self.entries.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_discrimination() {
        let response: CDPMessage =
            serde_json::from_value(json!({ "id": 3, "result": { "frameId": "F" } })).unwrap();
        assert!(matches!(response, CDPMessage::Response(ref r) if r.id == 3));

        let event: CDPMessage = serde_json::from_value(json!({
            "method": "Page.loadEventFired",
            "params": { "timestamp": 2.0 },
            "sessionId": "S1"
        }))
        .unwrap();
        match event {
            CDPMessage::Event(e) => assert_eq!(e.session_id.as_deref(), Some("S1")),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_history_relative() {
        let history: NavigationHistoryResult = serde_json::from_value(json!({
            "currentIndex": 1,
            "entries": [
                { "id": 1, "url": "a", "title": "" },
                { "id": 2, "url": "b", "title": "" },
                { "id": 3, "url": "c", "title": "" }
            ]
        }))
        .unwrap();

        assert_eq!(history.relative(-1).map(|e| e.id), Some(1));
        assert_eq!(history.relative(1).map(|e| e.id), Some(3));
        assert!(history.relative(2).is_none());
        assert!(history.relative(-2).is_none());
    }
}
