//! Frame request and response types.
//!
//! A client enters a frame with a GET (no message) and continues it with
//! POSTs whose message carries the state text returned by the previous
//! response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCode, StateError};

/// How the frame was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestMethod {
    /// Initial entry into the frame.
    #[default]
    Get,
    /// Continuation carrying a prior message.
    Post,
}

/// Message attached to a continuation request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Envelope text from the previous response. Should be a string; any
    /// other JSON value is treated as unparseable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl FrameMessage {
    /// Message carrying envelope text.
    pub fn with_state(text: impl Into<String>) -> Self {
        Self {
            state: Some(Value::String(text.into())),
        }
    }
}

/// Inbound frame request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameRequest {
    pub method: RequestMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<FrameMessage>,
}

impl FrameRequest {
    /// Create the initial request of an interaction.
    pub fn initial() -> Self {
        Self {
            method: RequestMethod::Get,
            message: None,
        }
    }

    /// Create a continuation request with the given message.
    pub fn continuation(message: FrameMessage) -> Self {
        Self {
            method: RequestMethod::Post,
            message: Some(message),
        }
    }

    /// True when no prior message is carried.
    pub fn is_initial(&self) -> bool {
        self.message.is_none()
    }
}

/// What a frame handler returns.
///
/// `state` is the raw state the handler wants carried forward; `None` keeps
/// the state recovered from the request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl FrameResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pass-through field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Override the carried state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

/// Handler result with the serialized state envelope merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatefulResult {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub state: String,
}

impl StatefulResult {
    /// Look up a pass-through field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Flatten into a single JSON object.
    pub fn into_value(self) -> Value {
        let mut map = self.fields;
        map.insert("state".to_string(), Value::String(self.state));
        Value::Object(map)
    }
}

/// Response frame sent back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameResponse {
    Ok { result: StatefulResult },
    Error { code: ErrorCode, message: String },
}

impl FrameResponse {
    /// Error response for a failed request.
    pub fn error(err: &StateError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialization() {
        let req = FrameRequest::continuation(FrameMessage::with_state(r#"{"foo":"bar"}"#));
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"method":"POST","message":{"state":"{\"foo\":\"bar\"}"}}"#
        );

        let parsed: FrameRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);
        assert!(!parsed.is_initial());
    }

    #[test]
    fn initial_request_has_no_message() {
        let parsed: FrameRequest = serde_json::from_str(r#"{"method":"GET"}"#).unwrap();
        assert!(parsed.is_initial());
        assert_eq!(parsed, FrameRequest::initial());
    }

    #[test]
    fn message_state_may_be_non_string() {
        let msg: FrameMessage = serde_json::from_str(r#"{"state":{"foo":"bar"}}"#).unwrap();
        assert_eq!(msg.state, Some(json!({"foo": "bar"})));
    }

    #[test]
    fn result_splits_state_from_fields() {
        let result: FrameResult =
            serde_json::from_str(r#"{"image":"/test","state":{"foo":"bar"}}"#).unwrap();
        assert_eq!(result.state, Some(json!({"foo": "bar"})));
        assert_eq!(result.fields.get("image"), Some(&json!("/test")));
        assert!(!result.fields.contains_key("state"));
    }

    #[test]
    fn stateful_result_flattens() {
        let mut fields = Map::new();
        fields.insert("image".to_string(), json!("/test"));
        let result = StatefulResult {
            fields,
            state: "{}".to_string(),
        };
        assert_eq!(result.get("image"), Some(&json!("/test")));
        assert_eq!(
            result.clone().into_value(),
            json!({"image": "/test", "state": "{}"})
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"image": "/test", "state": "{}"})
        );
    }

    #[test]
    fn error_response_serialization() {
        let resp = FrameResponse::error(&crate::InvalidStateSignatureError.into());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            json!({
                "status": "error",
                "code": "invalid_state_signature",
                "message": "invalid state signature"
            })
        );
    }
}
