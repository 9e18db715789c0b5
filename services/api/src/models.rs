//! API Models
//!
//! Request and response bodies for the HTTP surface, annotated for `utoipa`
//! so the OpenAPI document stays in step with the handlers.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Body of an avatar invocation.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpawnAvatarPayload {
    #[schema(example = "room123")]
    pub room_name: Option<String>,
    /// Display name for the avatar. Defaults to "AI Interviewer".
    #[schema(example = "AI Interviewer")]
    pub participant_name: Option<String>,
}

/// Terminal outcome of one invocation.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BridgeResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResult {
    pub fn ended(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Query string or body of a participant token request.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TokenRequest {
    pub room_name: Option<String>,
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_spawn_payload_uses_camel_case() {
        let payload: SpawnAvatarPayload =
            serde_json::from_value(json!({"roomName": "room123", "participantName": "Ada"}))
                .unwrap();
        assert_eq!(payload.room_name.as_deref(), Some("room123"));
        assert_eq!(payload.participant_name.as_deref(), Some("Ada"));

        let payload: SpawnAvatarPayload = serde_json::from_value(json!({})).unwrap();
        assert!(payload.room_name.is_none());
        assert!(payload.participant_name.is_none());
    }

    #[test]
    fn test_bridge_result_envelope() {
        let ok = serde_json::to_value(BridgeResult::ended("done")).unwrap();
        assert_eq!(ok, json!({"success": true, "message": "done"}));

        let failed = serde_json::to_value(BridgeResult::failure("boom")).unwrap();
        assert_eq!(failed, json!({"success": false, "error": "boom"}));
        assert_eq!(failed.get("message"), None::<&Value>);
    }

    #[test]
    fn test_token_request_from_body() {
        let request: TokenRequest =
            serde_json::from_str(r#"{"roomName":"room123","participantName":"candidate"}"#)
                .unwrap();
        assert_eq!(request.room_name.as_deref(), Some("room123"));
        assert_eq!(request.participant_name.as_deref(), Some("candidate"));
    }
}
