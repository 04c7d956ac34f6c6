use serde::{Deserialize, Serialize};

use crate::models::ImagePickerResult;

pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Session key used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AssistantRequest {
    Ping,
    Send {
        session: Option<String>,
        text: String,
        image: Option<ImagePickerResult>,
        /// Hold the response until the bot reply lands.
        #[serde(default)]
        wait: bool,
    },
    History {
        session: Option<String>,
    },
    Clear {
        session: Option<String>,
    },
    Status {
        session: Option<String>,
    },
    Sessions,
}

impl AssistantRequest {
    /// Session key this request addresses, if it addresses one.
    pub fn session_key(&self) -> Option<&str> {
        match self {
            AssistantRequest::Send { session, .. }
            | AssistantRequest::History { session }
            | AssistantRequest::Clear { session }
            | AssistantRequest::Status { session } => {
                Some(session.as_deref().unwrap_or(DEFAULT_SESSION))
            }
            AssistantRequest::Ping | AssistantRequest::Sessions => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssistantResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl AssistantResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tagged_by_action() {
        let request: AssistantRequest = serde_json::from_value(serde_json::json!({
            "action": "send",
            "session": null,
            "text": "who should I captain?",
            "image": {"uri": "file:///team.png", "width": 640, "height": null, "fileSize": 2048, "fileName": null}
        }))
        .unwrap();

        match &request {
            AssistantRequest::Send { text, image, wait, .. } => {
                assert_eq!(text, "who should I captain?");
                assert!(!wait);
                let image = image.as_ref().unwrap();
                assert_eq!(image.width, Some(640));
                assert_eq!(image.file_size, Some(2048));
            }
            other => panic!("unexpected request: {:?}", other),
        }
        assert_eq!(request.session_key(), Some(DEFAULT_SESSION));
    }

    #[test]
    fn test_session_key_passthrough() {
        let request = AssistantRequest::Clear {
            session: Some("league-a".to_string()),
        };
        assert_eq!(request.session_key(), Some("league-a"));
        assert_eq!(AssistantRequest::Ping.session_key(), None);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = AssistantResponse::err("boom");
        assert!(!resp.is_ok());
        assert_eq!(resp.error.as_deref(), Some("boom"));
        assert_eq!(resp.version, PROTOCOL_VERSION);
        assert!(AssistantResponse::pong().is_ok());
    }
}
