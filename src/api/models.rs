//! Wire models for the HTTP API

use serde::{Deserialize, Serialize};

/// Successful chat or clear response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Error payload, already localized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Static welcome text for `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub hausa_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Fields accepted by `POST /clear`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearForm {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Fields accepted by `POST /chat`, collected from multipart parts
#[derive(Debug, Clone, Default)]
pub struct ChatForm {
    pub message: Option<String>,
    pub reply: Option<String>,
    pub lang: Option<String>,
    pub session_id: Option<String>,
    pub image: Option<bytes::Bytes>,
}

/// Header carrying the caller's session identifier
pub const SESSION_HEADER: &str = "x-session-id";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_omits_missing_session() {
        let json = serde_json::to_value(ChatResponse::new("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"response": "ok"}));

        let json = serde_json::to_value(ChatResponse::new("ok").with_session("s1")).unwrap();
        assert_eq!(json["session_id"], "s1");
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("bad")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "bad"}));
    }
}
