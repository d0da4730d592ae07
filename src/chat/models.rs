//! Data models for chat turns and sessions

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::language::Language;

/// Maximum length of a caller-supplied session identifier
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Sender of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One stored message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Caller identifier scoping a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accept `[A-Za-z0-9_.-]{1,128}`
    pub fn parse(raw: &str) -> Result<Self, InvalidSessionId> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidSessionId(raw.chars().take(MAX_SESSION_ID_LEN).collect()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session id: {0:?}")]
pub struct InvalidSessionId(pub String);

/// One inbound chat turn after form decoding
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    pub session: SessionId,
    pub language: Language,
    pub message: Option<String>,
    pub reply: Option<String>,
    pub image: Option<Bytes>,
}

impl ChatTurnRequest {
    pub fn new(session: SessionId, language: Language) -> Self {
        Self {
            session,
            language,
            message: None,
            reply: None,
            image: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<Bytes>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Non-blank text parts in the order they are sent
    pub fn texts(&self) -> Vec<&str> {
        [self.message.as_deref(), self.reply.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn has_image(&self) -> bool {
        self.image.as_ref().map_or(false, |b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_parse() {
        assert!(SessionId::parse("abc-123_x.y").is_ok());
        assert_eq!(SessionId::parse("  farm-7 ").unwrap().as_str(), "farm-7");
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("has space").is_err());
        assert!(SessionId::parse("semi;colon").is_err());
        assert!(SessionId::parse(&"a".repeat(129)).is_err());
        assert!(SessionId::parse(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_generated_session_ids_are_valid_and_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(SessionId::parse(a.as_str()).is_ok());
    }

    #[test]
    fn test_texts_skip_blank_parts() {
        let request = ChatTurnRequest::new(SessionId::generate(), Language::English)
            .with_message("  ")
            .with_reply(" yes, since Monday ");
        assert_eq!(request.texts(), vec!["yes, since Monday"]);
        assert!(!request.has_image());
    }

    #[test]
    fn test_empty_image_is_not_an_image() {
        let request = ChatTurnRequest::new(SessionId::generate(), Language::English)
            .with_image(Bytes::new());
        assert!(!request.has_image());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }
}
