//! One conversational turn, end to end

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::client::{ChatCompletion, LlmError};
use super::history::HistoryStore;
use super::image::{validate_image, ImageError};
use super::language::{messages, Language};
use super::models::{ChatTurnRequest, InvalidSessionId, SessionId, Turn};
use super::prompt;
use crate::metrics::METRICS;

/// Errors surfaced to callers of the chat API
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid language: {0}")]
    InvalidLanguage(String),

    #[error("nothing to send: no message and no image")]
    EmptyTurn,

    #[error(transparent)]
    InvalidSession(#[from] InvalidSessionId),

    #[error("image rejected: {0}")]
    Image(#[from] ImageError),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidLanguage(_)
            | Self::EmptyTurn
            | Self::InvalidSession(_)
            | Self::Image(_)
            | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Llm(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing string in the requested language
    pub fn localized(&self, lang: Language) -> String {
        match self {
            Self::InvalidLanguage(_) => messages::invalid_language().to_string(),
            Self::EmptyTurn => messages::missing_image(lang).to_string(),
            Self::InvalidSession(e) => messages::request_error(lang, &e.to_string()),
            Self::Image(ImageError::Unsupported(_)) => {
                messages::unsupported_image(lang).to_string()
            }
            Self::Image(ImageError::Decode(detail)) => {
                messages::image_processing_error(lang, detail)
            }
            Self::Malformed(detail) => messages::request_error(lang, detail),
            Self::PayloadTooLarge(_) => messages::upload_too_large(lang).to_string(),
            Self::Llm(LlmError::MissingApiKey) => messages::missing_api_key(lang).to_string(),
            Self::Llm(e) => messages::upstream_error(lang, &e.to_string()),
        }
    }
}

/// A completed turn
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub session: SessionId,
    pub reply: String,
}

/// Veterinary chat orchestration: validate, prompt, call, remember
pub struct VetChatService {
    llm: Arc<dyn ChatCompletion>,
    history: Arc<HistoryStore>,
}

impl VetChatService {
    pub fn new(llm: Arc<dyn ChatCompletion>, history: Arc<HistoryStore>) -> Self {
        Self { llm, history }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Run one turn; history is only updated when the model replies
    pub async fn chat(&self, request: ChatTurnRequest) -> Result<ChatOutcome, ChatError> {
        let start = Instant::now();
        let result = self.run_turn(request).await;
        METRICS.record_chat(result.is_ok(), start.elapsed());
        result
    }

    async fn run_turn(&self, request: ChatTurnRequest) -> Result<ChatOutcome, ChatError> {
        self.history.purge_idle();

        let texts = request.texts();
        let has_image = request.has_image();
        if texts.is_empty() && !has_image {
            warn!("Rejected empty turn for session {}", request.session);
            return Err(ChatError::EmptyTurn);
        }

        let image = match request.image.clone().filter(|b| !b.is_empty()) {
            Some(raw) => match validate_image(raw).await {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Rejected image for session {}: {}", request.session, e);
                    METRICS.record_image_rejection(e.reason());
                    return Err(e.into());
                }
            },
            None => None,
        };

        let current = prompt::user_content(&texts, image.as_ref()).ok_or(ChatError::EmptyTurn)?;
        let prior = self.history.snapshot(&request.session);
        let messages = prompt::build_messages(request.language, &prior, current);

        info!(
            "Chat turn: session={}, lang={}, prior_turns={}, image={}",
            request.session,
            request.language,
            prior.len(),
            image.as_ref().map_or(0, |i| i.len())
        );

        let reply = self.llm.complete(&messages).await?;

        self.history.append(
            &request.session,
            [
                Turn::user(prompt::history_text(&texts, image.is_some())),
                Turn::assistant(reply.clone()),
            ],
        );
        METRICS.set_active_sessions(self.history.session_count());

        Ok(ChatOutcome {
            session: request.session,
            reply,
        })
    }

    /// Empty one session's history and return the localized confirmation
    pub fn clear(&self, session: Option<&SessionId>, lang: Language) -> &'static str {
        if let Some(session) = session {
            let removed = self.history.clear(session);
            info!("Cleared {} turns for session {}", removed, session);
        } else {
            info!("Clear requested without a session; nothing to remove");
        }
        METRICS.record_history_clear();
        METRICS.set_active_sessions(self.history.session_count());
        messages::history_cleared(lang)
    }
}
