//! HTTP API for the veterinary chat service
//!
//! - GET /        - bilingual welcome text
//! - POST /chat   - one chat turn (multipart: message, reply, lang, image, session_id)
//! - POST /clear  - reset a session's history
//! - GET /health  - liveness
//! - GET /metrics - Prometheus exposition

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::AppState;
pub use routes::build_router;

use std::sync::Arc;

use crate::chat::{ChatCompletion, HistoryStore, OpenAiClient, VetChatService};
use crate::config::Config;
use crate::error::Result;

/// Wire the chat service from configuration
pub fn init_app_state(config: &mut Config) -> Result<AppState> {
    let llm_config = std::mem::take(&mut config.llm);
    if !llm_config.has_api_key() {
        tracing::warn!("OPENAI_API_KEY is not set; chat requests will fail until it is configured");
    }
    let client = OpenAiClient::new(llm_config)?;
    Ok(app_state_with(Arc::new(client), config))
}

/// Wire the chat service around any completion backend
pub fn app_state_with(llm: Arc<dyn ChatCompletion>, config: &Config) -> AppState {
    let history = Arc::new(HistoryStore::new(
        config.history.max_turns,
        config.history.session_idle(),
    ));
    AppState {
        chat: Arc::new(VetChatService::new(llm, history)),
    }
}
