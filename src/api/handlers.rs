use axum::{
    extract::{multipart::MultipartRejection, FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::models::{
    ChatForm, ChatResponse, ClearForm, ErrorResponse, HealthResponse, RootResponse, SESSION_HEADER,
};
use crate::chat::language::messages;
use crate::chat::{ChatError, ChatTurnRequest, Language, SessionId, VetChatService};
use crate::metrics::METRICS;

/// Shared state for the chat API
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<VetChatService>,
}

type ApiFailure = (StatusCode, Json<ErrorResponse>);

/// Log and render a chat error in the caller's language
fn failure(err: ChatError, lang: Language) -> ApiFailure {
    let status = err.status();
    if status.is_server_error() {
        error!("Chat request failed: {}", err);
    } else {
        warn!("Chat request rejected: {}", err);
    }
    (status, Json(ErrorResponse::new(err.localized(lang))))
}

/// Session from the `X-Session-Id` header, falling back to the form field
fn session_from(headers: &HeaderMap, form_value: Option<&str>) -> Result<Option<SessionId>, ChatError> {
    let header_value = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match header_value.or(form_value.map(str::trim).filter(|v| !v.is_empty())) {
        Some(raw) => Ok(Some(SessionId::parse(raw)?)),
        None => Ok(None),
    }
}

/// Keep the extractor's verdict so body-limit hits stay 413
fn rejected(status: StatusCode, detail: String) -> ChatError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ChatError::PayloadTooLarge(detail)
    } else {
        ChatError::Malformed(detail)
    }
}

fn parse_language(raw: Option<&str>) -> Result<Language, ChatError> {
    Language::parse_or_default(raw).map_err(|e| ChatError::InvalidLanguage(e.0))
}

/// Drain a multipart body into the known chat fields; unknown parts are skipped
async fn read_chat_form(mut multipart: Multipart) -> Result<ChatForm, ChatError> {
    let mut form = ChatForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejected(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| rejected(e.status(), e.body_text()))?;
                form.image = Some(data);
            }
            "message" | "user_message" | "reply" | "user_reply" | "lang" | "session_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| rejected(e.status(), e.body_text()))?;
                let slot = match name.as_str() {
                    "message" | "user_message" => &mut form.message,
                    "reply" | "user_reply" => &mut form.reply,
                    "lang" => &mut form.lang,
                    _ => &mut form.session_id,
                };
                *slot = Some(text);
            }
            other => {
                warn!("Ignoring unknown form field: {}", other);
            }
        }
    }

    Ok(form)
}

/// Static bilingual welcome text
///
/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: messages::WELCOME_ENGLISH.to_string(),
        hausa_message: messages::WELCOME_HAUSA.to_string(),
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}

/// Run one chat turn
///
/// POST /chat (multipart form)
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ChatResponse>, ApiFailure> {
    let multipart = multipart
        .map_err(|e| failure(rejected(e.status(), e.body_text()), Language::default()))?;
    let form = read_chat_form(multipart)
        .await
        .map_err(|e| failure(e, Language::default()))?;

    let lang = parse_language(form.lang.as_deref()).map_err(|e| failure(e, Language::default()))?;

    let session = session_from(&headers, form.session_id.as_deref())
        .map_err(|e| failure(e, lang))?
        .unwrap_or_else(SessionId::generate);

    info!(
        "Chat request: session={}, lang={}, has_image={}",
        session,
        lang,
        form.image.is_some()
    );

    let request = ChatTurnRequest {
        session,
        language: lang,
        message: form.message,
        reply: form.reply,
        image: form.image,
    };

    match state.chat.chat(request).await {
        Ok(outcome) => Ok(Json(
            ChatResponse::new(outcome.reply).with_session(outcome.session.to_string()),
        )),
        Err(e) => Err(failure(e, lang)),
    }
}

/// Accept `/clear` as urlencoded, multipart, or an empty body
async fn read_clear_form(req: Request) -> Result<ClearForm, ChatError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        let mut form = ClearForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "lang" || name == "session_id" {
                let text = field
                    .text()
                    .await
                    .map_err(|e| rejected(e.status(), e.body_text()))?;
                if name == "lang" {
                    form.lang = Some(text);
                } else {
                    form.session_id = Some(text);
                }
            }
        }
        Ok(form)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<ClearForm>::from_request(req, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        Ok(form)
    } else {
        Ok(ClearForm::default())
    }
}

/// Empty the caller's conversation history
///
/// POST /clear
pub async fn clear(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<ChatResponse>, ApiFailure> {
    let headers = req.headers().clone();
    let form = read_clear_form(req)
        .await
        .map_err(|e| failure(e, Language::default()))?;

    let lang = parse_language(form.lang.as_deref()).map_err(|e| failure(e, Language::default()))?;
    let session = session_from(&headers, form.session_id.as_deref()).map_err(|e| failure(e, lang))?;

    let confirmation = state.chat.clear(session.as_ref(), lang);
    Ok(Json(ChatResponse::new(confirmation)))
}
