//! Prompt assembly for the veterinary assistant

use serde::{Deserialize, Serialize};

use super::image::ValidatedImage;
use super::language::Language;
use super::models::{Role, Turn};

/// Text placed in front of an uploaded image
pub const IMAGE_INSTRUCTION: &str = "Analyze this image of hen feces:";

/// Stored in history in place of an image-only user turn
pub const IMAGE_ONLY_PLACEHOLDER: &str = "[image of hen feces]";

/// One outgoing chat completion message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Fixed system instructions with the reply language interpolated
pub fn system_prompt(lang: Language) -> String {
    let lang = lang.as_str();
    format!(
        "You are an intelligent veterinary chatbot specializing in poultry. \
        You will receive images of hen feces and/or hen physical body conditions, along with user inputs. \
        Analyze the provided images and text inputs to diagnose potential diseases and recommend appropriate medications, \
        including organic treatment options. \
        Provide brief, clear responses in a natural, conversational tone in {lang} ('english' or 'hausa'). \
        If additional information is necessary for an accurate diagnosis, ask one concise, relevant follow-up question at a time, \
        limiting to a maximum of three questions. Do not preemptively mention or list subsequent questions; \
        ask a single question at a time, the others might follow if needed. \
        Once sufficient information is gathered, provide a concise prediction that lists only the likely disease(s) \
        and specific medication(s) in {lang}. \
        When recommending treatments (both conventional and organic), also suggest checking our marketplaces in the application \
        for availability. Be aware that you are answering questions from a beginner: do not complicate the process, \
        and make a precise medication recommendation. \
        If the suggested treatments prove ineffective or the condition worsens, advise the user to consult a professional \
        veterinary doctor. \
        Understand that your diagnoses and recommendations are based on high probability and are for a prototype system, \
        not a definitive professional diagnosis."
    )
}

/// Content of the current user message, or `None` when there is nothing to send
pub fn user_content(texts: &[&str], image: Option<&ValidatedImage>) -> Option<MessageContent> {
    let mut parts: Vec<ContentPart> = texts
        .iter()
        .map(|t| ContentPart::Text { text: (*t).to_string() })
        .collect();

    if let Some(image) = image {
        parts.push(ContentPart::Text {
            text: IMAGE_INSTRUCTION.to_string(),
        });
        parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.to_data_uri(),
            },
        });
    }

    match parts.len() {
        0 => None,
        1 if image.is_none() => Some(MessageContent::Text(texts[0].to_string())),
        _ => Some(MessageContent::Parts(parts)),
    }
}

/// Text recorded in history for the current user turn
pub fn history_text(texts: &[&str], has_image: bool) -> String {
    match (texts.is_empty(), has_image) {
        (true, _) => IMAGE_ONLY_PLACEHOLDER.to_string(),
        (false, true) => format!("{}\n{}", texts.join("\n"), IMAGE_ONLY_PLACEHOLDER),
        (false, false) => texts.join("\n"),
    }
}

/// Full message list: system, prior turns, then the current user message
pub fn build_messages(
    lang: Language,
    history: &[Turn],
    current: MessageContent,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::text(Role::System, system_prompt(lang)));
    messages.extend(
        history
            .iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| ChatMessage::text(turn.role, turn.text.clone())),
    );
    messages.push(ChatMessage {
        role: Role::User,
        content: current,
    });
    messages
}
