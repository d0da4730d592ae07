//! Veterinary chat core
//!
//! - Image validation (JPEG/PNG only)
//! - Prompt assembly with bilingual instructions
//! - Chat completion client
//! - Per-session rolling history

pub mod client;
pub mod history;
pub mod image;
pub mod language;
pub mod models;
pub mod prompt;
pub mod service;

pub use client::{ChatCompletion, LlmError, OpenAiClient};
pub use history::HistoryStore;
pub use self::image::{validate_image, ImageError, ValidatedImage};
pub use language::Language;
pub use models::{ChatTurnRequest, Role, SessionId, Turn};
pub use service::{ChatError, ChatOutcome, VetChatService};
