//! Reply languages and the fixed bilingual strings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language used for model instructions and user-facing strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hausa,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hausa => "hausa",
        }
    }

    /// Parse an optional form value, treating absent or blank as English
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, UnknownLanguage> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }

    /// Pick between the English and Hausa rendering of a string
    pub fn pick<'a>(&self, english: &'a str, hausa: &'a str) -> &'a str {
        match self {
            Self::English => english,
            Self::Hausa => hausa,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for any tag other than `english` or `hausa`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" => Ok(Self::English),
            "hausa" => Ok(Self::Hausa),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// Fixed user-facing strings, one pair per message
pub mod messages {
    use super::Language;

    /// Both renderings, since the caller's language is unknown here
    pub fn invalid_language() -> &'static str {
        "Invalid language. Use 'english' or 'hausa'. / \
         Harshen da ba daidai ba. Yi amfani da 'english' ko 'hausa'."
    }

    pub fn missing_image(lang: Language) -> &'static str {
        lang.pick(
            "Please upload a valid image of hen feces.",
            "Da fatan za a loda hoton kaza mai inganci.",
        )
    }

    pub fn missing_api_key(lang: Language) -> &'static str {
        lang.pick(
            "No valid API key provided.",
            "Ba a bayar da maɓallin API mai inganci ba.",
        )
    }

    pub fn unsupported_image(lang: Language) -> &'static str {
        lang.pick(
            "Only JPEG or PNG images are supported.",
            "Hotunan JPEG ko PNG kawai ake tallafawa.",
        )
    }

    pub fn upload_too_large(lang: Language) -> &'static str {
        lang.pick(
            "Upload too large. Please send a smaller image.",
            "Hoton ya yi girma sosai. Da fatan za a aika ƙaramin hoto.",
        )
    }

    pub fn image_processing_error(lang: Language, detail: &str) -> String {
        format!(
            "{}: {}",
            lang.pick("Error processing image", "Kuskure wajen sarrafa hoto"),
            detail
        )
    }

    pub fn request_error(lang: Language, detail: &str) -> String {
        format!(
            "{}: {}",
            lang.pick("Error processing request", "Kuskure wajen sarrafa buƙata"),
            detail
        )
    }

    pub fn upstream_error(lang: Language, detail: &str) -> String {
        format!("{}: {}", lang.pick("Error", "Kuskure"), detail)
    }

    pub fn history_cleared(lang: Language) -> &'static str {
        lang.pick(
            "Conversation history cleared. Ready for a new case.",
            "An share tarihin tattaunawa. A shirye don sabon shari'a.",
        )
    }

    pub const WELCOME_ENGLISH: &str = "Welcome to the Hen Feces Chatbot API! \
        Use POST /chat with an optional image, optional 'user_message', 'user_reply', and 'lang' ('english' or 'hausa'). \
        Send the returned 'session_id' (form field or X-Session-Id header) to continue a conversation. \
        Use POST /clear to reset conversation history.";

    pub const WELCOME_HAUSA: &str = "Barka da zuwa API na Chatbot na Kaza! \
        Yi amfani da POST /chat tare da hoto, zaɓin 'user_message', 'user_reply', da 'lang' ('english' ko 'hausa'). \
        Aika 'session_id' da aka dawo don ci gaba da tattaunawa. \
        Yi amfani da POST /clear don sake saita tarihin tattaunawa.";
}
