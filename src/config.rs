//! Service configuration
//!
//! Values are layered: serde defaults, then an optional TOML file, then
//! `VETCHAT__<SECTION>__<KEY>` environment variables, and finally the
//! conventional variables handled by [`Config::from_env`].

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default configuration file looked up when `VETCHAT_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on request bodies, images included
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Chat completion upstream settings
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API, without the `/v1/...` path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key (read from env OPENAI_API_KEY if not set)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Rolling conversation window settings
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Maximum stored turns per session
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Sessions untouched for this long are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

/// Cross-origin settings for the browser frontend
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_max_body_bytes() -> usize { 10 * 1024 * 1024 }
fn default_base_url() -> String { "https://api.openai.com".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_timeout_secs() -> u64 { 60 }
fn default_max_turns() -> usize { 10 }
fn default_session_idle_secs() -> u64 { 3600 }
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "https://your-frontend-domain.onrender.com".to_string(),
    ]
}
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file plus `VETCHAT__*` environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("VETCHAT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        let config = config.from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load using `VETCHAT_CONFIG` or the default file name
    pub fn load() -> Result<Self> {
        let path = std::env::var("VETCHAT_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_file(&path)
    }

    /// Apply the conventional environment variables
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = val;
        }

        if let Ok(val) = std::env::var("OPENAI_MODEL") {
            self.llm.model = val;
        }

        if let Ok(val) = std::env::var("PORT") {
            self.server.port = parse_port(&val)?;
        }

        if let Ok(val) = std::env::var("CORS_ALLOWED_ORIGINS") {
            let origins: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            if !origins.is_empty() {
                self.cors.allowed_origins = origins;
            }
        }

        Ok(self)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.history.max_turns == 0 {
            return Err(Error::InvalidConfig(
                "history.max_turns must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::InvalidConfig("llm.model cannot be empty".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(Error::InvalidConfig(
                "server.max_body_bytes must be positive".to_string(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("invalid listen address: {}", e)))
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim().parse().map_err(|e| {
        tracing::warn!("Rejecting PORT={:?}: {}", raw, e);
        Error::InvalidConfig(format!("invalid PORT {:?}: {}", raw, e))
    })
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// True when a non-blank key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .map_or(false, |k| !k.expose_secret().trim().is_empty())
    }
}

impl HistoryConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "https://api.openai.com");
        assert_eq!(config.history.max_turns, 10);
        assert!(config.cors.allowed_origins.contains(&"http://localhost:3000".to_string()));
        assert!(!config.llm.has_api_key());
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let mut llm = LlmConfig::default();
        llm.api_key = Some(SecretString::new("   ".to_string()));
        assert!(!llm.has_api_key());

        llm.api_key = Some(SecretString::new("sk-test".to_string()));
        assert!(llm.has_api_key());
    }

    #[test]
    fn test_validate_rejects_zero_turns() {
        let mut config = Config::default();
        config.history.max_turns = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr().unwrap();
        assert_eq!(addr.port(), 8000);

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_port_must_parse() {
        assert_eq!(parse_port("9000").unwrap(), 9000);
        assert_eq!(parse_port(" 8080 ").unwrap(), 8080);
        assert!(matches!(parse_port("eighty"), Err(Error::InvalidConfig(_))));
        assert!(matches!(parse_port("70000"), Err(Error::InvalidConfig(_))));
        assert!(matches!(parse_port(""), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_duration_conversions() {
        let config = Config::default();
        assert_eq!(config.llm.timeout(), Duration::from_secs(60));
        assert_eq!(config.history.session_idle(), Duration::from_secs(3600));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::from_file("definitely-not-here.toml").unwrap();
        assert_eq!(config.history.max_turns, 10);
    }
}
