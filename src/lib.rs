//! Poultry veterinary chat gateway
//!
//! Forwards user text and optional images of hen feces to an
//! OpenAI-compatible multimodal chat completion API and relays the reply,
//! keeping a short rolling conversation window per session. All user-facing
//! strings are available in English and Hausa.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};
