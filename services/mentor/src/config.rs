//! Application Configuration Module
//!
//! This module centralizes the configuration for the mentor service.
//! It loads settings from environment variables and provides a single,
//! shareable struct that can be passed throughout the application.

use std::env;
use tracing::Level;

// --- Application Constants ---

/// The size of each audio chunk pulled from the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// The number of seconds of decoded audio the output ring buffer can hold.
pub const OUTPUT_BUFFER_SECS: usize = 30;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY`: Your secret key for the Gemini API. Required.
    // *   `MENTOR_MODEL`: (Optional) Overrides the live model used for the session.
    // *   `MENTOR_VOICE`: (Optional) Overrides the prebuilt voice the mentor speaks with.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO". Can be "TRACE", "DEBUG", "INFO", "WARN", or "ERROR".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let model = env::var("MENTOR_MODEL").ok();
        let voice = env::var("MENTOR_VOICE").ok();

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            gemini_api_key,
            model,
            voice,
            log_level,
        })
    }
}
