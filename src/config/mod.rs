//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `WINDWARD_`
//! prefix; nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use windward::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod error;
mod flights;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use flights::FlightsConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Missing provider credentials are fatal at startup; nothing else in the
/// application is allowed to abort the process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Language-model provider configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Flight-inventory provider configuration
    #[serde(default)]
    pub flights: FlightsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `WINDWARD` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `WINDWARD__AI__OPENAI_API_KEY=sk-...` -> `ai.openai_api_key`
    /// - `WINDWARD__FLIGHTS__SERPAPI_API_KEY=...` -> `flights.serpapi_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("WINDWARD")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid,
    /// including missing provider credentials.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.flights.validate()?;
        Ok(())
    }
}
