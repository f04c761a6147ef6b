//! Flight-inventory provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Flight-inventory provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FlightsConfig {
    /// SerpAPI key for the Google Flights engine
    pub serpapi_api_key: Option<String>,

    /// Base URL for the search endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How long cached search results stay valid, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Carrier alliance filter passed to the provider
    #[serde(default = "default_alliance")]
    pub include_airlines: String,

    /// Maximum return searches issued concurrently during batch pairing
    #[serde(default = "default_concurrency")]
    pub max_parallel_returns: usize,
}

impl FlightsConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get cache TTL as Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.serpapi_api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate flight provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("SERPAPI_API_KEY"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.cache_ttl_secs == 0 {
            return Err(ValidationError::InvalidCacheTtl);
        }
        if self.max_parallel_returns == 0 || self.max_parallel_returns > 16 {
            return Err(ValidationError::InvalidConcurrency);
        }
        Ok(())
    }
}

impl Default for FlightsConfig {
    fn default() -> Self {
        Self {
            serpapi_api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            include_airlines: default_alliance(),
            max_parallel_returns: default_concurrency(),
        }
    }
}

fn default_base_url() -> String {
    "https://serpapi.com/search".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_alliance() -> String {
    "SKYTEAM".to_string()
}

fn default_concurrency() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> FlightsConfig {
        FlightsConfig {
            serpapi_api_key: Some("key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_flights_config_defaults() {
        let config = FlightsConfig::default();
        assert_eq!(config.base_url, "https://serpapi.com/search");
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.include_airlines, "SKYTEAM");
        assert_eq!(config.max_parallel_returns, 4);
    }

    #[test]
    fn test_validation_missing_key() {
        assert!(FlightsConfig::default().validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_validation_bad_base_url() {
        let config = FlightsConfig {
            base_url: "ftp://example.com".to_string(),
            ..with_key()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBaseUrl)
        ));
    }

    #[test]
    fn test_validation_zero_cache_ttl() {
        let config = FlightsConfig {
            cache_ttl_secs: 0,
            ..with_key()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidCacheTtl)
        ));
    }

    #[test]
    fn test_validation_concurrency_bounds() {
        let config = FlightsConfig {
            max_parallel_returns: 0,
            ..with_key()
        };
        assert!(config.validate().is_err());

        let config = FlightsConfig {
            max_parallel_returns: 17,
            ..with_key()
        };
        assert!(config.validate().is_err());
    }
}
