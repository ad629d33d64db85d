//! Runtime configuration.
//!
//! Everything operational comes from environment variables with development
//! defaults, loaded once into an explicit `Config` passed to the components
//! that need it. The per-city tables (zone mappings, cache file, store
//! database id, feed URLs) live in [`cities`].

pub mod cities;

use std::env;
use thiserror::Error;

/// Environment variable names, public so tests and deployment tooling can
/// refer to them.
pub const ENV_STORE_BASE_URL: &str = "STORE_BASE_URL";
pub const ENV_STORE_API_KEY: &str = "STORE_API_KEY";
pub const ENV_CLASSIFIER_BASE_URL: &str = "CLASSIFIER_BASE_URL";
pub const ENV_CLASSIFIER_API_KEY: &str = "CLASSIFIER_API_KEY";
pub const ENV_CLASSIFIER_MODEL: &str = "CLASSIFIER_MODEL";
pub const ENV_CITY: &str = "CITY";
pub const ENV_DUPLICATE_THRESHOLD: &str = "DUPLICATE_THRESHOLD";

/// Default development values used when environment variables are absent.
const DEFAULT_STORE_BASE_URL: &str = "http://localhost:8787/v1";
const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CLASSIFIER_MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";
const DEFAULT_CITY: &str = "barcelona";
const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.85;

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    store_base_url: String,
    store_api_key: String,
    classifier_base_url: String,
    classifier_api_key: String,
    classifier_model: String,
    city: String,
    duplicate_threshold: f64,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    /// Only malformed numeric values fail; absent credentials surface later
    /// as collaborator errors, not here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let duplicate_threshold = match env::var(ENV_DUPLICATE_THRESHOLD) {
            Ok(raw) => raw.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                field: ENV_DUPLICATE_THRESHOLD,
                reason: format!("not a number: {raw}"),
            })?,
            Err(_) => DEFAULT_DUPLICATE_THRESHOLD,
        };
        if !(0.0..=1.0).contains(&duplicate_threshold) {
            return Err(ConfigError::InvalidValue {
                field: ENV_DUPLICATE_THRESHOLD,
                reason: format!("must be within [0, 1], got {duplicate_threshold}"),
            });
        }

        Ok(Self {
            store_base_url: env::var(ENV_STORE_BASE_URL)
                .unwrap_or_else(|_| DEFAULT_STORE_BASE_URL.to_string()),
            store_api_key: env::var(ENV_STORE_API_KEY).unwrap_or_default(),
            classifier_base_url: env::var(ENV_CLASSIFIER_BASE_URL)
                .unwrap_or_else(|_| DEFAULT_CLASSIFIER_BASE_URL.to_string()),
            classifier_api_key: env::var(ENV_CLASSIFIER_API_KEY).unwrap_or_default(),
            classifier_model: env::var(ENV_CLASSIFIER_MODEL)
                .unwrap_or_else(|_| DEFAULT_CLASSIFIER_MODEL.to_string()),
            city: env::var(ENV_CITY)
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| DEFAULT_CITY.to_string()),
            duplicate_threshold,
        })
    }

    /// Base URL of the listing store API.
    pub fn store_base_url(&self) -> &str {
        &self.store_base_url
    }
    /// Bearer token for the listing store API.
    pub fn store_api_key(&self) -> &str {
        &self.store_api_key
    }
    /// Base URL of the chat-completions classification service.
    pub fn classifier_base_url(&self) -> &str {
        &self.classifier_base_url
    }
    /// Bearer token for the classification service.
    pub fn classifier_api_key(&self) -> &str {
        &self.classifier_api_key
    }
    /// Model identifier sent with every classification request.
    pub fn classifier_model(&self) -> &str {
        &self.classifier_model
    }
    /// City whose feeds and zone table this run processes.
    pub fn city(&self) -> &str {
        &self.city
    }
    /// Similarity score at or above which a listing counts as a duplicate.
    pub fn duplicate_threshold(&self) -> f64 {
        self.duplicate_threshold
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
