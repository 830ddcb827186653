//! Minimal runtime configuration helpers.
//! Both backend secrets are required; there are no defaults for them.

use secrecy::{ExposeSecret, SecretString};

use crate::secrets::SecretStore;

pub const SUPABASE_URL_KEY: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_KEY: &str = "SUPABASE_KEY";
pub const DEFAULT_SECRETS_FILE: &str = "secrets.env";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required secret {0}: set it in the environment or the secrets file")]
    MissingSecret(&'static str),

    #[error("{key} must be an http(s) URL, got {value:?}")]
    InvalidUrl { key: &'static str, value: String },
}

#[derive(Debug)]
pub struct Config {
    /// Base URL of the hosted project, without trailing slash.
    pub supabase_url: String,
    /// Public (anon) API key sent as `apikey` on every request.
    pub supabase_key: SecretString,
}

impl Config {
    pub fn from_secrets(secrets: &SecretStore) -> Result<Self, ConfigError> {
        let url = secrets
            .get(SUPABASE_URL_KEY)
            .map(|v| v.expose_secret().to_string())
            .ok_or(ConfigError::MissingSecret(SUPABASE_URL_KEY))?;
        let supabase_key = secrets
            .get(SUPABASE_KEY_KEY)
            .ok_or(ConfigError::MissingSecret(SUPABASE_KEY_KEY))?;

        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidUrl {
                key: SUPABASE_URL_KEY,
                value: url,
            });
        }

        Ok(Config {
            supabase_url: url.trim_end_matches('/').to_string(),
            supabase_key,
        })
    }
}
