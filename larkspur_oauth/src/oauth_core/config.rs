//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;
use larkspur_lib::{random_sequence, SECRET_ALPHABET};
use super::error::{OAuthError, Result};
use super::strategy::MIN_SECRET_LEN;

/// Lifespans are given in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub issuer: String,
    pub access_token_lifespan: i64,
    pub refresh_token_lifespan: i64,
    pub authorize_code_lifespan: i64,
    pub id_token_lifespan: i64,
    /// HMAC key for opaque tokens, at least 32 bytes.
    pub system_secret: String,
    /// PBKDF2 iterations for client secrets.
    pub hash_iterations: u32,
    /// Minimum length of `state` and `nonce`.
    pub min_parameter_entropy: usize,
    pub feed_backoff_initial: u64,
    pub feed_backoff_max: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::from("http://localhost:4444"),
            access_token_lifespan: 60 * 60,
            refresh_token_lifespan: 60 * 60 * 24 * 30,
            authorize_code_lifespan: 60 * 10,
            id_token_lifespan: 60 * 60,
            system_secret: String::new(),
            hash_iterations: 10_000,
            min_parameter_entropy: 8,
            feed_backoff_initial: 15,
            feed_backoff_max: 60,
        }
    }
}

impl OAuthConfig {
    pub fn builder() -> OAuthConfigBuilder {
        OAuthConfigBuilder::new()
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.system_secret.len() < MIN_SECRET_LEN {
            return Err(OAuthError::ServerError(format!(
                "system secret must be at least {} bytes long",
                MIN_SECRET_LEN
            )));
        }
        if self.access_token_lifespan <= 0
            || self.refresh_token_lifespan <= 0
            || self.authorize_code_lifespan <= 0
            || self.id_token_lifespan <= 0
        {
            return Err(OAuthError::ServerError("token lifespans must be positive".into()));
        }
        if self.feed_backoff_initial > self.feed_backoff_max {
            return Err(OAuthError::ServerError("feed backoff start exceeds its maximum".into()));
        }
        Ok(())
    }

    pub fn access_token_lifespan(&self) -> Duration {
        Duration::seconds(self.access_token_lifespan)
    }

    pub fn refresh_token_lifespan(&self) -> Duration {
        Duration::seconds(self.refresh_token_lifespan)
    }

    pub fn authorize_code_lifespan(&self) -> Duration {
        Duration::seconds(self.authorize_code_lifespan)
    }

    pub fn id_token_lifespan(&self) -> Duration {
        Duration::seconds(self.id_token_lifespan)
    }

    pub fn feed_backoff(&self) -> (std::time::Duration, std::time::Duration) {
        (
            std::time::Duration::from_secs(self.feed_backoff_initial),
            std::time::Duration::from_secs(self.feed_backoff_max),
        )
    }
}

#[derive(Debug, Default)]
pub struct OAuthConfigBuilder {
    issuer: Option<String>,
    access_token_lifespan: Option<i64>,
    refresh_token_lifespan: Option<i64>,
    authorize_code_lifespan: Option<i64>,
    id_token_lifespan: Option<i64>,
    system_secret: Option<String>,
    hash_iterations: Option<u32>,
    min_parameter_entropy: Option<usize>,
    feed_backoff_initial: Option<u64>,
    feed_backoff_max: Option<u64>,
}

impl OAuthConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issuer<T: Into<String>>(mut self, issuer: T) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn access_token_lifespan(mut self, seconds: i64) -> Self {
        self.access_token_lifespan = Some(seconds);
        self
    }

    pub fn refresh_token_lifespan(mut self, seconds: i64) -> Self {
        self.refresh_token_lifespan = Some(seconds);
        self
    }

    pub fn authorize_code_lifespan(mut self, seconds: i64) -> Self {
        self.authorize_code_lifespan = Some(seconds);
        self
    }

    pub fn id_token_lifespan(mut self, seconds: i64) -> Self {
        self.id_token_lifespan = Some(seconds);
        self
    }

    pub fn system_secret<T: Into<String>>(mut self, secret: T) -> Self {
        self.system_secret = Some(secret.into());
        self
    }

    pub fn hash_iterations(mut self, iterations: u32) -> Self {
        self.hash_iterations = Some(iterations);
        self
    }

    pub fn min_parameter_entropy(mut self, length: usize) -> Self {
        self.min_parameter_entropy = Some(length);
        self
    }

    pub fn feed_backoff(mut self, initial_seconds: u64, max_seconds: u64) -> Self {
        self.feed_backoff_initial = Some(initial_seconds);
        self.feed_backoff_max = Some(max_seconds);
        self
    }

    /// Fills unset fields with defaults. Without a system secret a random one
    /// is generated, so tokens do not survive a restart.
    pub fn build(self) -> Result<OAuthConfig> {
        let defaults = OAuthConfig::default();
        let system_secret = match self.system_secret {
            Some(secret) => secret,
            None => {
                warn!("no system secret configured, generating a random one");
                random_sequence(MIN_SECRET_LEN, SECRET_ALPHABET)
                    .ok_or_else(|| OAuthError::ServerError("could not generate a system secret".into()))?
            }
        };
        let config = OAuthConfig {
            issuer: self.issuer.unwrap_or(defaults.issuer),
            access_token_lifespan: self.access_token_lifespan.unwrap_or(defaults.access_token_lifespan),
            refresh_token_lifespan: self.refresh_token_lifespan.unwrap_or(defaults.refresh_token_lifespan),
            authorize_code_lifespan: self.authorize_code_lifespan.unwrap_or(defaults.authorize_code_lifespan),
            id_token_lifespan: self.id_token_lifespan.unwrap_or(defaults.id_token_lifespan),
            system_secret,
            hash_iterations: self.hash_iterations.unwrap_or(defaults.hash_iterations),
            min_parameter_entropy: self.min_parameter_entropy.unwrap_or(defaults.min_parameter_entropy),
            feed_backoff_initial: self.feed_backoff_initial.unwrap_or(defaults.feed_backoff_initial),
            feed_backoff_max: self.feed_backoff_max.unwrap_or(defaults.feed_backoff_max),
        };
        config.validate()?;
        Ok(config)
    }
}
