//! Secret hashing for client credentials.

use std::num::NonZeroU32;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::pbkdf2;
use super::config::OAuthConfig;
use super::crypto::random_bytes;
use super::error::{OAuthError, Result};

/// Hashes secrets before they are persisted and compares presented secrets
/// against stored hashes.
pub trait Hasher: Send + Sync + 'static {
    /// Hashes `data` into a self-describing string.
    fn hash(&self, data: &[u8]) -> Result<String>;

    /// `Ok(())` if `data` matches `hash`, `InvalidClient` on mismatch.
    fn compare(&self, hash: &str, data: &[u8]) -> Result<()>;
}

const PREFIX: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256, encoded as `$pbkdf2-sha256$<iterations>$<salt>$<hash>`.
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: NonZeroU32,
}

impl Pbkdf2Hasher {
    /// Zero iterations are bumped to one.
    pub fn new(iterations: u32) -> Self {
        Self { iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN) }
    }

    /// Hasher with the configured `hash_iterations`.
    pub fn from_config(config: &OAuthConfig) -> Self {
        Self::new(config.hash_iterations)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations.get()
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Hasher for Pbkdf2Hasher {
    fn hash(&self, data: &[u8]) -> Result<String> {
        let salt = random_bytes(SALT_LEN)?;
        let mut out = [0u8; CREDENTIAL_LEN];
        pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, self.iterations, &salt, data, &mut out);
        Ok(format!(
            "${}${}${}${}",
            PREFIX,
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(out)
        ))
    }

    fn compare(&self, hash: &str, data: &[u8]) -> Result<()> {
        let malformed = || OAuthError::ServerError("stored secret hash is malformed".into());
        let mut parts = hash.split('$').skip(1);
        if parts.next() != Some(PREFIX) {
            return Err(malformed());
        }
        let iterations = parts
            .next()
            .and_then(|i| i.parse::<u32>().ok())
            .and_then(NonZeroU32::new)
            .ok_or_else(malformed)?;
        let salt = parts.next().and_then(|s| STANDARD_NO_PAD.decode(s).ok()).ok_or_else(malformed)?;
        let expected = parts.next().and_then(|s| STANDARD_NO_PAD.decode(s).ok()).ok_or_else(malformed)?;
        // ring compares in constant time
        pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, data, &expected)
            .map_err(|_| OAuthError::InvalidClient)
    }
}
