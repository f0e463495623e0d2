//! Opaque token strategies.
//!
//! Every artifact is presented as `<key>.<signature>` where `signature` is the
//! HMAC of `key` under the system secret. Only the signature is stored, so the
//! store never holds enough to present a valid token.

use chrono::{Duration, Utc};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use super::crypto::{hmac_sign, hmac_verify, random_bytes};
use super::error::{OAuthError, Result};
use super::request::Requester;
use super::session::TokenKind;

pub trait AccessTokenStrategy: Send + Sync + 'static {
    /// Storable signature of a presented access token.
    fn access_token_signature(&self, token: &str) -> String;
    /// Mints an access token, returning `(token, signature)`.
    fn generate_access_token(&self, requester: &mut Requester) -> Result<(String, String)>;
    /// Checks integrity and expiry of `token` against its stored requester.
    fn validate_access_token(&self, requester: &Requester, token: &str) -> Result<()>;
}

pub trait RefreshTokenStrategy: Send + Sync + 'static {
    fn refresh_token_signature(&self, token: &str) -> String;
    fn generate_refresh_token(&self, requester: &mut Requester) -> Result<(String, String)>;
    fn validate_refresh_token(&self, requester: &Requester, token: &str) -> Result<()>;
}

pub trait AuthorizeCodeStrategy: Send + Sync + 'static {
    fn authorize_code_signature(&self, code: &str) -> String;
    fn generate_authorize_code(&self, requester: &mut Requester) -> Result<(String, String)>;
    fn validate_authorize_code(&self, requester: &Requester, code: &str) -> Result<()>;
}

/// All three opaque artifact strategies.
pub trait CoreStrategy: AccessTokenStrategy + RefreshTokenStrategy + AuthorizeCodeStrategy {}

impl<T: AccessTokenStrategy + RefreshTokenStrategy + AuthorizeCodeStrategy> CoreStrategy for T {}

/// Minimum length of the HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Generates and validates `<key>.<signature>` values.
#[derive(Clone)]
pub struct HmacEnigma {
    secret: Vec<u8>,
    entropy: usize,
}

impl HmacEnigma {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(OAuthError::ServerError(format!(
                "HMAC secret must be at least {} bytes long",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self { secret: secret.to_vec(), entropy: 32 })
    }

    /// Returns `(token, signature)`.
    pub fn generate(&self) -> Result<(String, String)> {
        let key = random_bytes(self.entropy)?;
        let signature = URL_SAFE_NO_PAD.encode(hmac_sign(&self.secret, &key));
        Ok((format!("{}.{}", URL_SAFE_NO_PAD.encode(&key), signature), signature))
    }

    pub fn validate(&self, token: &str) -> Result<()> {
        let (key, signature) = token
            .split_once('.')
            .ok_or_else(|| OAuthError::InvalidToken("token is malformed".into()))?;
        let key = URL_SAFE_NO_PAD
            .decode(key)
            .map_err(|_| OAuthError::InvalidToken("token key is not valid base64".into()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| OAuthError::InvalidToken("token signature is not valid base64".into()))?;
        if key.is_empty() || !hmac_verify(&self.secret, &key, &signature) {
            return Err(OAuthError::InvalidToken("token signature mismatch".into()));
        }
        Ok(())
    }

    /// The part after the dot, or the empty string for malformed tokens.
    pub fn signature(&self, token: &str) -> String {
        token.split_once('.').map(|(_, sig)| sig.to_string()).unwrap_or_default()
    }
}

/// HMAC-SHA256 strategy for access tokens, refresh tokens and authorization codes.
#[derive(Clone)]
pub struct HmacSha256Strategy {
    enigma: HmacEnigma,
    access_token_lifespan: Duration,
    refresh_token_lifespan: Duration,
    authorize_code_lifespan: Duration,
}

impl HmacSha256Strategy {
    pub fn new(
        secret: &[u8],
        access_token_lifespan: Duration,
        refresh_token_lifespan: Duration,
        authorize_code_lifespan: Duration,
    ) -> Result<Self> {
        Ok(Self {
            enigma: HmacEnigma::new(secret)?,
            access_token_lifespan,
            refresh_token_lifespan,
            authorize_code_lifespan,
        })
    }

    fn generate(&self, requester: &mut Requester, kind: TokenKind, lifespan: Duration) -> Result<(String, String)> {
        let pair = self.enigma.generate()?;
        requester.session.set_expires_at(kind, Utc::now() + lifespan);
        Ok(pair)
    }

    fn validate(&self, requester: &Requester, kind: TokenKind, token: &str) -> Result<()> {
        if let Some(expires_at) = requester.session.expires_at(kind) {
            if expires_at < Utc::now() {
                return Err(OAuthError::InvalidToken("token expired".into()));
            }
        }
        self.enigma.validate(token)
    }
}

impl AccessTokenStrategy for HmacSha256Strategy {
    fn access_token_signature(&self, token: &str) -> String {
        self.enigma.signature(token)
    }

    fn generate_access_token(&self, requester: &mut Requester) -> Result<(String, String)> {
        self.generate(requester, TokenKind::AccessToken, self.access_token_lifespan)
    }

    fn validate_access_token(&self, requester: &Requester, token: &str) -> Result<()> {
        self.validate(requester, TokenKind::AccessToken, token)
    }
}

impl RefreshTokenStrategy for HmacSha256Strategy {
    fn refresh_token_signature(&self, token: &str) -> String {
        self.enigma.signature(token)
    }

    fn generate_refresh_token(&self, requester: &mut Requester) -> Result<(String, String)> {
        self.generate(requester, TokenKind::RefreshToken, self.refresh_token_lifespan)
    }

    fn validate_refresh_token(&self, requester: &Requester, token: &str) -> Result<()> {
        self.validate(requester, TokenKind::RefreshToken, token)
    }
}

impl AuthorizeCodeStrategy for HmacSha256Strategy {
    fn authorize_code_signature(&self, code: &str) -> String {
        self.enigma.signature(code)
    }

    fn generate_authorize_code(&self, requester: &mut Requester) -> Result<(String, String)> {
        self.generate(requester, TokenKind::AuthorizeCode, self.authorize_code_lifespan)
    }

    fn validate_authorize_code(&self, requester: &Requester, code: &str) -> Result<()> {
        self.validate(requester, TokenKind::AuthorizeCode, code)
    }
}
