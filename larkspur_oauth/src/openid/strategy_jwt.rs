//! ID-token strategy signing claims with an asymmetric key.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use tracing::warn;
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::request::Requester;
use crate::oauth_core::session::TokenKind;
use super::claims::IdTokenClaims;

/// Produces signed ID tokens from the claims carried by a requester's session.
pub trait IdTokenStrategy: Send + Sync + 'static {
    /// Completes the session's ID-token claims and signs them.
    fn generate_id_token(&self, requester: &mut Requester) -> Result<String>;

    /// Signing algorithm, which also selects the `at_hash`/`c_hash` digest.
    fn algorithm(&self) -> Algorithm;
}

/// Asymmetric key pair used to sign and verify ID tokens.
#[derive(Clone)]
pub struct SigningKeys {
    algorithm: Algorithm,
    kid: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKeys {
    /// RS256 key pair from PEM encoded keys.
    pub fn from_rsa_pem(private_key_pem: &[u8], public_key_pem: &[u8]) -> Result<Self> {
        Ok(Self {
            algorithm: Algorithm::RS256,
            kid: None,
            encoding_key: EncodingKey::from_rsa_pem(private_key_pem)?,
            decoding_key: DecodingKey::from_rsa_pem(public_key_pem)?,
        })
    }

    /// Fresh ES256 key pair. Tokens signed with it do not survive a restart.
    pub fn generate_es256() -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|_| OAuthError::ServerError("could not generate ES256 key pair".into()))?;
        let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
            .map_err(|_| OAuthError::ServerError("generated ES256 key pair is unusable".into()))?;
        warn!("no ID token signing key configured, generated an ephemeral ES256 key pair");
        Ok(Self {
            algorithm: Algorithm::ES256,
            kid: None,
            encoding_key: EncodingKey::from_ec_der(pkcs8.as_ref()),
            decoding_key: DecodingKey::from_ec_der(pair.public_key().as_ref()),
        })
    }

    /// Sets the key id announced in the token header.
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn sign(&self, claims: &IdTokenClaims, kid: Option<&str>) -> Result<String> {
        let mut header = Header::new(self.algorithm);
        header.kid = kid.map(str::to_string).or_else(|| self.kid.clone());
        Ok(encode(&header, claims, &self.encoding_key)?)
    }

    /// Verifies signature, expiry and audience of an ID token.
    pub fn verify_id_token(&self, token: &str, audience: &str) -> Result<IdTokenClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[audience]);
        decode::<IdTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| OAuthError::InvalidToken(e.to_string()))
    }
}

/// Default ID-token strategy.
#[derive(Clone)]
pub struct DefaultIdTokenStrategy {
    keys: SigningKeys,
    expiry: Duration,
    issuer: String,
    min_parameter_entropy: usize,
}

impl DefaultIdTokenStrategy {
    pub fn new(keys: SigningKeys, expiry: Duration, issuer: impl Into<String>, min_parameter_entropy: usize) -> Self {
        Self { keys, expiry, issuer: issuer.into(), min_parameter_entropy }
    }

    pub fn keys(&self) -> &SigningKeys {
        &self.keys
    }
}

impl IdTokenStrategy for DefaultIdTokenStrategy {
    fn generate_id_token(&self, requester: &mut Requester) -> Result<String> {
        let now = Utc::now();
        let max_age_requested = !requester.form_value("max_age").is_empty();
        let nonce = requester.form_value("nonce").to_string();
        let audience = requester.client.id.clone();

        let claims = &mut requester.session.id_token_claims;
        if max_age_requested && claims.auth_time.map_or(true, |t| t > now) {
            return Err(OAuthError::InvalidRequest(
                "Authentication time claim is required when max_age is set and can not be in the future".into(),
            ));
        }
        if claims.subject.is_empty() {
            return Err(OAuthError::InvalidRequest("Subject claim can not be empty".into()));
        }
        let expires_at = *claims.expires_at.get_or_insert(now + self.expiry);
        if expires_at < now {
            return Err(OAuthError::InvalidRequest("Expiry claim can not be in the past".into()));
        }
        claims.auth_time.get_or_insert(now);
        if claims.issuer.is_empty() {
            claims.issuer = self.issuer.clone();
        }
        if nonce.len() < self.min_parameter_entropy {
            return Err(OAuthError::InsufficientEntropy);
        }

        claims.nonce = nonce;
        claims.audience = audience;
        claims.issued_at = Some(now);

        let token = self.keys.sign(claims, requester.session.id_token_kid.as_deref())?;
        requester.session.set_expires_at(TokenKind::IdToken, expires_at);
        Ok(token)
    }

    fn algorithm(&self) -> Algorithm {
        self.keys.algorithm()
    }
}
