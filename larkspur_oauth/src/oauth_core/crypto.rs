//! Cryptographic helpers (HMAC, digests, randomness) on top of `ring`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Algorithm;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, hmac};
use super::error::{OAuthError, Result};

/// Fills a buffer of `len` bytes from the system CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| OAuthError::ServerError("system randomness unavailable".into()))?;
    Ok(buf)
}

/// Create an HMAC-SHA256 tag for the given data using the provided secret key.
pub fn hmac_sign(key: &[u8], data: &[u8]) -> Vec<u8> {
    let s_key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&s_key, data).as_ref().to_vec()
}

/// Verify an HMAC-SHA256 tag in constant time.
pub fn hmac_verify(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let s_key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::verify(&s_key, data, tag).is_ok()
}

/// Digest matching the hash function of a JWS algorithm.
pub fn digest_for(algorithm: Algorithm) -> &'static digest::Algorithm {
    match algorithm {
        Algorithm::HS384 | Algorithm::RS384 | Algorithm::ES384 | Algorithm::PS384 => &digest::SHA384,
        Algorithm::HS512 | Algorithm::RS512 | Algorithm::PS512 | Algorithm::EdDSA => &digest::SHA512,
        _ => &digest::SHA256,
    }
}

/// Left half of the digest of `data`, base64url encoded without padding.
///
/// This is the `at_hash` / `c_hash` value of OpenID Connect.
pub fn left_half_hash(algorithm: Algorithm, data: &[u8]) -> String {
    let hash = digest::digest(digest_for(algorithm), data);
    let bytes = hash.as_ref();
    URL_SAFE_NO_PAD.encode(&bytes[..bytes.len() / 2])
}
