//! Policy decision point for resource servers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::oauth_core::error::Result;
use crate::policy::PolicyRequest;

pub mod local;

pub use local::LocalWarden;

/// Identity derived from a valid access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallContext {
    pub subject: String,
    pub granted_scopes: Vec<String>,
    pub issuer: String,
    /// Client the token was issued to.
    pub audience: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Firewall: Send + Sync + 'static {
    /// Checks that `token` is valid and carries all `scopes`.
    async fn token_valid(&self, token: &str, scopes: &[&str]) -> Result<FirewallContext>;

    /// `token_valid`, then evaluates `request` on behalf of the token's
    /// subject. Fails with `RequestForbidden` when the policies deny.
    async fn token_allowed(&self, token: &str, request: &PolicyRequest, scopes: &[&str]) -> Result<FirewallContext>;

    /// Evaluates `request` as is, for trusted callers.
    async fn is_allowed(&self, request: &PolicyRequest) -> Result<()>;
}

/// Token of an `Authorization: Bearer <token>` header value.
pub fn token_from_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header() {
        assert_eq!(token_from_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(token_from_bearer("bearer   abc"), Some("abc"));
        assert_eq!(token_from_bearer("Basic Zm9vOmJhcg=="), None);
        assert_eq!(token_from_bearer("Bearer "), None);
        assert_eq!(token_from_bearer("abc"), None);
    }
}
