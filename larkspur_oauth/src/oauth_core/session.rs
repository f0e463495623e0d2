//! Per-artifact session data.

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::openid::claims::IdTokenClaims;

/// Kinds of artifacts a session can carry an expiry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    AccessToken,
    RefreshToken,
    AuthorizeCode,
    IdToken,
}

/// Session persisted alongside every issued artifact.
///
/// Every session carries ID-token claims, so OpenID Connect handlers never need
/// to check whether a session supports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Resource owner the artifacts were issued for.
    pub subject: String,
    /// Claims that go into the ID token, filled in during issuance.
    pub id_token_claims: IdTokenClaims,
    /// Key id placed in the ID token header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_kid: Option<String>,
    #[serde(default)]
    expires_at: HashMap<TokenKind, DateTime<Utc>>,
}

impl Session {
    /// Session for `subject`, with the ID token subject set to match.
    pub fn new(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self {
            id_token_claims: IdTokenClaims { subject: subject.clone(), ..Default::default() },
            subject,
            ..Default::default()
        }
    }

    pub fn set_expires_at(&mut self, kind: TokenKind, at: DateTime<Utc>) {
        self.expires_at.insert(kind, at);
    }

    pub fn expires_at(&self, kind: TokenKind) -> Option<DateTime<Utc>> {
        self.expires_at.get(&kind).copied()
    }
}
