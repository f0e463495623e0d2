use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims of an OpenID Connect ID token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    #[serde(rename = "sub", default)]
    pub subject: String,
    #[serde(rename = "iss", default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(rename = "aud", default, skip_serializing_if = "String::is_empty")]
    pub audience: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nonce: String,
    #[serde(with = "chrono::serde::ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<DateTime<Utc>>,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "c_hash", default, skip_serializing_if = "String::is_empty")]
    pub code_hash: String,
    #[serde(rename = "at_hash", default, skip_serializing_if = "String::is_empty")]
    pub access_token_hash: String,
    /// Additional claims, e.g. `email` or `name`.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl IdTokenClaims {
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), ..Default::default() }
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.extra.insert(key.into(), value.into());
    }
}
