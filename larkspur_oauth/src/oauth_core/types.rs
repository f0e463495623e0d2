//! OAuth2 client registration.

use serde::{Deserialize, Serialize};
use super::arguments::Arguments;

/// Represents a registered OAuth 2.0 client application.
///
/// `secret` holds the hashed secret while the client lives inside a directory.
/// Directory read APIs clear it before handing a client out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier, immutable once assigned.
    #[serde(default)]
    pub id: String,
    /// Hashed secret, or the plaintext on the way in and in the creation echo.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Allowed redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Allowed grant types. Empty means `authorization_code`.
    #[serde(default)]
    pub grant_types: Arguments,
    /// Allowed response types. Empty means `code`.
    #[serde(default)]
    pub response_types: Arguments,
    /// Scopes the client may request.
    #[serde(default)]
    pub scopes: Arguments,
    /// Owner of the registration.
    #[serde(default)]
    pub owner: String,
}

impl Client {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    /// Allowed grant types, with the protocol default applied.
    pub fn grant_types(&self) -> Arguments {
        if self.grant_types.is_empty() {
            Arguments::from_space_delimited("authorization_code")
        } else {
            self.grant_types.clone()
        }
    }

    /// Allowed response types, with the protocol default applied.
    pub fn response_types(&self) -> Arguments {
        if self.response_types.is_empty() {
            Arguments::from_space_delimited("code")
        } else {
            self.response_types.clone()
        }
    }

    /// Copy of the client without its secret.
    pub fn sanitized(&self) -> Self {
        Self { secret: String::new(), ..self.clone() }
    }
}
