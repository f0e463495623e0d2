//! Error kinds shared by every part of the engine.

use std::fmt;
use serde_json::json;

/// Core OAuth2 error kinds.
///
/// These are kinds, not wire codes. The boundary layer decides how to render
/// them; `error_code`, `status_code` and `to_json` give it the usual mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// A handler does not recognise the request. Only a dispatch signal.
    UnknownRequest,
    /// The request is malformed or semantically invalid.
    InvalidRequest(String),
    /// The client is not entitled to the grant or response type.
    InvalidGrant(String),
    /// A requested scope is not permitted for the client.
    InvalidScope(String),
    /// A nonce or state parameter is too short to be unguessable.
    InsufficientEntropy,
    /// Infrastructure, storage or crypto failure.
    ServerError(String),
    /// The looked-up entity does not exist.
    NotFound,
    /// Client authentication failed.
    InvalidClient,
    /// No handler claimed the grant type.
    UnsupportedGrantType,
    /// No handler claimed the response type(s).
    UnsupportedResponseType,
    /// The presented token is invalid, expired or revoked.
    InvalidToken(String),
    /// The policy decision point denied the request.
    RequestForbidden,
}

impl OAuthError {
    /// RFC 6749 style error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::UnknownRequest => "unknown_request",
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::InsufficientEntropy => "insufficient_entropy",
            OAuthError::ServerError(_) => "server_error",
            OAuthError::NotFound => "not_found",
            OAuthError::InvalidClient => "invalid_client",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::InvalidToken(_) => "invalid_token",
            OAuthError::RequestForbidden => "request_forbidden",
        }
    }

    /// Suggested HTTP status for transports that speak HTTP.
    pub fn status_code(&self) -> u16 {
        match self {
            OAuthError::UnknownRequest
            | OAuthError::InvalidRequest(_)
            | OAuthError::InvalidGrant(_)
            | OAuthError::InvalidScope(_)
            | OAuthError::InsufficientEntropy
            | OAuthError::UnsupportedGrantType
            | OAuthError::UnsupportedResponseType => 400,
            OAuthError::InvalidClient | OAuthError::InvalidToken(_) => 401,
            OAuthError::RequestForbidden => 403,
            OAuthError::NotFound => 404,
            OAuthError::ServerError(_) => 500,
        }
    }

    /// Human readable description.
    pub fn description(&self) -> String {
        match self {
            OAuthError::UnknownRequest => "The handler is not responsible for this request".into(),
            OAuthError::InvalidRequest(d) => with_hint("The request is missing a required parameter or is otherwise malformed", d),
            OAuthError::InvalidGrant(d) => with_hint("The provided authorization grant is invalid", d),
            OAuthError::InvalidScope(d) => with_hint("The requested scope is invalid, unknown, or malformed", d),
            OAuthError::InsufficientEntropy => "The request used a security parameter (e.g., anti-replay, anti-csrf) with insufficient entropy".into(),
            OAuthError::ServerError(d) => with_hint("The authorization server encountered an unexpected condition", d),
            OAuthError::NotFound => "Could not find the requested resource".into(),
            OAuthError::InvalidClient => "Client authentication failed".into(),
            OAuthError::UnsupportedGrantType => "The authorization grant type is not supported by the authorization server".into(),
            OAuthError::UnsupportedResponseType => "The authorization server does not support obtaining a token using this method".into(),
            OAuthError::InvalidToken(d) => with_hint("The token is invalid", d),
            OAuthError::RequestForbidden => "You are not allowed to perform this action".into(),
        }
    }

    /// `{"error": ..., "error_description": ...}` body.
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "error": self.error_code(), "error_description": self.description() })
    }

    /// True for the dispatch signal a handler emits when it declines a request.
    pub fn is_unknown_request(&self) -> bool {
        matches!(self, OAuthError::UnknownRequest)
    }
}

fn with_hint(base: &str, hint: &str) -> String {
    if hint.is_empty() {
        base.to_string()
    } else {
        format!("{}: {}", base, hint)
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error_code(), self.description())
    }
}

impl std::error::Error for OAuthError {}

impl From<jsonwebtoken::errors::Error> for OAuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        OAuthError::ServerError(err.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(err: serde_json::Error) -> Self {
        OAuthError::ServerError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OAuthError>;
