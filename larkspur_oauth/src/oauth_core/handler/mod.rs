//! The grant handler chain.
//!
//! Each handler either claims a request (`HandlerOutcome::Handled`), declines
//! it (`HandlerOutcome::Declined`, or the `UnknownRequest` error) so the
//! provider tries the next one, or fails it with any other error, which aborts
//! the chain.

use async_trait::async_trait;
use super::error::{OAuthError, Result};
use super::request::{AccessRequest, AuthorizeRequest};
use super::response::{AccessResponse, AuthorizeResponse};

pub mod helper;
pub mod flow_authorize_code;
pub mod flow_implicit;
pub mod flow_refresh;
pub mod flow_resource_owner;
pub mod flow_client_credentials;

pub use helper::HandleHelper;
pub use flow_authorize_code::AuthorizeExplicitGrantHandler;
pub use flow_implicit::AuthorizeImplicitGrantTypeHandler;
pub use flow_refresh::RefreshTokenGrantHandler;
pub use flow_resource_owner::ResourceOwnerPasswordCredentialsGrantHandler;
pub use flow_client_credentials::ClientCredentialsGrantHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled,
    Declined,
}

#[async_trait]
pub trait AuthorizeEndpointHandler: Send + Sync + 'static {
    async fn handle_authorize_endpoint_request(
        &self,
        ar: &mut AuthorizeRequest,
        resp: &mut AuthorizeResponse,
    ) -> Result<HandlerOutcome>;
}

#[async_trait]
pub trait TokenEndpointHandler: Send + Sync + 'static {
    /// Validates the request and loads any stored state it refers to.
    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> Result<HandlerOutcome>;

    /// Mints and persists the artifacts and fills in the response.
    async fn populate_token_endpoint_response(
        &self,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<HandlerOutcome>;
}

/// Folds a handler result into the chain's tri-state view.
pub(crate) fn outcome(result: Result<HandlerOutcome>) -> Result<HandlerOutcome> {
    match result {
        Err(e) if e.is_unknown_request() => Ok(HandlerOutcome::Declined),
        other => other,
    }
}

/// Storage failures during issuance surface as server errors.
pub(crate) fn storage_error(err: OAuthError) -> OAuthError {
    match err {
        OAuthError::ServerError(_) => err,
        other => OAuthError::ServerError(other.to_string()),
    }
}

/// Fails with `InvalidScope` unless every requested scope is covered by the
/// client's scopes.
pub(crate) fn check_requested_scopes(
    strategy: super::scope::ScopeStrategy,
    client_scopes: &[String],
    requested: &super::arguments::Arguments,
) -> Result<()> {
    for scope in requested {
        if !strategy(client_scopes, scope) {
            return Err(OAuthError::InvalidScope(format!(
                "The client is not allowed to request scope {}",
                scope
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth_core::arguments::Arguments;
    use crate::oauth_core::scope::hierarchic_scope_strategy;

    #[test]
    fn unknown_request_is_a_decline() {
        assert_eq!(outcome(Err(OAuthError::UnknownRequest)), Ok(HandlerOutcome::Declined));
        assert_eq!(outcome(Ok(HandlerOutcome::Handled)), Ok(HandlerOutcome::Handled));
        assert_eq!(outcome(Err(OAuthError::InvalidClient)), Err(OAuthError::InvalidClient));
    }

    #[test]
    fn storage_errors_become_server_errors() {
        assert!(matches!(storage_error(OAuthError::NotFound), OAuthError::ServerError(_)));
    }

    #[test]
    fn scope_check() {
        let client_scopes = vec!["fosite".to_string(), "openid".to_string()];
        let ok = Arguments::from_space_delimited("fosite.read openid");
        let bad = Arguments::from_space_delimited("fosite admin");
        assert!(check_requested_scopes(hierarchic_scope_strategy, &client_scopes, &ok).is_ok());
        assert!(matches!(
            check_requested_scopes(hierarchic_scope_strategy, &client_scopes, &bad),
            Err(OAuthError::InvalidScope(_))
        ));
    }
}
