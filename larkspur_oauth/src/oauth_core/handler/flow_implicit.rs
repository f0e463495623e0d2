//! Implicit grant (RFC 6749 section 4.2).

use std::sync::Arc;
use async_trait::async_trait;
use chrono::Duration;
use tracing::instrument;
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::request::AuthorizeRequest;
use crate::oauth_core::response::AuthorizeResponse;
use crate::oauth_core::scope::ScopeStrategy;
use crate::oauth_core::storage::ImplicitGrantStorage;
use crate::oauth_core::strategy::AccessTokenStrategy;
use super::{check_requested_scopes, storage_error, AuthorizeEndpointHandler, HandlerOutcome};

#[derive(Clone)]
pub struct AuthorizeImplicitGrantTypeHandler {
    pub access_token_strategy: Arc<dyn AccessTokenStrategy>,
    pub storage: Arc<dyn ImplicitGrantStorage>,
    pub scope_strategy: ScopeStrategy,
    pub access_token_lifespan: Duration,
}

impl AuthorizeImplicitGrantTypeHandler {
    /// Mints an access token, persists it and writes it to the response
    /// fragment.
    pub async fn issue_implicit_access_token(&self, ar: &mut AuthorizeRequest, resp: &mut AuthorizeResponse) -> Result<()> {
        let (token, signature) = self.access_token_strategy.generate_access_token(&mut ar.requester)?;
        self.storage
            .create_implicit_access_token_session(&signature, &ar.requester)
            .await
            .map_err(storage_error)?;

        resp.add_fragment("access_token", token);
        resp.add_fragment("expires_in", self.access_token_lifespan.num_seconds().to_string());
        resp.add_fragment("token_type", "bearer");
        resp.add_fragment("state", ar.state.clone());
        resp.add_fragment("scope", ar.granted_scopes.to_string());
        Ok(())
    }
}

#[async_trait]
impl AuthorizeEndpointHandler for AuthorizeImplicitGrantTypeHandler {
    #[instrument(skip(self, ar, resp), level = "debug", fields(client_id = %ar.client.id))]
    async fn handle_authorize_endpoint_request(
        &self,
        ar: &mut AuthorizeRequest,
        resp: &mut AuthorizeResponse,
    ) -> Result<HandlerOutcome> {
        if !ar.response_types.exact("token") {
            return Ok(HandlerOutcome::Declined);
        }
        if !ar.client.response_types().has(&["token"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use response type token".into()));
        }
        if !ar.client.grant_types().has(&["implicit"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use grant type implicit".into()));
        }
        check_requested_scopes(self.scope_strategy, ar.client.scopes.as_slice(), &ar.requested_scopes)?;

        self.issue_implicit_access_token(ar, resp).await?;
        ar.set_response_type_handled("token");
        Ok(HandlerOutcome::Handled)
    }
}
