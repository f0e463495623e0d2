//! Resource owner password credentials grant (RFC 6749 section 4.3).

use std::sync::Arc;
use async_trait::async_trait;
use tracing::{instrument, warn};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::request::AccessRequest;
use crate::oauth_core::response::AccessResponse;
use crate::oauth_core::scope::ScopeStrategy;
use crate::oauth_core::storage::ResourceOwnerAuthenticator;
use super::{check_requested_scopes, HandleHelper, HandlerOutcome, TokenEndpointHandler};

/// Authenticates `username`/`password` and issues an access token. Granting
/// scopes is left to the caller between the two endpoint phases.
#[derive(Clone)]
pub struct ResourceOwnerPasswordCredentialsGrantHandler {
    pub authenticator: Arc<dyn ResourceOwnerAuthenticator>,
    pub helper: HandleHelper,
    pub scope_strategy: ScopeStrategy,
}

#[async_trait]
impl TokenEndpointHandler for ResourceOwnerPasswordCredentialsGrantHandler {
    #[instrument(skip(self, request), level = "debug", fields(client_id = %request.client.id))]
    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("password") {
            return Ok(HandlerOutcome::Declined);
        }
        if !request.client.grant_types().has(&["password"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use grant type password".into()));
        }
        check_requested_scopes(self.scope_strategy, request.client.scopes.as_slice(), &request.requested_scopes)?;

        let username = request.form_value("username");
        let password = request.form_value("password");
        match self.authenticator.authenticate(username, password).await {
            Ok(()) => {}
            Err(OAuthError::NotFound) => {
                return Err(OAuthError::InvalidRequest("Unable to authenticate the provided username and password".into()))
            }
            Err(e) => {
                warn!(error = %e, "resource owner authentication failed");
                return Err(OAuthError::ServerError(e.to_string()));
            }
        }

        if request.session.subject.is_empty() {
            let username = username.to_string();
            request.session.subject = username.clone();
            request.session.id_token_claims.subject = username;
        }
        request.set_grant_type_handled("password");
        Ok(HandlerOutcome::Handled)
    }

    async fn populate_token_endpoint_response(
        &self,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("password") {
            return Ok(HandlerOutcome::Declined);
        }
        self.helper.issue_access_token(request, response).await?;
        Ok(HandlerOutcome::Handled)
    }
}
