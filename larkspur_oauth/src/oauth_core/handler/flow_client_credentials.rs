//! Client credentials grant (RFC 6749 section 4.4).

use async_trait::async_trait;
use tracing::instrument;
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::request::AccessRequest;
use crate::oauth_core::response::AccessResponse;
use crate::oauth_core::scope::ScopeStrategy;
use super::{check_requested_scopes, HandleHelper, HandlerOutcome, TokenEndpointHandler};

/// Issues an access token to the client itself. Requested scopes the client
/// is entitled to are granted automatically; no refresh token is issued.
#[derive(Clone)]
pub struct ClientCredentialsGrantHandler {
    pub helper: HandleHelper,
    pub scope_strategy: ScopeStrategy,
}

#[async_trait]
impl TokenEndpointHandler for ClientCredentialsGrantHandler {
    #[instrument(skip(self, request), level = "debug", fields(client_id = %request.client.id))]
    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("client_credentials") {
            return Ok(HandlerOutcome::Declined);
        }
        if !request.client.grant_types().has(&["client_credentials"]) {
            return Err(OAuthError::InvalidGrant(
                "The client is not allowed to use grant type client_credentials".into(),
            ));
        }
        check_requested_scopes(self.scope_strategy, request.client.scopes.as_slice(), &request.requested_scopes)?;

        let requested = request.requested_scopes.clone();
        for scope in &requested {
            request.grant_scope(scope.clone());
        }
        if request.session.subject.is_empty() {
            request.session.subject = request.client.id.clone();
        }
        request.set_grant_type_handled("client_credentials");
        Ok(HandlerOutcome::Handled)
    }

    async fn populate_token_endpoint_response(
        &self,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("client_credentials") {
            return Ok(HandlerOutcome::Declined);
        }
        self.helper.issue_access_token(request, response).await?;
        Ok(HandlerOutcome::Handled)
    }
}
