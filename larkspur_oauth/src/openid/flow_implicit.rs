use async_trait::async_trait;
use tracing::instrument;
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::handler::{
    check_requested_scopes, AuthorizeEndpointHandler, AuthorizeImplicitGrantTypeHandler, HandlerOutcome,
};
use crate::oauth_core::request::AuthorizeRequest;
use crate::oauth_core::response::AuthorizeResponse;
use crate::oauth_core::scope::ScopeStrategy;
use super::helper::IdTokenHandleHelper;

/// Handles `id_token` and `id_token token`.
#[derive(Clone)]
pub struct OpenIdConnectImplicitHandler {
    pub implicit: AuthorizeImplicitGrantTypeHandler,
    pub id_token_helper: IdTokenHandleHelper,
    pub scope_strategy: ScopeStrategy,
}

#[async_trait]
impl AuthorizeEndpointHandler for OpenIdConnectImplicitHandler {
    #[instrument(skip(self, ar, resp), level = "debug", fields(client_id = %ar.client.id))]
    async fn handle_authorize_endpoint_request(
        &self,
        ar: &mut AuthorizeRequest,
        resp: &mut AuthorizeResponse,
    ) -> Result<HandlerOutcome> {
        if !(ar.response_types.matches(&["id_token"]) || ar.response_types.matches(&["token", "id_token"])) {
            return Ok(HandlerOutcome::Declined);
        }
        if !ar.granted_scopes.has(&["openid"]) {
            return Err(OAuthError::InvalidScope("The openid scope is required for response type id_token".into()));
        }

        if !ar.client.response_types().has(&["id_token"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use response type id_token".into()));
        }
        let wants_token = ar.response_types.has(&["token"]);
        if wants_token && !ar.client.response_types().has(&["token"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use response type token".into()));
        }
        if !ar.client.grant_types().has(&["implicit"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use grant type implicit".into()));
        }
        check_requested_scopes(self.scope_strategy, ar.client.scopes.as_slice(), &ar.requested_scopes)?;

        if wants_token {
            self.implicit.issue_implicit_access_token(ar, resp).await?;
            ar.set_response_type_handled("token");
            let hash = self.id_token_helper.token_hash(resp.fragment_value("access_token"));
            ar.session.id_token_claims.access_token_hash = hash;
        }

        self.id_token_helper.issue_implicit_id_token(ar, resp)?;
        resp.add_fragment("state", ar.state.clone());
        ar.set_response_type_handled("id_token");
        Ok(HandlerOutcome::Handled)
    }
}
