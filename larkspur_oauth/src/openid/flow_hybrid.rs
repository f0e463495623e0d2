//! OpenID Connect hybrid flow: `code token`, `code id_token token`.

use async_trait::async_trait;
use tracing::{debug, instrument};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::handler::{
    check_requested_scopes, AuthorizeEndpointHandler, AuthorizeExplicitGrantHandler,
    AuthorizeImplicitGrantTypeHandler, HandlerOutcome,
};
use crate::oauth_core::request::AuthorizeRequest;
use crate::oauth_core::response::AuthorizeResponse;
use crate::oauth_core::scope::ScopeStrategy;
use super::helper::IdTokenHandleHelper;

/// Issues code, access token and ID token from one authorize request.
///
/// The code is minted first and the access token second, because both are
/// hashed into the ID token (`c_hash`, `at_hash`). The ID token is only issued
/// when `openid` was granted.
#[derive(Clone)]
pub struct OpenIdConnectHybridHandler {
    pub explicit: AuthorizeExplicitGrantHandler,
    pub implicit: AuthorizeImplicitGrantTypeHandler,
    pub id_token_helper: IdTokenHandleHelper,
    pub scope_strategy: ScopeStrategy,
}

#[async_trait]
impl AuthorizeEndpointHandler for OpenIdConnectHybridHandler {
    #[instrument(skip(self, ar, resp), level = "debug", fields(client_id = %ar.client.id))]
    async fn handle_authorize_endpoint_request(
        &self,
        ar: &mut AuthorizeRequest,
        resp: &mut AuthorizeResponse,
    ) -> Result<HandlerOutcome> {
        if ar.response_types.len() < 2 {
            return Ok(HandlerOutcome::Declined);
        }
        if !(ar.response_types.matches(&["token", "id_token", "code"]) || ar.response_types.matches(&["token", "code"])) {
            return Ok(HandlerOutcome::Declined);
        }

        if !ar.client.response_types().has(&["token", "code"]) {
            return Err(OAuthError::InvalidGrant(
                "The client is not allowed to use the code and token response type".into(),
            ));
        }
        if ar.response_types.has(&["id_token"]) && !ar.client.response_types().has(&["id_token"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use the id_token response type".into()));
        }
        check_requested_scopes(self.scope_strategy, ar.client.scopes.as_slice(), &ar.requested_scopes)?;

        if ar.response_types.has(&["code"]) {
            if !ar.client.grant_types().has(&["authorization_code"]) {
                return Err(OAuthError::InvalidGrant(
                    "The client is not allowed to use the authorization_code grant type".into(),
                ));
            }
            let code = self.explicit.issue_authorize_code(ar).await?;
            resp.add_fragment("code", code);
            resp.add_fragment("state", ar.state.clone());
            ar.set_response_type_handled("code");

            let hash = self.id_token_helper.token_hash(resp.fragment_value("code"));
            ar.session.id_token_claims.code_hash = hash;
        }

        if ar.response_types.has(&["token"]) {
            if !ar.client.grant_types().has(&["implicit"]) {
                return Err(OAuthError::InvalidGrant("The client is not allowed to use the implicit grant type".into()));
            }
            self.implicit.issue_implicit_access_token(ar, resp).await?;
            ar.set_response_type_handled("token");

            let hash = self.id_token_helper.token_hash(resp.fragment_value("access_token"));
            ar.session.id_token_claims.access_token_hash = hash;
        }

        if !ar.granted_scopes.has(&["openid"]) {
            debug!("openid scope not granted, skipping ID token");
            return Ok(HandlerOutcome::Handled);
        }

        self.id_token_helper.issue_implicit_id_token(ar, resp)?;
        ar.set_response_type_handled("id_token");
        Ok(HandlerOutcome::Handled)
    }
}
