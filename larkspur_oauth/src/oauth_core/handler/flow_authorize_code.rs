//! Authorization code grant (RFC 6749 section 4.1).

use std::sync::Arc;
use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, instrument};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::request::{AccessRequest, AuthorizeRequest, Requester};
use crate::oauth_core::response::{AccessResponse, AuthorizeResponse};
use crate::oauth_core::scope::ScopeStrategy;
use crate::oauth_core::storage::{AuthorizeCodeGrantStorage, OpenIdConnectRequestStorage};
use crate::oauth_core::strategy::{AccessTokenStrategy, AuthorizeCodeStrategy, RefreshTokenStrategy};
use crate::openid::helper::IdTokenHandleHelper;
use super::{check_requested_scopes, storage_error, AuthorizeEndpointHandler, HandlerOutcome, TokenEndpointHandler};

/// OpenID Connect part of the explicit flow: an `openid` grant stores an
/// ID-token session next to the code, and the code exchange issues the token.
#[derive(Clone)]
pub struct ExplicitIdToken {
    pub helper: IdTokenHandleHelper,
    pub storage: Arc<dyn OpenIdConnectRequestStorage>,
}

#[derive(Clone)]
pub struct AuthorizeExplicitGrantHandler {
    pub access_token_strategy: Arc<dyn AccessTokenStrategy>,
    pub refresh_token_strategy: Arc<dyn RefreshTokenStrategy>,
    pub authorize_code_strategy: Arc<dyn AuthorizeCodeStrategy>,
    pub storage: Arc<dyn AuthorizeCodeGrantStorage>,
    pub scope_strategy: ScopeStrategy,
    pub access_token_lifespan: Duration,
    pub id_token: Option<ExplicitIdToken>,
}

impl AuthorizeExplicitGrantHandler {
    /// Mints an authorization code and persists its session. Returns the code.
    pub async fn issue_authorize_code(&self, ar: &mut AuthorizeRequest) -> Result<String> {
        let (code, signature) = self.authorize_code_strategy.generate_authorize_code(&mut ar.requester)?;
        self.storage
            .create_authorize_code_session(&signature, &ar.requester)
            .await
            .map_err(storage_error)?;

        if let Some(id_token) = &self.id_token {
            if ar.granted_scopes.has(&["openid"]) {
                id_token
                    .storage
                    .create_open_id_connect_session(&signature, &ar.requester)
                    .await
                    .map_err(storage_error)?;
            }
        }
        Ok(code)
    }

    /// Signs the ID token for an `openid` code exchange. Runs before anything
    /// is persisted, so a rejected ID token leaves the code usable.
    async fn sign_id_token(
        &self,
        code_signature: &str,
        requester: &Requester,
        access_token: &str,
    ) -> Result<Option<String>> {
        let Some(id_token) = &self.id_token else {
            return Ok(None);
        };
        if !requester.granted_scopes.has(&["openid"]) {
            return Ok(None);
        }

        let mut stored = match id_token.storage.get_open_id_connect_session(code_signature).await {
            Ok(stored) => stored,
            Err(OAuthError::NotFound) => return Ok(None),
            Err(e) => return Err(storage_error(e)),
        };
        stored.session.id_token_claims.access_token_hash = id_token.helper.token_hash(access_token);
        id_token.helper.generate_id_token(&mut stored).map(Some)
    }
}

#[async_trait]
impl AuthorizeEndpointHandler for AuthorizeExplicitGrantHandler {
    #[instrument(skip(self, ar, resp), level = "debug", fields(client_id = %ar.client.id))]
    async fn handle_authorize_endpoint_request(
        &self,
        ar: &mut AuthorizeRequest,
        resp: &mut AuthorizeResponse,
    ) -> Result<HandlerOutcome> {
        if !ar.response_types.exact("code") {
            return Ok(HandlerOutcome::Declined);
        }
        if !ar.client.response_types().has(&["code"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use response type code".into()));
        }
        if !ar.client.grant_types().has(&["authorization_code"]) {
            return Err(OAuthError::InvalidGrant(
                "The client is not allowed to use grant type authorization_code".into(),
            ));
        }
        check_requested_scopes(self.scope_strategy, ar.client.scopes.as_slice(), &ar.requested_scopes)?;

        let code = self.issue_authorize_code(ar).await?;
        resp.add_query("code", code);
        resp.add_query("state", ar.state.clone());
        resp.add_query("scope", ar.granted_scopes.to_string());
        ar.set_response_type_handled("code");
        debug!("authorization code issued");
        Ok(HandlerOutcome::Handled)
    }
}

#[async_trait]
impl TokenEndpointHandler for AuthorizeExplicitGrantHandler {
    #[instrument(skip(self, request), level = "debug", fields(client_id = %request.client.id))]
    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("authorization_code") {
            return Ok(HandlerOutcome::Declined);
        }
        if !request.client.grant_types().has(&["authorization_code"]) {
            return Err(OAuthError::InvalidGrant(
                "The client is not allowed to use grant type authorization_code".into(),
            ));
        }

        let code = request.form_value("code").to_string();
        let signature = self.authorize_code_strategy.authorize_code_signature(&code);
        let stored = match self.storage.get_authorize_code_session(&signature).await {
            Ok(stored) => stored,
            Err(OAuthError::NotFound) => {
                return Err(OAuthError::InvalidRequest("The authorization code is unknown or was already used".into()))
            }
            Err(e) => return Err(storage_error(e)),
        };

        self.authorize_code_strategy
            .validate_authorize_code(&stored, &code)
            .map_err(|e| OAuthError::InvalidRequest(e.to_string()))?;

        if stored.client.id != request.client.id {
            return Err(OAuthError::InvalidRequest("Client ID mismatch".into()));
        }
        let authorized_redirect = stored.form_value("redirect_uri");
        if !authorized_redirect.is_empty() && authorized_redirect != request.form_value("redirect_uri") {
            return Err(OAuthError::InvalidRequest(
                "Redirect URI does not match the one used in the authorize request".into(),
            ));
        }

        request.merge(&stored);
        request.set_grant_type_handled("authorization_code");
        Ok(HandlerOutcome::Handled)
    }

    #[instrument(skip(self, request, response), level = "debug", fields(client_id = %request.client.id))]
    async fn populate_token_endpoint_response(
        &self,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("authorization_code") {
            return Ok(HandlerOutcome::Declined);
        }

        let code = request.form_value("code").to_string();
        let code_signature = self.authorize_code_strategy.authorize_code_signature(&code);

        let (access_token, access_signature) =
            self.access_token_strategy.generate_access_token(&mut request.requester)?;
        let refresh = if request.granted_scopes.has(&["offline"]) {
            Some(self.refresh_token_strategy.generate_refresh_token(&mut request.requester)?)
        } else {
            None
        };

        let id_token = self.sign_id_token(&code_signature, &request.requester, &access_token).await?;

        match self
            .storage
            .persist_authorize_code_grant_session(
                &code_signature,
                &access_signature,
                refresh.as_ref().map(|(_, sig)| sig.as_str()),
                &request.requester,
            )
            .await
        {
            Ok(()) => {}
            Err(OAuthError::NotFound) => {
                return Err(OAuthError::InvalidRequest("The authorization code was already used".into()))
            }
            Err(e) => return Err(storage_error(e)),
        }

        response.access_token = access_token;
        response.token_type = "bearer".into();
        response.expires_in = Some(self.access_token_lifespan.num_seconds());
        response.scope = request.granted_scopes.to_string();
        if let Some((refresh_token, _)) = refresh {
            response.set_extra("refresh_token", refresh_token);
        }
        if let (Some(token), Some(explicit)) = (id_token, &self.id_token) {
            response.set_extra("id_token", token);
            explicit
                .storage
                .delete_open_id_connect_session(&code_signature)
                .await
                .map_err(storage_error)?;
        }
        Ok(HandlerOutcome::Handled)
    }
}
