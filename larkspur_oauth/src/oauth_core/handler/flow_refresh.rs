//! Refresh token grant (RFC 6749 section 6) with rotation.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, instrument};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::request::AccessRequest;
use crate::oauth_core::response::AccessResponse;
use crate::oauth_core::storage::RefreshTokenGrantStorage;
use crate::oauth_core::strategy::{AccessTokenStrategy, RefreshTokenStrategy};
use super::{storage_error, HandlerOutcome, TokenEndpointHandler};

#[derive(Clone)]
pub struct RefreshTokenGrantHandler {
    pub access_token_strategy: Arc<dyn AccessTokenStrategy>,
    pub refresh_token_strategy: Arc<dyn RefreshTokenStrategy>,
    pub storage: Arc<dyn RefreshTokenGrantStorage>,
    pub access_token_lifespan: Duration,
}

#[async_trait]
impl TokenEndpointHandler for RefreshTokenGrantHandler {
    #[instrument(skip(self, request), level = "debug", fields(client_id = %request.client.id))]
    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("refresh_token") {
            return Ok(HandlerOutcome::Declined);
        }
        if !request.client.grant_types().has(&["refresh_token"]) {
            return Err(OAuthError::InvalidGrant("The client is not allowed to use grant type refresh_token".into()));
        }

        let refresh = request.form_value("refresh_token").to_string();
        let signature = self.refresh_token_strategy.refresh_token_signature(&refresh);
        let stored = match self.storage.get_refresh_token_session(&signature).await {
            Ok(stored) => stored,
            Err(OAuthError::NotFound) => return Err(OAuthError::InvalidRequest("The refresh token is unknown".into())),
            Err(e) => return Err(storage_error(e)),
        };

        self.refresh_token_strategy
            .validate_refresh_token(&stored, &refresh)
            .map_err(|e| OAuthError::InvalidRequest(e.to_string()))?;

        if stored.client.id != request.client.id {
            return Err(OAuthError::InvalidRequest("Client ID mismatch".into()));
        }

        request.merge(&stored);
        request.set_grant_type_handled("refresh_token");
        Ok(HandlerOutcome::Handled)
    }

    #[instrument(skip(self, request, response), level = "debug", fields(client_id = %request.client.id))]
    async fn populate_token_endpoint_response(
        &self,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<HandlerOutcome> {
        if !request.grant_types.exact("refresh_token") {
            return Ok(HandlerOutcome::Declined);
        }

        let (access_token, access_signature) =
            self.access_token_strategy.generate_access_token(&mut request.requester)?;
        let (refresh_token, refresh_signature) =
            self.refresh_token_strategy.generate_refresh_token(&mut request.requester)?;

        let original = self.refresh_token_strategy.refresh_token_signature(request.form_value("refresh_token"));
        match self
            .storage
            .persist_refresh_token_grant_session(&original, &access_signature, &refresh_signature, &request.requester)
            .await
        {
            Ok(()) => {}
            Err(OAuthError::NotFound) => {
                return Err(OAuthError::InvalidRequest("The refresh token was already used".into()))
            }
            Err(e) => return Err(storage_error(e)),
        }
        debug!(request_id = %request.id, "refresh token rotated");

        response.access_token = access_token;
        response.token_type = "bearer".into();
        response.expires_in = Some(self.access_token_lifespan.num_seconds());
        response.scope = request.granted_scopes.to_string();
        response.set_extra("refresh_token", refresh_token);
        Ok(HandlerOutcome::Handled)
    }
}
