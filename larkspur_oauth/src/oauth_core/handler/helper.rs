use std::sync::Arc;
use chrono::Duration;
use crate::oauth_core::error::Result;
use crate::oauth_core::request::AccessRequest;
use crate::oauth_core::response::AccessResponse;
use crate::oauth_core::storage::AccessTokenStorage;
use crate::oauth_core::strategy::AccessTokenStrategy;
use super::storage_error;

/// Access-token issuance shared by the grants that only mint an access token.
#[derive(Clone)]
pub struct HandleHelper {
    pub access_token_strategy: Arc<dyn AccessTokenStrategy>,
    pub access_token_storage: Arc<dyn AccessTokenStorage>,
    pub access_token_lifespan: Duration,
}

impl HandleHelper {
    pub async fn issue_access_token(&self, request: &mut AccessRequest, response: &mut AccessResponse) -> Result<()> {
        let (token, signature) = self.access_token_strategy.generate_access_token(&mut request.requester)?;
        self.access_token_storage
            .create_access_token_session(&signature, &request.requester)
            .await
            .map_err(storage_error)?;

        response.access_token = token;
        response.token_type = "bearer".into();
        response.expires_in = Some(self.access_token_lifespan.num_seconds());
        response.scope = request.granted_scopes.to_string();
        Ok(())
    }
}
