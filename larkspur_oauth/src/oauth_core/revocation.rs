//! Token revocation (RFC 7009).

use std::sync::Arc;
use tracing::{debug, instrument};
use super::error::{OAuthError, Result};
use super::storage::{AccessTokenStorage, RefreshTokenStorage, TokenRevocationStorage};
use super::strategy::{AccessTokenStrategy, RefreshTokenStrategy};

/// Storage needed to resolve and revoke both token kinds.
pub trait RevocationStorage: AccessTokenStorage + RefreshTokenStorage + TokenRevocationStorage {}

impl<T: AccessTokenStorage + RefreshTokenStorage + TokenRevocationStorage> RevocationStorage for T {}

#[derive(Clone)]
pub struct TokenRevoker {
    pub access_token_strategy: Arc<dyn AccessTokenStrategy>,
    pub refresh_token_strategy: Arc<dyn RefreshTokenStrategy>,
    pub storage: Arc<dyn RevocationStorage>,
}

impl TokenRevoker {
    /// Revokes `token` on behalf of `client_id`.
    ///
    /// Refresh tokens are looked up first. Unknown tokens are not an error.
    /// Tokens issued to another client fail with `InvalidRequest`.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn revoke(&self, client_id: &str, token: &str) -> Result<()> {
        let refresh_signature = self.refresh_token_strategy.refresh_token_signature(token);
        match self.storage.get_refresh_token_session(&refresh_signature).await {
            Ok(stored) => {
                ensure_owner(&stored.client.id, client_id)?;
                debug!("revoking refresh token");
                return self.storage.revoke_refresh_token_session(&refresh_signature).await;
            }
            Err(OAuthError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let access_signature = self.access_token_strategy.access_token_signature(token);
        match self.storage.get_access_token_session(&access_signature).await {
            Ok(stored) => {
                ensure_owner(&stored.client.id, client_id)?;
                debug!("revoking access token");
                self.storage.revoke_access_token_session(&access_signature).await
            }
            Err(OAuthError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn ensure_owner(owner: &str, client_id: &str) -> Result<()> {
    if owner != client_id {
        return Err(OAuthError::InvalidRequest("The token was issued to another client".into()));
    }
    Ok(())
}
