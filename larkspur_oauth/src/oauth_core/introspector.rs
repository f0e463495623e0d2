//! Access-token introspection.

use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, instrument};
use crate::client::ClientManager;
use super::error::{OAuthError, Result};
use super::request::Requester;
use super::scope::ScopeStrategy;
use super::storage::AccessTokenStorage;
use super::strategy::AccessTokenStrategy;

/// Resolves a presented access token to the requester it was issued for.
#[async_trait]
pub trait TokenIntrospector: Send + Sync + 'static {
    /// Fails with `InvalidToken` for unknown, tampered, expired or orphaned
    /// tokens and with `InvalidScope` when a scope was not granted.
    async fn introspect_token(&self, token: &str, scopes: &[&str]) -> Result<Requester>;
}

/// Introspects opaque access tokens against the local store.
#[derive(Clone)]
pub struct CoreValidator {
    pub access_token_strategy: Arc<dyn AccessTokenStrategy>,
    pub access_token_storage: Arc<dyn AccessTokenStorage>,
    pub clients: Arc<dyn ClientManager>,
    pub scope_strategy: ScopeStrategy,
}

#[async_trait]
impl TokenIntrospector for CoreValidator {
    #[instrument(skip(self, token), level = "debug")]
    async fn introspect_token(&self, token: &str, scopes: &[&str]) -> Result<Requester> {
        let signature = self.access_token_strategy.access_token_signature(token);
        let requester = match self.access_token_storage.get_access_token_session(&signature).await {
            Ok(requester) => requester,
            Err(OAuthError::NotFound) => return Err(OAuthError::InvalidToken("Token is unknown".into())),
            Err(e) => return Err(e),
        };

        self.access_token_strategy.validate_access_token(&requester, token)?;

        for scope in scopes {
            if !(self.scope_strategy)(requester.granted_scopes.as_slice(), scope) {
                return Err(OAuthError::InvalidScope(format!("Scope {} was not granted", scope)));
            }
        }

        // Sessions of deleted clients are orphaned and must not validate.
        match self.clients.get_client(&requester.client.id).await {
            Ok(_) => {}
            Err(OAuthError::NotFound) => {
                debug!(client_id = %requester.client.id, "token belongs to a deleted client");
                return Err(OAuthError::InvalidToken("The client of this token no longer exists".into()));
            }
            Err(e) => return Err(e),
        }
        Ok(requester)
    }
}
