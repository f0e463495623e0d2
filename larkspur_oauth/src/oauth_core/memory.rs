//! In-memory implementation of the storage contract.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use super::error::{OAuthError, Result};
use super::request::Requester;
use super::storage::{
    AccessTokenStorage, AuthorizeCodeGrantStorage, AuthorizeCodeStorage, ImplicitGrantStorage,
    OpenIdConnectRequestStorage, RefreshTokenGrantStorage, RefreshTokenStorage, ResourceOwnerAuthenticator,
};

type Sessions = Arc<RwLock<HashMap<String, Requester>>>;

/// Keeps every artifact kind in its own map. Cloning shares the maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    authorize_codes: Sessions,
    access_tokens: Sessions,
    refresh_tokens: Sessions,
    implicit: Sessions,
    id_sessions: Sessions,
    resource_owners: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource owner for the password grant.
    pub async fn add_resource_owner(&self, username: impl Into<String>, password: impl Into<String>) {
        self.resource_owners.write().await.insert(username.into(), password.into());
    }

    /// Number of live access-token sessions.
    pub async fn access_token_count(&self) -> usize {
        self.access_tokens.read().await.len()
    }

    /// Number of live refresh-token sessions.
    pub async fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.read().await.len()
    }
}

async fn put(map: &Sessions, key: &str, requester: &Requester) {
    map.write().await.insert(key.to_string(), requester.clone());
}

async fn fetch(map: &Sessions, key: &str) -> Result<Requester> {
    map.read().await.get(key).cloned().ok_or(OAuthError::NotFound)
}

async fn remove(map: &Sessions, key: &str) {
    map.write().await.remove(key);
}

#[async_trait]
impl AuthorizeCodeStorage for MemoryStore {
    async fn create_authorize_code_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        put(&self.authorize_codes, signature, requester).await;
        Ok(())
    }

    async fn get_authorize_code_session(&self, signature: &str) -> Result<Requester> {
        fetch(&self.authorize_codes, signature).await
    }

    async fn delete_authorize_code_session(&self, signature: &str) -> Result<()> {
        remove(&self.authorize_codes, signature).await;
        Ok(())
    }
}

#[async_trait]
impl AccessTokenStorage for MemoryStore {
    async fn create_access_token_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        put(&self.access_tokens, signature, requester).await;
        Ok(())
    }

    async fn get_access_token_session(&self, signature: &str) -> Result<Requester> {
        fetch(&self.access_tokens, signature).await
    }

    async fn delete_access_token_session(&self, signature: &str) -> Result<()> {
        remove(&self.access_tokens, signature).await;
        remove(&self.implicit, signature).await;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryStore {
    async fn create_refresh_token_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        put(&self.refresh_tokens, signature, requester).await;
        Ok(())
    }

    async fn get_refresh_token_session(&self, signature: &str) -> Result<Requester> {
        fetch(&self.refresh_tokens, signature).await
    }

    async fn delete_refresh_token_session(&self, signature: &str) -> Result<()> {
        remove(&self.refresh_tokens, signature).await;
        Ok(())
    }
}

#[async_trait]
impl ImplicitGrantStorage for MemoryStore {
    async fn create_implicit_access_token_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        put(&self.implicit, signature, requester).await;
        put(&self.access_tokens, signature, requester).await;
        Ok(())
    }
}

#[async_trait]
impl OpenIdConnectRequestStorage for MemoryStore {
    async fn create_open_id_connect_session(&self, code_signature: &str, requester: &Requester) -> Result<()> {
        put(&self.id_sessions, code_signature, requester).await;
        Ok(())
    }

    async fn get_open_id_connect_session(&self, code_signature: &str) -> Result<Requester> {
        fetch(&self.id_sessions, code_signature).await
    }

    async fn delete_open_id_connect_session(&self, code_signature: &str) -> Result<()> {
        remove(&self.id_sessions, code_signature).await;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenGrantStorage for MemoryStore {
    async fn persist_refresh_token_grant_session(
        &self,
        original_refresh_signature: &str,
        access_signature: &str,
        refresh_signature: &str,
        requester: &Requester,
    ) -> Result<()> {
        let mut refresh = self.refresh_tokens.write().await;
        if refresh.remove(original_refresh_signature).is_none() {
            return Err(OAuthError::NotFound);
        }
        refresh.insert(refresh_signature.to_string(), requester.clone());
        drop(refresh);
        put(&self.access_tokens, access_signature, requester).await;
        Ok(())
    }
}

#[async_trait]
impl AuthorizeCodeGrantStorage for MemoryStore {
    async fn persist_authorize_code_grant_session(
        &self,
        code_signature: &str,
        access_signature: &str,
        refresh_signature: Option<&str>,
        requester: &Requester,
    ) -> Result<()> {
        if self.authorize_codes.write().await.remove(code_signature).is_none() {
            return Err(OAuthError::NotFound);
        }
        put(&self.access_tokens, access_signature, requester).await;
        if let Some(refresh_signature) = refresh_signature {
            put(&self.refresh_tokens, refresh_signature, requester).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceOwnerAuthenticator for MemoryStore {
    async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        match self.resource_owners.read().await.get(username) {
            Some(stored) if stored == password => Ok(()),
            _ => Err(OAuthError::NotFound),
        }
    }
}
