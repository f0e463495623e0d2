use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::hash::{Hasher, Pbkdf2Hasher};
use crate::oauth_core::types::Client;
use super::{prepare_new_client, prepare_update, ClientManager};

/// Client directory held entirely in memory.
#[derive(Clone)]
pub struct MemoryClientManager {
    clients: Arc<RwLock<HashMap<String, Client>>>,
    hasher: Arc<dyn Hasher>,
}

impl Default for MemoryClientManager {
    fn default() -> Self {
        Self::new(Arc::new(Pbkdf2Hasher::default()))
    }
}

impl MemoryClientManager {
    pub fn new(hasher: Arc<dyn Hasher>) -> Self {
        Self { clients: Arc::new(RwLock::new(HashMap::new())), hasher }
    }
}

#[async_trait]
impl ClientManager for MemoryClientManager {
    #[instrument(skip(self, client), level = "debug")]
    async fn create_client(&self, client: Client) -> Result<Client> {
        let (stored, echoed) = prepare_new_client(client, self.hasher.as_ref())?;
        let mut clients = self.clients.write().await;
        if clients.contains_key(&stored.id) {
            return Err(OAuthError::InvalidRequest(format!("A client with id {} already exists", stored.id)));
        }
        debug!(client_id = %stored.id, "client created");
        clients.insert(stored.id.clone(), stored);
        Ok(echoed)
    }

    async fn update_client(&self, client: Client) -> Result<()> {
        let stored = self.clients.read().await.get(&client.id).cloned().ok_or(OAuthError::NotFound)?;
        let updated = prepare_update(client, &stored, self.hasher.as_ref())?;
        // Hashing happens outside the lock, so the client may be gone by now.
        let mut clients = self.clients.write().await;
        if !clients.contains_key(&updated.id) {
            return Err(OAuthError::NotFound);
        }
        clients.insert(updated.id.clone(), updated);
        Ok(())
    }

    async fn get_client(&self, id: &str) -> Result<Client> {
        self.clients.read().await.get(id).map(Client::sanitized).ok_or(OAuthError::NotFound)
    }

    async fn get_clients(&self) -> Result<HashMap<String, Client>> {
        let clients = self.clients.read().await;
        Ok(clients.iter().map(|(id, c)| (id.clone(), c.sanitized())).collect())
    }

    async fn delete_client(&self, id: &str) -> Result<()> {
        self.clients.write().await.remove(id);
        Ok(())
    }

    async fn authenticate(&self, id: &str, secret: &str) -> Result<Client> {
        let stored = self.clients.read().await.get(id).cloned().ok_or(OAuthError::NotFound)?;
        self.hasher.compare(&stored.secret, secret.as_bytes())?;
        Ok(stored.sanitized())
    }
}
