//! Client directory: registration, lookup and authentication of OAuth2
//! clients.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use uuid::Uuid;
use larkspur_lib::{random_sequence, SECRET_ALPHABET};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::hash::Hasher;
use crate::oauth_core::storage::ResourceOwnerAuthenticator;
use crate::oauth_core::types::Client;

pub mod memory;
pub mod replicated;

pub use memory::MemoryClientManager;
pub use replicated::{ClientBackend, ClientChange, InMemoryClientBackend, ReplicatedClientManager, SyncMode};

/// Length of generated client secrets.
pub const GENERATED_SECRET_LEN: usize = 12;
/// Shortest secret accepted from callers.
pub const MIN_SECRET_LEN: usize = 6;

#[async_trait]
pub trait ClientManager: Send + Sync + 'static {
    /// Registers a client. The returned client carries the plaintext secret,
    /// the only time it is ever handed out.
    async fn create_client(&self, client: Client) -> Result<Client>;

    /// Replaces a client. An empty secret keeps the stored hash.
    async fn update_client(&self, client: Client) -> Result<()>;

    /// Client without its secret.
    async fn get_client(&self, id: &str) -> Result<Client>;

    /// All clients, without secrets.
    async fn get_clients(&self) -> Result<HashMap<String, Client>>;

    async fn delete_client(&self, id: &str) -> Result<()>;

    /// `NotFound` for unknown ids, `InvalidClient` for wrong secrets.
    async fn authenticate(&self, id: &str, secret: &str) -> Result<Client>;
}

/// Assigns an id and secret where missing and hashes the secret.
///
/// Returns `(stored, echoed)`: the record to persist and the one to return to
/// the caller, which still holds the plaintext secret.
pub(crate) fn prepare_new_client(mut client: Client, hasher: &dyn Hasher) -> Result<(Client, Client)> {
    if client.id.is_empty() {
        client.id = Uuid::new_v4().to_string();
    }
    if client.secret.is_empty() {
        client.secret = random_sequence(GENERATED_SECRET_LEN, SECRET_ALPHABET)
            .ok_or_else(|| OAuthError::ServerError("could not generate a client secret".into()))?;
    } else if client.secret.chars().count() < MIN_SECRET_LEN {
        return Err(OAuthError::InvalidRequest(format!(
            "The client secret must be at least {} characters long",
            MIN_SECRET_LEN
        )));
    }

    let echoed = client.clone();
    client.secret = hasher.hash(client.secret.as_bytes())?;
    Ok((client, echoed))
}

/// Hashes a newly supplied secret, or takes over the stored hash.
pub(crate) fn prepare_update(mut client: Client, stored: &Client, hasher: &dyn Hasher) -> Result<Client> {
    if client.secret.is_empty() {
        client.secret = stored.secret.clone();
    } else if client.secret.chars().count() < MIN_SECRET_LEN {
        return Err(OAuthError::InvalidRequest(format!(
            "The client secret must be at least {} characters long",
            MIN_SECRET_LEN
        )));
    } else {
        client.secret = hasher.hash(client.secret.as_bytes())?;
    }
    Ok(client)
}

/// Uses the client directory as the credential store of the password grant.
/// Unknown ids and wrong secrets both read as `NotFound`.
#[derive(Clone)]
pub struct DirectoryResourceOwners {
    directory: Arc<dyn ClientManager>,
}

impl DirectoryResourceOwners {
    pub fn new(directory: Arc<dyn ClientManager>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ResourceOwnerAuthenticator for DirectoryResourceOwners {
    async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        match self.directory.authenticate(username, password).await {
            Ok(_) => Ok(()),
            Err(OAuthError::NotFound) | Err(OAuthError::InvalidClient) => Err(OAuthError::NotFound),
            Err(e) => Err(e),
        }
    }
}
