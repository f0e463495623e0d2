//! Client directory replicated from a backing store.
//!
//! Reads are served from a local cache. Writes are published to the backend;
//! the cache follows either right after the publish (`SyncMode::Direct`) or
//! when the backend's change feed reports the write (`SyncMode::ChangeFeed`).
//! The cache lock is only held for the map mutation, never across I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use crate::oauth_core::config::OAuthConfig;
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::hash::Hasher;
use crate::oauth_core::types::Client;
use super::{prepare_new_client, prepare_update, ClientManager};

/// One entry of a change feed. `old_val` is absent for inserts, `new_val` for
/// deletes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientChange {
    pub old_val: Option<Client>,
    pub new_val: Option<Client>,
}

/// Durable store behind a replicated directory.
#[async_trait]
pub trait ClientBackend: Send + Sync + 'static {
    async fn load_all(&self) -> Result<Vec<Client>>;

    async fn publish_create(&self, client: &Client) -> Result<()>;

    async fn publish_update(&self, client: &Client) -> Result<()>;

    async fn publish_delete(&self, id: &str) -> Result<()>;

    /// Opens a feed of changes made from now on.
    async fn changes(&self) -> Result<BoxStream<'static, Result<ClientChange>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Apply writes to the cache once the backend accepted them.
    Direct,
    /// Leave the cache to the change feed started by `watch`.
    ChangeFeed,
}

type Cache = Arc<RwLock<HashMap<String, Client>>>;

pub struct ReplicatedClientManager<B> {
    backend: Arc<B>,
    cache: Cache,
    hasher: Arc<dyn Hasher>,
    mode: SyncMode,
}

impl<B> Clone for ReplicatedClientManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            cache: self.cache.clone(),
            hasher: self.hasher.clone(),
            mode: self.mode,
        }
    }
}

/// Merges one change into the cache.
fn merge_change(clients: &mut HashMap<String, Client>, change: ClientChange) {
    match (change.old_val, change.new_val) {
        (Some(old), None) => {
            clients.remove(&old.id);
        }
        (Some(old), Some(new)) => {
            clients.remove(&old.id);
            clients.insert(new.id.clone(), new);
        }
        (None, Some(new)) => {
            clients.insert(new.id.clone(), new);
        }
        (None, None) => {}
    }
}

impl<B: ClientBackend> ReplicatedClientManager<B> {
    pub fn new(backend: Arc<B>, hasher: Arc<dyn Hasher>, mode: SyncMode) -> Self {
        Self { backend, cache: Arc::new(RwLock::new(HashMap::new())), hasher, mode }
    }

    /// Fills the cache from the backend, replacing its contents.
    pub async fn cold_start(&self) -> Result<()> {
        let loaded = self.backend.load_all().await?;
        let fresh: HashMap<String, Client> = loaded.into_iter().map(|c| (c.id.clone(), c)).collect();
        info!(clients = fresh.len(), "client cache loaded");
        *self.cache.write().await = fresh;
        Ok(())
    }

    /// Follows the backend's change feed in a background task.
    ///
    /// Failures to subscribe or a broken feed are logged and retried after a
    /// delay that doubles from `initial` up to `max`. The task runs until it is
    /// aborted or the runtime shuts down.
    pub fn watch(&self, initial: Duration, max: Duration) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let cache = self.cache.clone();
        tokio::spawn(async move {
            let mut delay = initial;
            loop {
                match backend.changes().await {
                    Ok(mut feed) => {
                        delay = initial;
                        while let Some(change) = feed.next().await {
                            match change {
                                Ok(change) => {
                                    debug!("received client change");
                                    let mut clients = cache.write().await;
                                    merge_change(&mut clients, change);
                                }
                                Err(e) => {
                                    warn!(error = %e, "client change feed failed");
                                    break;
                                }
                            }
                        }
                        warn!("client change feed ended, resubscribing");
                    }
                    Err(e) => error!(error = %e, "could not subscribe to client change feed"),
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max);
            }
        })
    }

    /// `watch` with the configured feed backoff.
    pub fn watch_configured(&self, config: &OAuthConfig) -> JoinHandle<()> {
        let (initial, max) = config.feed_backoff();
        self.watch(initial, max)
    }

    async fn apply(&self, change: ClientChange) {
        if self.mode == SyncMode::Direct {
            let mut clients = self.cache.write().await;
            merge_change(&mut clients, change);
        }
    }
}

#[async_trait]
impl<B: ClientBackend> ClientManager for ReplicatedClientManager<B> {
    #[instrument(skip(self, client), level = "debug")]
    async fn create_client(&self, client: Client) -> Result<Client> {
        let (stored, echoed) = prepare_new_client(client, self.hasher.as_ref())?;
        self.backend.publish_create(&stored).await?;
        self.apply(ClientChange { old_val: None, new_val: Some(stored) }).await;
        Ok(echoed)
    }

    async fn update_client(&self, client: Client) -> Result<()> {
        let stored = self.cache.read().await.get(&client.id).cloned().ok_or(OAuthError::NotFound)?;
        let updated = prepare_update(client, &stored, self.hasher.as_ref())?;
        self.backend.publish_update(&updated).await?;
        if self.mode == SyncMode::Direct {
            let mut clients = self.cache.write().await;
            // A delete that landed meanwhile wins.
            if clients.contains_key(&stored.id) {
                merge_change(&mut clients, ClientChange { old_val: Some(stored), new_val: Some(updated) });
            }
        }
        Ok(())
    }

    async fn get_client(&self, id: &str) -> Result<Client> {
        self.cache.read().await.get(id).map(Client::sanitized).ok_or(OAuthError::NotFound)
    }

    async fn get_clients(&self) -> Result<HashMap<String, Client>> {
        let clients = self.cache.read().await;
        Ok(clients.iter().map(|(id, c)| (id.clone(), c.sanitized())).collect())
    }

    async fn delete_client(&self, id: &str) -> Result<()> {
        self.backend.publish_delete(id).await?;
        self.apply(ClientChange { old_val: Some(Client::new(id)), new_val: None }).await;
        Ok(())
    }

    async fn authenticate(&self, id: &str, secret: &str) -> Result<Client> {
        let stored = self.cache.read().await.get(id).cloned().ok_or(OAuthError::NotFound)?;
        self.hasher.compare(&stored.secret, secret.as_bytes())?;
        Ok(stored.sanitized())
    }
}

/// Backend keeping rows in memory and announcing writes on a broadcast
/// channel.
pub struct InMemoryClientBackend {
    rows: RwLock<HashMap<String, Client>>,
    feed: broadcast::Sender<ClientChange>,
}

impl Default for InMemoryClientBackend {
    fn default() -> Self {
        Self::new(64)
    }
}

impl InMemoryClientBackend {
    pub fn new(feed_capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity);
        Self { rows: RwLock::new(HashMap::new()), feed }
    }

    /// Number of open change feeds.
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }

    fn announce(&self, change: ClientChange) {
        // No open feed is not an error.
        let _ = self.feed.send(change);
    }
}

#[async_trait]
impl ClientBackend for InMemoryClientBackend {
    async fn load_all(&self) -> Result<Vec<Client>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn publish_create(&self, client: &Client) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&client.id) {
            return Err(OAuthError::InvalidRequest(format!("A client with id {} already exists", client.id)));
        }
        rows.insert(client.id.clone(), client.clone());
        drop(rows);
        self.announce(ClientChange { old_val: None, new_val: Some(client.clone()) });
        Ok(())
    }

    async fn publish_update(&self, client: &Client) -> Result<()> {
        let mut rows = self.rows.write().await;
        let old = rows.get_mut(&client.id).ok_or(OAuthError::NotFound)?;
        let old = std::mem::replace(old, client.clone());
        drop(rows);
        self.announce(ClientChange { old_val: Some(old), new_val: Some(client.clone()) });
        Ok(())
    }

    async fn publish_delete(&self, id: &str) -> Result<()> {
        if let Some(old) = self.rows.write().await.remove(id) {
            self.announce(ClientChange { old_val: Some(old), new_val: None });
        }
        Ok(())
    }

    async fn changes(&self) -> Result<BoxStream<'static, Result<ClientChange>>> {
        let receiver = self.feed.subscribe();
        let feed = stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(change) => Some((Ok(change), receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => Some((
                    Err(OAuthError::ServerError(format!("client change feed lagged by {} events", skipped))),
                    receiver,
                )),
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });
        Ok(feed.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str, name: &str) -> Client {
        let mut c = Client::new(id);
        c.name = name.into();
        c
    }

    #[test]
    fn merge_rules() {
        let mut clients = HashMap::new();
        merge_change(&mut clients, ClientChange { old_val: None, new_val: Some(client("a", "first")) });
        assert_eq!(clients["a"].name, "first");

        merge_change(&mut clients, ClientChange { old_val: None, new_val: Some(client("a", "second")) });
        assert_eq!(clients["a"].name, "second");

        merge_change(
            &mut clients,
            ClientChange { old_val: Some(client("a", "second")), new_val: Some(client("b", "renamed")) },
        );
        assert!(!clients.contains_key("a"));
        assert_eq!(clients["b"].name, "renamed");

        merge_change(&mut clients, ClientChange { old_val: Some(client("b", "")), new_val: None });
        assert!(clients.is_empty());
    }
}
