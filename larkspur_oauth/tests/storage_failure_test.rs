use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use larkspur_oauth::oauth_core::storage::{
    AccessTokenStorage, AuthorizeCodeGrantStorage, AuthorizeCodeStorage, ImplicitGrantStorage,
    OpenIdConnectRequestStorage, RefreshTokenGrantStorage, RefreshTokenStorage,
};
use larkspur_oauth::{
    compose_all_enabled, AccessParams, Arguments, AuthorizeParams, Client, ClientManager, MemoryClientManager,
    MemoryStore, OAuth2Provider, OAuthConfig, OAuthError, Pbkdf2Hasher, Requester, Result, Session, SigningKeys,
};

/// Memory store whose writes fail while `down` is set. Reads keep working.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn write(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(OAuthError::RequestForbidden);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizeCodeStorage for FlakyStore {
    async fn create_authorize_code_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        self.write()?;
        self.inner.create_authorize_code_session(signature, requester).await
    }

    async fn get_authorize_code_session(&self, signature: &str) -> Result<Requester> {
        self.inner.get_authorize_code_session(signature).await
    }

    async fn delete_authorize_code_session(&self, signature: &str) -> Result<()> {
        self.write()?;
        self.inner.delete_authorize_code_session(signature).await
    }
}

#[async_trait]
impl AccessTokenStorage for FlakyStore {
    async fn create_access_token_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        self.write()?;
        self.inner.create_access_token_session(signature, requester).await
    }

    async fn get_access_token_session(&self, signature: &str) -> Result<Requester> {
        self.inner.get_access_token_session(signature).await
    }

    async fn delete_access_token_session(&self, signature: &str) -> Result<()> {
        self.write()?;
        self.inner.delete_access_token_session(signature).await
    }
}

#[async_trait]
impl RefreshTokenStorage for FlakyStore {
    async fn create_refresh_token_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        self.write()?;
        self.inner.create_refresh_token_session(signature, requester).await
    }

    async fn get_refresh_token_session(&self, signature: &str) -> Result<Requester> {
        self.inner.get_refresh_token_session(signature).await
    }

    async fn delete_refresh_token_session(&self, signature: &str) -> Result<()> {
        self.write()?;
        self.inner.delete_refresh_token_session(signature).await
    }
}

#[async_trait]
impl ImplicitGrantStorage for FlakyStore {
    async fn create_implicit_access_token_session(&self, signature: &str, requester: &Requester) -> Result<()> {
        self.write()?;
        self.inner.create_implicit_access_token_session(signature, requester).await
    }
}

#[async_trait]
impl OpenIdConnectRequestStorage for FlakyStore {
    async fn create_open_id_connect_session(&self, code_signature: &str, requester: &Requester) -> Result<()> {
        self.write()?;
        self.inner.create_open_id_connect_session(code_signature, requester).await
    }

    async fn get_open_id_connect_session(&self, code_signature: &str) -> Result<Requester> {
        self.inner.get_open_id_connect_session(code_signature).await
    }

    async fn delete_open_id_connect_session(&self, code_signature: &str) -> Result<()> {
        self.write()?;
        self.inner.delete_open_id_connect_session(code_signature).await
    }
}

#[async_trait]
impl RefreshTokenGrantStorage for FlakyStore {
    async fn persist_refresh_token_grant_session(
        &self,
        original_refresh_signature: &str,
        access_signature: &str,
        refresh_signature: &str,
        requester: &Requester,
    ) -> Result<()> {
        self.write()?;
        self.inner
            .persist_refresh_token_grant_session(original_refresh_signature, access_signature, refresh_signature, requester)
            .await
    }
}

#[async_trait]
impl AuthorizeCodeGrantStorage for FlakyStore {
    async fn persist_authorize_code_grant_session(
        &self,
        code_signature: &str,
        access_signature: &str,
        refresh_signature: Option<&str>,
        requester: &Requester,
    ) -> Result<()> {
        self.write()?;
        self.inner
            .persist_authorize_code_grant_session(code_signature, access_signature, refresh_signature, requester)
            .await
    }
}

async fn setup() -> (OAuth2Provider, Arc<FlakyStore>) {
    let config = OAuthConfig::builder()
        .system_secret("some-super-cool-secret-that-nobody-knows")
        .build()
        .unwrap();
    let store = Arc::new(FlakyStore::default());
    let clients = Arc::new(MemoryClientManager::new(Arc::new(Pbkdf2Hasher::new(1))));

    let mut client = Client::new("app");
    client.secret = "foobar-secret".into();
    client.redirect_uris = vec!["https://app.local/callback".to_string()];
    client.grant_types = Arguments::from_space_delimited("authorization_code refresh_token client_credentials");
    client.scopes = Arguments::from_space_delimited("fosite offline");
    clients.create_client(client).await.unwrap();

    let provider =
        compose_all_enabled(&config, store.clone(), clients, SigningKeys::generate_es256().unwrap()).unwrap();
    (provider, store)
}

async fn refresh_token(provider: &OAuth2Provider) -> String {
    let params = AuthorizeParams::new("app", "code").scope("fosite offline").state("some-random-state");
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    ar.grant_requested_scopes();
    let resp = provider.new_authorize_response(&mut ar, Session::new("peter")).await.unwrap();

    let params = AccessParams::new("app", "foobar-secret", "authorization_code").param("code", resp.query_value("code"));
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    let response = provider.new_access_response(&mut request).await.unwrap();
    response.extra("refresh_token").unwrap().to_string()
}

#[tokio::test]
async fn client_credentials_write_failure_is_server_error() {
    let (provider, store) = setup().await;
    store.down.store(true, Ordering::SeqCst);

    let params = AccessParams::new("app", "foobar-secret", "client_credentials").scope("fosite");
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    assert!(matches!(provider.new_access_response(&mut request).await, Err(OAuthError::ServerError(_))));
}

#[tokio::test]
async fn refresh_write_failure_is_server_error_and_keeps_token() {
    let (provider, store) = setup().await;
    let token = refresh_token(&provider).await;
    store.down.store(true, Ordering::SeqCst);

    let params = AccessParams::new("app", "foobar-secret", "refresh_token").param("refresh_token", &token);
    let mut request = provider.new_access_request(params.clone(), Session::default()).await.unwrap();
    assert!(matches!(provider.new_access_response(&mut request).await, Err(OAuthError::ServerError(_))));

    store.down.store(false, Ordering::SeqCst);
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    let response = provider.new_access_response(&mut request).await.unwrap();
    assert!(response.extra("refresh_token").is_some());
}

#[tokio::test]
async fn code_exchange_write_failure_is_server_error() {
    let (provider, store) = setup().await;
    let params = AuthorizeParams::new("app", "code").scope("fosite").state("some-random-state");
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    ar.grant_requested_scopes();
    let resp = provider.new_authorize_response(&mut ar, Session::new("peter")).await.unwrap();
    store.down.store(true, Ordering::SeqCst);

    let params = AccessParams::new("app", "foobar-secret", "authorization_code").param("code", resp.query_value("code"));
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    assert!(matches!(provider.new_access_response(&mut request).await, Err(OAuthError::ServerError(_))));
}
