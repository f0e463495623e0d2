use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Duration;
use larkspur_oauth::oauth_core::handler::{
    HandleHelper, HandlerOutcome, ResourceOwnerPasswordCredentialsGrantHandler, TokenEndpointHandler,
};
use larkspur_oauth::oauth_core::scope::hierarchic_scope_strategy;
use larkspur_oauth::oauth_core::strategy::HmacSha256Strategy;
use larkspur_oauth::{
    compose_all_enabled, AccessParams, AccessRequest, Arguments, Client, ClientManager, DirectoryResourceOwners,
    MemoryClientManager, MemoryStore, OAuthConfig, OAuthError, Pbkdf2Hasher, Requester, Result, Session,
    SigningKeys,
};

/// Directory answering `authenticate` with a fixed result.
struct FixedDirectory {
    answer: Result<()>,
}

#[async_trait]
impl ClientManager for FixedDirectory {
    async fn create_client(&self, client: Client) -> Result<Client> {
        Ok(client)
    }

    async fn update_client(&self, _client: Client) -> Result<()> {
        Ok(())
    }

    async fn get_client(&self, _id: &str) -> Result<Client> {
        Err(OAuthError::NotFound)
    }

    async fn get_clients(&self) -> Result<HashMap<String, Client>> {
        Ok(HashMap::new())
    }

    async fn delete_client(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn authenticate(&self, id: &str, _secret: &str) -> Result<Client> {
        self.answer.clone().map(|_| Client::new(id))
    }
}

fn handler(answer: Result<()>) -> ResourceOwnerPasswordCredentialsGrantHandler {
    let strategy = HmacSha256Strategy::new(
        b"some-super-cool-secret-that-nobody-knows",
        Duration::hours(1),
        Duration::days(30),
        Duration::minutes(10),
    )
    .unwrap();
    ResourceOwnerPasswordCredentialsGrantHandler {
        authenticator: Arc::new(DirectoryResourceOwners::new(Arc::new(FixedDirectory { answer }))),
        helper: HandleHelper {
            access_token_strategy: Arc::new(strategy),
            access_token_storage: Arc::new(MemoryStore::new()),
            access_token_lifespan: Duration::hours(1),
        },
        scope_strategy: hierarchic_scope_strategy,
    }
}

fn password_request() -> AccessRequest {
    let mut client = Client::new("app");
    client.grant_types = Arguments::from_space_delimited("password");
    let mut requester = Requester::new(client);
    requester.form.insert("username".into(), "peter".into());
    requester.form.insert("password".into(), "secret".into());
    AccessRequest::new(requester, Arguments::from_space_delimited("password"))
}

#[tokio::test]
async fn unknown_owner_is_invalid_request() {
    let mut request = password_request();
    let result = handler(Err(OAuthError::NotFound)).handle_token_endpoint_request(&mut request).await;
    assert!(matches!(result, Err(OAuthError::InvalidRequest(_))));
}

#[tokio::test]
async fn wrong_password_is_invalid_request() {
    let mut request = password_request();
    let result = handler(Err(OAuthError::InvalidClient)).handle_token_endpoint_request(&mut request).await;
    assert!(matches!(result, Err(OAuthError::InvalidRequest(_))));
}

#[tokio::test]
async fn directory_failure_is_server_error() {
    let mut request = password_request();
    let result = handler(Err(OAuthError::ServerError("connection reset".into())))
        .handle_token_endpoint_request(&mut request)
        .await;
    assert!(matches!(result, Err(OAuthError::ServerError(_))));
}

#[tokio::test]
async fn valid_credentials_are_handled() {
    let mut request = password_request();
    let result = handler(Ok(())).handle_token_endpoint_request(&mut request).await;
    assert_eq!(result, Ok(HandlerOutcome::Handled));
    assert_eq!(request.session.subject, "peter");
}

#[tokio::test]
async fn password_grant_through_provider() {
    let config = OAuthConfig::builder()
        .system_secret("some-super-cool-secret-that-nobody-knows")
        .build()
        .unwrap();
    let clients = Arc::new(MemoryClientManager::new(Arc::new(Pbkdf2Hasher::new(1))));
    let mut app = Client::new("app");
    app.secret = "foobar-secret".into();
    app.grant_types = Arguments::from_space_delimited("password");
    app.scopes = Arguments::from_space_delimited("fosite");
    clients.create_client(app).await.unwrap();
    let mut owner = Client::new("peter");
    owner.secret = "peters-secret".into();
    clients.create_client(owner).await.unwrap();

    let provider = compose_all_enabled(
        &config,
        Arc::new(MemoryStore::new()),
        clients,
        SigningKeys::generate_es256().unwrap(),
    )
    .unwrap();

    let params = AccessParams::new("app", "foobar-secret", "password")
        .param("username", "peter")
        .param("password", "peters-secret");
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    request.grant_scope("fosite");
    let response = provider.new_access_response(&mut request).await.unwrap();
    assert_eq!(response.scope, "fosite");
    assert!(response.extra("refresh_token").is_none());

    let requester = provider.introspect_token(&response.access_token, &["fosite"]).await.unwrap();
    assert_eq!(requester.session.subject, "peter");

    let params = AccessParams::new("app", "foobar-secret", "password")
        .scope("admin")
        .param("username", "peter")
        .param("password", "peters-secret");
    assert!(matches!(
        provider.new_access_request(params, Session::default()).await,
        Err(OAuthError::InvalidScope(_))
    ));

    let params = AccessParams::new("app", "foobar-secret", "password")
        .param("username", "peter")
        .param("password", "wrong");
    assert!(matches!(
        provider.new_access_request(params, Session::default()).await,
        Err(OAuthError::InvalidRequest(_))
    ));
}
