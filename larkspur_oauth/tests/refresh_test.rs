use std::sync::Arc;
use larkspur_oauth::{
    compose_all_enabled, AccessParams, AccessResponse, Arguments, AuthorizeParams, Client, ClientManager,
    MemoryClientManager, MemoryStore, OAuth2Provider, OAuthConfig, OAuthError, Pbkdf2Hasher, Session, SigningKeys,
};

fn client(id: &str) -> Client {
    let mut client = Client::new(id);
    client.secret = "foobar-secret".into();
    client.redirect_uris = vec!["https://app.local/callback".to_string()];
    client.grant_types = Arguments::from_space_delimited("authorization_code refresh_token");
    client.scopes = Arguments::from_space_delimited("fosite offline");
    client
}

async fn setup() -> (OAuth2Provider, Arc<MemoryStore>) {
    let config = OAuthConfig::builder()
        .system_secret("some-super-cool-secret-that-nobody-knows")
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new());
    let clients = Arc::new(MemoryClientManager::new(Arc::new(Pbkdf2Hasher::new(1))));
    clients.create_client(client("app")).await.unwrap();
    clients.create_client(client("other")).await.unwrap();
    let provider =
        compose_all_enabled(&config, store.clone(), clients, SigningKeys::generate_es256().unwrap()).unwrap();
    (provider, store)
}

async fn initial_tokens(provider: &OAuth2Provider) -> AccessResponse {
    let params = AuthorizeParams::new("app", "code").scope("fosite offline").state("some-random-state");
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    ar.grant_requested_scopes();
    let resp = provider.new_authorize_response(&mut ar, Session::new("peter")).await.unwrap();

    let params = AccessParams::new("app", "foobar-secret", "authorization_code").param("code", resp.query_value("code"));
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    provider.new_access_response(&mut request).await.unwrap()
}

async fn refresh(provider: &OAuth2Provider, client_id: &str, token: &str) -> Result<AccessResponse, OAuthError> {
    let params = AccessParams::new(client_id, "foobar-secret", "refresh_token").param("refresh_token", token);
    let mut request = provider.new_access_request(params, Session::default()).await?;
    provider.new_access_response(&mut request).await
}

fn signature(token: &str) -> &str {
    token.split_once('.').map(|(_, sig)| sig).unwrap()
}

#[tokio::test]
async fn rotation_issues_fresh_pair_and_burns_old_token() {
    let (provider, store) = setup().await;
    let first = initial_tokens(&provider).await;
    let first_refresh = first.extra("refresh_token").unwrap().to_string();

    let second = refresh(&provider, "app", &first_refresh).await.unwrap();
    let second_refresh = second.extra("refresh_token").unwrap().to_string();
    assert_ne!(signature(&second.access_token), signature(&first.access_token));
    assert_ne!(signature(&second_refresh), signature(&first_refresh));
    assert_eq!(second.scope, "fosite offline");
    assert_eq!(store.refresh_token_count().await, 1);

    let replay = refresh(&provider, "app", &first_refresh).await;
    assert!(matches!(replay, Err(OAuthError::InvalidRequest(_))));

    let third = refresh(&provider, "app", &second_refresh).await.unwrap();
    let third_refresh = third.extra("refresh_token").unwrap();
    for earlier in [&first_refresh, &second_refresh] {
        assert_ne!(signature(third_refresh), signature(earlier));
    }

    let requester = provider.introspect_token(&third.access_token, &["fosite"]).await.unwrap();
    assert_eq!(requester.session.subject, "peter");
}

#[tokio::test]
async fn refresh_token_of_another_client_is_rejected() {
    let (provider, _) = setup().await;
    let first = initial_tokens(&provider).await;
    let stolen = first.extra("refresh_token").unwrap();
    match refresh(&provider, "other", stolen).await {
        Err(OAuthError::InvalidRequest(reason)) => assert!(reason.contains("Client ID mismatch")),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(refresh(&provider, "app", stolen).await.is_ok());
}

#[tokio::test]
async fn tampered_refresh_token_is_rejected() {
    let (provider, _) = setup().await;
    let first = initial_tokens(&provider).await;
    let token = first.extra("refresh_token").unwrap();
    let (_, sig) = token.split_once('.').unwrap();
    let forged = format!("Zm9yZ2VkLWtleQ.{}", sig);
    assert!(matches!(refresh(&provider, "app", &forged).await, Err(OAuthError::InvalidRequest(_))));
    assert!(matches!(refresh(&provider, "app", "garbage").await, Err(OAuthError::InvalidRequest(_))));
}

#[tokio::test]
async fn client_without_refresh_grant_is_rejected() {
    let config = OAuthConfig::builder()
        .system_secret("some-super-cool-secret-that-nobody-knows")
        .build()
        .unwrap();
    let clients = Arc::new(MemoryClientManager::new(Arc::new(Pbkdf2Hasher::new(1))));
    let mut limited = client("limited");
    limited.grant_types = Arguments::from_space_delimited("authorization_code");
    clients.create_client(limited).await.unwrap();
    let provider = compose_all_enabled(
        &config,
        Arc::new(MemoryStore::new()),
        clients,
        SigningKeys::generate_es256().unwrap(),
    )
    .unwrap();
    assert!(matches!(refresh(&provider, "limited", "a.b").await, Err(OAuthError::InvalidGrant(_))));
}
