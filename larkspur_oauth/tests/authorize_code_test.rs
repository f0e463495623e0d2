use std::sync::Arc;
use larkspur_oauth::oauth_core::crypto::left_half_hash;
use larkspur_oauth::{
    compose_all_enabled, AccessParams, Arguments, AuthorizeParams, Client, ClientManager, MemoryClientManager,
    MemoryStore, OAuth2Provider, OAuthConfig, OAuthError, Pbkdf2Hasher, Session, SigningKeys,
};

const REDIRECT: &str = "https://app.local/callback";
const STATE: &str = "some-random-state";

async fn setup() -> (OAuth2Provider, Arc<MemoryStore>, SigningKeys) {
    let config = OAuthConfig::builder()
        .issuer("https://larkspur.local")
        .system_secret("some-super-cool-secret-that-nobody-knows")
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new());
    let clients = Arc::new(MemoryClientManager::new(Arc::new(Pbkdf2Hasher::new(1))));

    let mut client = Client::new("app");
    client.secret = "foobar-secret".into();
    client.redirect_uris = vec![REDIRECT.to_string()];
    client.grant_types = Arguments::from_space_delimited("authorization_code refresh_token");
    client.response_types = Arguments::from_space_delimited("code");
    client.scopes = Arguments::from_space_delimited("fosite openid offline");
    clients.create_client(client).await.unwrap();

    let keys = SigningKeys::generate_es256().unwrap();
    let provider = compose_all_enabled(&config, store.clone(), clients, keys.clone()).unwrap();
    (provider, store, keys)
}

async fn authorize(provider: &OAuth2Provider, scope: &str) -> String {
    let params = AuthorizeParams::new("app", "code")
        .redirect_uri(REDIRECT)
        .scope(scope)
        .state(STATE)
        .param("nonce", "some-long-nonce-value");
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    ar.grant_requested_scopes();
    let mut session = Session::new("peter");
    session.id_token_claims.add("email", "peter@larkspur.local");
    let resp = provider.new_authorize_response(&mut ar, session).await.unwrap();
    assert_eq!(resp.query_value("state"), STATE);
    assert!(resp.fragment().is_empty());
    resp.query_value("code").to_string()
}

fn exchange_params(code: &str) -> AccessParams {
    AccessParams::new("app", "foobar-secret", "authorization_code")
        .param("code", code)
        .param("redirect_uri", REDIRECT)
}

#[tokio::test]
async fn code_exchange_issues_tokens_once() {
    let (provider, store, keys) = setup().await;
    let code = authorize(&provider, "fosite openid offline").await;
    assert!(!code.is_empty());

    let mut request = provider.new_access_request(exchange_params(&code), Session::default()).await.unwrap();
    let response = provider.new_access_response(&mut request).await.unwrap();
    assert!(!response.access_token.is_empty());
    assert_eq!(response.token_type, "bearer");
    assert_eq!(response.expires_in, Some(3600));
    assert_eq!(response.scope, "fosite openid offline");
    assert!(response.extra("refresh_token").is_some());
    assert_eq!(store.access_token_count().await, 1);
    assert_eq!(store.refresh_token_count().await, 1);

    let id_token = response.extra("id_token").unwrap();
    let claims = keys.verify_id_token(id_token, "app").unwrap();
    assert_eq!(claims.subject, "peter");
    assert_eq!(claims.nonce, "some-long-nonce-value");
    assert_eq!(claims.issuer, "https://larkspur.local");
    assert_eq!(claims.extra["email"], "peter@larkspur.local");
    assert_eq!(claims.access_token_hash, left_half_hash(keys.algorithm(), response.access_token.as_bytes()));

    let reused = provider.new_access_request(exchange_params(&code), Session::default()).await;
    assert!(matches!(reused, Err(OAuthError::InvalidRequest(_))));
}

#[tokio::test]
async fn rejected_id_token_leaves_code_unused() {
    let (provider, store, _) = setup().await;
    let params = AuthorizeParams::new("app", "code")
        .redirect_uri(REDIRECT)
        .scope("fosite openid offline")
        .state(STATE);
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    ar.grant_requested_scopes();
    let resp = provider.new_authorize_response(&mut ar, Session::new("peter")).await.unwrap();
    let code = resp.query_value("code").to_string();

    for _ in 0..2 {
        let mut request = provider.new_access_request(exchange_params(&code), Session::default()).await.unwrap();
        assert_eq!(provider.new_access_response(&mut request).await.err(), Some(OAuthError::InsufficientEntropy));
        assert_eq!(store.access_token_count().await, 0);
        assert_eq!(store.refresh_token_count().await, 0);
    }
}

#[tokio::test]
async fn offline_scope_controls_refresh_token() {
    let (provider, _, _) = setup().await;
    let code = authorize(&provider, "fosite").await;
    let mut request = provider.new_access_request(exchange_params(&code), Session::default()).await.unwrap();
    let response = provider.new_access_response(&mut request).await.unwrap();
    assert!(response.extra("refresh_token").is_none());
    assert!(response.extra("id_token").is_none());
}

#[tokio::test]
async fn redirect_uri_must_match_at_exchange() {
    let (provider, _, _) = setup().await;
    let code = authorize(&provider, "fosite").await;
    let params = AccessParams::new("app", "foobar-secret", "authorization_code")
        .param("code", code)
        .param("redirect_uri", "https://evil.local/callback");
    assert!(matches!(
        provider.new_access_request(params, Session::default()).await,
        Err(OAuthError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn authorize_request_validation() {
    let (provider, _, _) = setup().await;

    let unknown = AuthorizeParams::new("nobody", "code").state(STATE);
    assert_eq!(provider.new_authorize_request(unknown).await.err(), Some(OAuthError::InvalidClient));

    let short_state = AuthorizeParams::new("app", "code").state("abc");
    assert_eq!(provider.new_authorize_request(short_state).await.err(), Some(OAuthError::InsufficientEntropy));

    let bad_redirect = AuthorizeParams::new("app", "code").redirect_uri("https://evil.local").state(STATE);
    assert!(matches!(provider.new_authorize_request(bad_redirect).await, Err(OAuthError::InvalidRequest(_))));

    let implied_redirect = AuthorizeParams::new("app", "code").state(STATE);
    let ar = provider.new_authorize_request(implied_redirect).await.unwrap();
    assert_eq!(ar.redirect_uri, REDIRECT);
}

#[tokio::test]
async fn scope_and_response_type_checks() {
    let (provider, _, _) = setup().await;

    let params = AuthorizeParams::new("app", "code").scope("admin").state(STATE);
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    assert!(matches!(
        provider.new_authorize_response(&mut ar, Session::new("peter")).await,
        Err(OAuthError::InvalidScope(_))
    ));

    let params = AuthorizeParams::new("app", "token").scope("fosite").state(STATE);
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    assert!(matches!(
        provider.new_authorize_response(&mut ar, Session::new("peter")).await,
        Err(OAuthError::InvalidGrant(_))
    ));

    let params = AuthorizeParams::new("app", "device_code").state(STATE);
    let mut ar = provider.new_authorize_request(params).await.unwrap();
    assert_eq!(
        provider.new_authorize_response(&mut ar, Session::new("peter")).await.err(),
        Some(OAuthError::UnsupportedResponseType)
    );
}

#[tokio::test]
async fn token_endpoint_rejections() {
    let (provider, _, _) = setup().await;

    let wrong_secret = AccessParams::new("app", "wrong-secret", "authorization_code");
    assert_eq!(
        provider.new_access_request(wrong_secret, Session::default()).await.err(),
        Some(OAuthError::InvalidClient)
    );

    let unknown_grant = AccessParams::new("app", "foobar-secret", "urn:ietf:params:oauth:grant-type:device_code");
    assert_eq!(
        provider.new_access_request(unknown_grant, Session::default()).await.err(),
        Some(OAuthError::UnsupportedGrantType)
    );

    let not_allowed = AccessParams::new("app", "foobar-secret", "client_credentials");
    assert!(matches!(
        provider.new_access_request(not_allowed, Session::default()).await,
        Err(OAuthError::InvalidGrant(_))
    ));
}

#[tokio::test]
async fn introspection_and_revocation() {
    let (provider, _, _) = setup().await;
    let code = authorize(&provider, "fosite.read offline").await;
    let mut request = provider.new_access_request(exchange_params(&code), Session::default()).await.unwrap();
    let response = provider.new_access_response(&mut request).await.unwrap();
    let token = response.access_token.clone();

    let requester = provider.introspect_token(&token, &["fosite.read"]).await.unwrap();
    assert_eq!(requester.client.id, "app");
    assert_eq!(requester.session.subject, "peter");
    assert!(matches!(provider.introspect_token(&token, &["fosite"]).await, Err(OAuthError::InvalidScope(_))));

    assert_eq!(provider.revoke_token("app", "wrong", &token).await, Err(OAuthError::InvalidClient));
    provider.revoke_token("app", "foobar-secret", &token).await.unwrap();
    assert!(matches!(provider.introspect_token(&token, &[]).await, Err(OAuthError::InvalidToken(_))));
    provider.revoke_token("app", "foobar-secret", "unknown.token").await.unwrap();
}
