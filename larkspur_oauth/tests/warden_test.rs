use std::sync::Arc;
use larkspur_oauth::{
    compose_all_enabled, token_from_bearer, AccessParams, Arguments, Client, ClientManager, Condition, Effect,
    Firewall, LocalWarden, MatchingPolicyEngine, MemoryClientManager, MemoryPolicyManager, MemoryStore, OAuthConfig,
    OAuthError, Pbkdf2Hasher, Policy, PolicyManager, PolicyRequest, RegexpMatcher, Session, SigningKeys,
};

const ISSUER: &str = "https://larkspur.local";

struct Fixture {
    warden: LocalWarden,
    policies: Arc<MemoryPolicyManager>,
    clients: Arc<MemoryClientManager>,
    token: String,
}

async fn setup() -> Fixture {
    let config = OAuthConfig::builder()
        .issuer(ISSUER)
        .system_secret("some-super-cool-secret-that-nobody-knows")
        .build()
        .unwrap();
    let clients = Arc::new(MemoryClientManager::new(Arc::new(Pbkdf2Hasher::new(1))));
    let mut app = Client::new("app");
    app.secret = "foobar-secret".into();
    app.grant_types = Arguments::from_space_delimited("client_credentials");
    app.scopes = Arguments::from_space_delimited("articles");
    clients.create_client(app).await.unwrap();

    let provider = compose_all_enabled(
        &config,
        Arc::new(MemoryStore::new()),
        clients.clone(),
        SigningKeys::generate_es256().unwrap(),
    )
    .unwrap();
    let params = AccessParams::new("app", "foobar-secret", "client_credentials").scope("articles.read");
    let mut request = provider.new_access_request(params, Session::default()).await.unwrap();
    let token = provider.new_access_response(&mut request).await.unwrap().access_token;

    let matcher = Arc::new(RegexpMatcher::new());
    let policies = Arc::new(MemoryPolicyManager::new(matcher.clone()));
    let engine = Arc::new(MatchingPolicyEngine::new(policies.clone(), matcher));
    let warden = LocalWarden::new(provider.introspector(), engine, ISSUER);
    Fixture { warden, policies, clients, token }
}

#[tokio::test]
async fn valid_token_yields_context() {
    let fixture = setup().await;
    let context = fixture.warden.token_valid(&fixture.token, &["articles.read"]).await.unwrap();
    assert_eq!(context.subject, "app");
    assert_eq!(context.audience, "app");
    assert_eq!(context.issuer, ISSUER);
    assert_eq!(context.granted_scopes, vec!["articles.read".to_string()]);
    assert!(context.expires_at.is_some_and(|at| at > context.issued_at));
}

#[tokio::test]
async fn invalid_tokens_are_rejected() {
    let fixture = setup().await;
    assert!(matches!(fixture.warden.token_valid("nope.nope", &[]).await, Err(OAuthError::InvalidToken(_))));
    assert!(matches!(
        fixture.warden.token_valid(&fixture.token, &["articles.write"]).await,
        Err(OAuthError::InvalidToken(_))
    ));
}

#[tokio::test]
async fn deny_overrides_allow() {
    let fixture = setup().await;
    fixture
        .policies
        .create(Policy::new("allow-articles", Effect::Allow).subject("app").resource("articles:<[0-9]+>").action("get"))
        .await
        .unwrap();

    let header = format!("Bearer {}", fixture.token);
    let token = token_from_bearer(&header).unwrap();
    let request = PolicyRequest::new("articles:1337", "get");
    let context = fixture.warden.token_allowed(token, &request, &["articles.read"]).await.unwrap();
    assert_eq!(context.subject, "app");

    fixture
        .policies
        .create(Policy::new("deny-1337", Effect::Deny).subject("<.*>").resource("articles:1337").action("<.*>"))
        .await
        .unwrap();
    assert_eq!(
        fixture.warden.token_allowed(token, &request, &["articles.read"]).await.err(),
        Some(OAuthError::RequestForbidden)
    );
    let other = PolicyRequest::new("articles:42", "get");
    assert!(fixture.warden.token_allowed(token, &other, &["articles.read"]).await.is_ok());
}

#[tokio::test]
async fn token_subject_overrides_claimed_subject() {
    let fixture = setup().await;
    fixture
        .policies
        .create(Policy::new("admin", Effect::Allow).subject("admin").resource("<.*>").action("<.*>"))
        .await
        .unwrap();
    let request = PolicyRequest::new("articles:1", "delete").subject("admin");
    assert_eq!(
        fixture.warden.token_allowed(&fixture.token, &request, &[]).await.err(),
        Some(OAuthError::RequestForbidden)
    );
    assert!(fixture.warden.is_allowed(&request).await.is_ok());
}

#[tokio::test]
async fn owner_condition_uses_token_subject() {
    let fixture = setup().await;
    fixture
        .policies
        .create(
            Policy::new("own-profile", Effect::Allow)
                .subject("<.*>")
                .resource("profiles:<.*>")
                .action("update")
                .condition("owner", Condition::EqualsSubject),
        )
        .await
        .unwrap();

    let own = PolicyRequest::new("profiles:app", "update").context("owner", "app");
    assert!(fixture.warden.token_allowed(&fixture.token, &own, &[]).await.is_ok());
    let foreign = PolicyRequest::new("profiles:peter", "update").context("owner", "peter");
    assert_eq!(
        fixture.warden.token_allowed(&fixture.token, &foreign, &[]).await.err(),
        Some(OAuthError::RequestForbidden)
    );
}

#[tokio::test]
async fn no_policy_means_forbidden() {
    let fixture = setup().await;
    let request = PolicyRequest::new("articles:1", "get").subject("app");
    assert_eq!(fixture.warden.is_allowed(&request).await.err(), Some(OAuthError::RequestForbidden));
}

#[tokio::test]
async fn deleted_client_invalidates_its_tokens() {
    let fixture = setup().await;
    fixture.clients.delete_client("app").await.unwrap();
    assert!(matches!(fixture.warden.token_valid(&fixture.token, &[]).await, Err(OAuthError::InvalidToken(_))));
}
