//! Wires the complete engine from one store, one client directory and one
//! signing key pair.

use std::sync::Arc;
use tracing::info;
use crate::client::{ClientManager, DirectoryResourceOwners};
use crate::openid::flow_hybrid::OpenIdConnectHybridHandler;
use crate::openid::flow_implicit::OpenIdConnectImplicitHandler;
use crate::openid::helper::IdTokenHandleHelper;
use crate::openid::strategy_jwt::{DefaultIdTokenStrategy, SigningKeys};
use super::config::OAuthConfig;
use super::error::Result;
use super::handler::flow_authorize_code::ExplicitIdToken;
use super::handler::{
    AuthorizeExplicitGrantHandler, AuthorizeImplicitGrantTypeHandler, ClientCredentialsGrantHandler, HandleHelper,
    RefreshTokenGrantHandler, ResourceOwnerPasswordCredentialsGrantHandler,
};
use super::introspector::CoreValidator;
use super::provider::OAuth2Provider;
use super::revocation::TokenRevoker;
use super::scope::{hierarchic_scope_strategy, ScopeStrategy};
use super::storage::{
    AuthorizeCodeGrantStorage, ImplicitGrantStorage, OpenIdConnectRequestStorage, RefreshTokenGrantStorage,
};
use super::strategy::HmacSha256Strategy;

/// Everything a store must provide to back all grants.
pub trait OAuthStorage:
    AuthorizeCodeGrantStorage + RefreshTokenGrantStorage + ImplicitGrantStorage + OpenIdConnectRequestStorage
{
}

impl<T> OAuthStorage for T where
    T: AuthorizeCodeGrantStorage + RefreshTokenGrantStorage + ImplicitGrantStorage + OpenIdConnectRequestStorage
{
}

/// Builds a provider with every grant enabled.
///
/// Authorize handlers run in the order explicit, implicit, OpenID Connect
/// implicit, hybrid. Token handlers run in the order authorization code,
/// refresh token, client credentials, password. The password grant checks
/// credentials against `clients`.
pub fn compose_all_enabled<S: OAuthStorage>(
    config: &OAuthConfig,
    store: Arc<S>,
    clients: Arc<dyn ClientManager>,
    keys: SigningKeys,
) -> Result<OAuth2Provider> {
    config.validate()?;
    let strategy = Arc::new(HmacSha256Strategy::new(
        config.system_secret.as_bytes(),
        config.access_token_lifespan(),
        config.refresh_token_lifespan(),
        config.authorize_code_lifespan(),
    )?);
    let scope_strategy: ScopeStrategy = hierarchic_scope_strategy;
    let access_token_lifespan = config.access_token_lifespan();

    let id_token_helper = IdTokenHandleHelper::new(Arc::new(DefaultIdTokenStrategy::new(
        keys,
        config.id_token_lifespan(),
        config.issuer.clone(),
        config.min_parameter_entropy,
    )));

    let explicit = AuthorizeExplicitGrantHandler {
        access_token_strategy: strategy.clone(),
        refresh_token_strategy: strategy.clone(),
        authorize_code_strategy: strategy.clone(),
        storage: store.clone(),
        scope_strategy,
        access_token_lifespan,
        id_token: Some(ExplicitIdToken { helper: id_token_helper.clone(), storage: store.clone() }),
    };
    let implicit = AuthorizeImplicitGrantTypeHandler {
        access_token_strategy: strategy.clone(),
        storage: store.clone(),
        scope_strategy,
        access_token_lifespan,
    };
    let oidc_implicit = OpenIdConnectImplicitHandler {
        implicit: implicit.clone(),
        id_token_helper: id_token_helper.clone(),
        scope_strategy,
    };
    let hybrid = OpenIdConnectHybridHandler {
        explicit: explicit.clone(),
        implicit: implicit.clone(),
        id_token_helper,
        scope_strategy,
    };

    let refresh = RefreshTokenGrantHandler {
        access_token_strategy: strategy.clone(),
        refresh_token_strategy: strategy.clone(),
        storage: store.clone(),
        access_token_lifespan,
    };
    let helper = HandleHelper {
        access_token_strategy: strategy.clone(),
        access_token_storage: store.clone(),
        access_token_lifespan,
    };
    let client_credentials = ClientCredentialsGrantHandler { helper: helper.clone(), scope_strategy };
    let resource_owner = ResourceOwnerPasswordCredentialsGrantHandler {
        authenticator: Arc::new(DirectoryResourceOwners::new(clients.clone())),
        helper,
        scope_strategy,
    };

    let introspector = CoreValidator {
        access_token_strategy: strategy.clone(),
        access_token_storage: store.clone(),
        clients: clients.clone(),
        scope_strategy,
    };
    let revoker = TokenRevoker {
        access_token_strategy: strategy.clone(),
        refresh_token_strategy: strategy,
        storage: store,
    };

    let explicit = Arc::new(explicit);
    info!(issuer = %config.issuer, "oauth2 provider composed");
    Ok(OAuth2Provider::new(clients, Arc::new(introspector), revoker, config.min_parameter_entropy)
        .with_authorize_handler(explicit.clone())
        .with_authorize_handler(Arc::new(implicit))
        .with_authorize_handler(Arc::new(oidc_implicit))
        .with_authorize_handler(Arc::new(hybrid))
        .with_token_handler(explicit)
        .with_token_handler(Arc::new(refresh))
        .with_token_handler(Arc::new(client_credentials))
        .with_token_handler(Arc::new(resource_owner)))
}
