pub mod oauth_core;
pub mod openid;
pub mod client;
pub mod policy;
pub mod warden;

pub use oauth_core::error::{OAuthError, Result};
pub use oauth_core::arguments::Arguments;
pub use oauth_core::types::Client;
pub use oauth_core::session::{Session, TokenKind};
pub use oauth_core::request::{AccessParams, AccessRequest, AuthorizeParams, AuthorizeRequest, Requester};
pub use oauth_core::response::{AccessResponse, AuthorizeResponse};
pub use oauth_core::config::{OAuthConfig, OAuthConfigBuilder};
pub use oauth_core::provider::OAuth2Provider;
pub use oauth_core::compose::{compose_all_enabled, OAuthStorage};
pub use oauth_core::memory::MemoryStore;
pub use oauth_core::introspector::{CoreValidator, TokenIntrospector};
pub use oauth_core::hash::{Hasher, Pbkdf2Hasher};
pub use openid::{DefaultIdTokenStrategy, IdTokenClaims, IdTokenStrategy, SigningKeys};
pub use client::{
    ClientBackend, ClientChange, ClientManager, DirectoryResourceOwners, InMemoryClientBackend, MemoryClientManager,
    ReplicatedClientManager, SyncMode,
};
pub use policy::{
    Condition, Effect, MatchingPolicyEngine, MemoryPolicyManager, Policy, PolicyEngine, PolicyManager, PolicyRequest,
    RegexpMatcher,
};
pub use warden::{token_from_bearer, Firewall, FirewallContext, LocalWarden};
