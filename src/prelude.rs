pub use crate::{compose_all_enabled, OAuth2Provider, OAuthConfig, OAuthError, Result};
pub use crate::{AccessParams, AccessRequest, AccessResponse, AuthorizeParams, AuthorizeRequest, AuthorizeResponse};
pub use crate::{Arguments, Client, Session};
pub use crate::{ClientManager, MemoryClientManager, ReplicatedClientManager, SyncMode};
pub use crate::{MemoryStore, OAuthStorage};
pub use crate::{DefaultIdTokenStrategy, IdTokenClaims, SigningKeys};
pub use crate::{Effect, MatchingPolicyEngine, MemoryPolicyManager, Policy, PolicyManager, PolicyRequest};
pub use crate::{token_from_bearer, Firewall, FirewallContext, LocalWarden};

pub use std::sync::Arc;
pub use std::time::Duration;
pub use tokio;
pub use tracing;
